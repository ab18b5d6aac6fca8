//! Scripted media sources shared by pacer and session tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;

use crate::error::MediaError;
use crate::media::{MediaReader, MediaSource, SourceInfo, Transform};
use crate::pipeline::types::{Sample, Timestamp};

pub const FRAME_MICROS: i64 = 33_333;
pub const AUDIO_MICROS: i64 = 10_000;

/// Scripted reader producing `frames` video frames and matching audio,
/// both starting at pts zero.
pub struct ScriptedReader {
    video_left: usize,
    audio_left: usize,
    video_pts: i64,
    audio_pts: i64,
    start: Timestamp,
}

impl MediaReader for ScriptedReader {
    fn next_video_sample(&mut self) -> Result<Option<Sample>, MediaError> {
        loop {
            if self.video_left == 0 {
                return Ok(None);
            }
            let pts = Timestamp::from_micros(self.video_pts);
            self.video_pts += FRAME_MICROS;
            self.video_left -= 1;
            if pts < self.start {
                continue;
            }
            return Ok(Some(Sample::video(
                Bytes::from_static(&[0xAB; 32]),
                pts,
                None,
                Timestamp::from_micros(FRAME_MICROS),
            )));
        }
    }

    fn next_audio_sample(&mut self) -> Result<Option<Sample>, MediaError> {
        loop {
            if self.audio_left == 0 {
                return Ok(None);
            }
            let pts = Timestamp::from_micros(self.audio_pts);
            self.audio_pts += AUDIO_MICROS;
            self.audio_left -= 1;
            if pts < self.start {
                continue;
            }
            return Ok(Some(Sample::audio(
                Bytes::from_static(&[0xCD; 16]),
                pts,
                Timestamp::from_micros(AUDIO_MICROS),
            )));
        }
    }
}

/// Source whose `open` optionally clears a shared looping flag after a
/// given number of play-throughs, bounding loop tests.
pub struct SyntheticSource {
    frames: usize,
    audio_samples: usize,
    opens: AtomicUsize,
    stop_looping_after: Option<(usize, Arc<AtomicBool>)>,
}

impl SyntheticSource {
    pub fn new(frames: usize, audio_samples: usize) -> Self {
        Self {
            frames,
            audio_samples,
            opens: AtomicUsize::new(0),
            stop_looping_after: None,
        }
    }

    pub fn stop_looping_after(mut self, opens: usize, flag: Arc<AtomicBool>) -> Self {
        self.stop_looping_after = Some((opens, flag));
        self
    }
}

impl MediaSource for SyntheticSource {
    fn open(&self, start: Timestamp) -> Result<Box<dyn MediaReader>, MediaError> {
        let count = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((after, flag)) = &self.stop_looping_after {
            if count >= *after {
                flag.store(false, Ordering::Release);
            }
        }
        Ok(Box::new(ScriptedReader {
            video_left: self.frames,
            audio_left: self.audio_samples,
            video_pts: 0,
            audio_pts: 0,
            start,
        }))
    }

    fn info(&self) -> Result<SourceInfo, MediaError> {
        Ok(SourceInfo {
            duration_secs: Some(self.frames as f64 * FRAME_MICROS as f64 / 1e6),
            frame_rate: 30.0,
            has_audio: self.audio_samples > 0,
            width: 640,
            height: 360,
            transform: Transform::IDENTITY,
        })
    }
}

/// Source whose reader fails immediately.
pub struct BrokenSource;

impl MediaSource for BrokenSource {
    fn open(&self, _start: Timestamp) -> Result<Box<dyn MediaReader>, MediaError> {
        Err(MediaError::ReaderFailed("corrupt container".into()))
    }

    fn info(&self) -> Result<SourceInfo, MediaError> {
        Ok(SourceInfo {
            duration_secs: None,
            frame_rate: 30.0,
            has_audio: false,
            width: 0,
            height: 0,
            transform: Transform::IDENTITY,
        })
    }
}
