//! Container-backed media source using FFmpeg demuxing.
//!
//! Packets are pulled straight out of the container without re-encoding;
//! the transport carries them as-is. Video and audio live in per-track
//! queues so the pacer can pull each track independently even though the
//! container interleaves them.

use ac_ffmpeg::format::demuxer::{Demuxer, DemuxerWithStreamInfo};
use ac_ffmpeg::format::io::IO;
use bytes::Bytes;
use std::collections::VecDeque;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::constants::DEFAULT_FRAME_RATE;
use crate::error::MediaError;
use crate::media::source::{MediaReader, MediaSource, SourceInfo, Transform};
use crate::pipeline::types::{MediaKind, Sample, Timestamp};

/// Video packets pre-read while estimating the frame cadence.
const PROBE_VIDEO_PACKETS: usize = 6;

/// Duration assumed for samples whose packet carries none.
const DURATION_GUESS_MICROS: i64 = 20_000;

/// Packet durations come out of the demuxer as an optional wall-clock
/// `Duration`; timestamps in this crate are microsecond counts.
fn duration_micros(duration: Option<std::time::Duration>) -> i64 {
    duration
        .map(|d| d.as_micros() as i64)
        .unwrap_or(DURATION_GUESS_MICROS)
}

/// A local container file openable for repeated play-throughs.
///
/// Construction is cheap; the first `open` call probes stream info and
/// caches it, so a load request never blocks on metadata.
pub struct FileSource {
    path: PathBuf,
    transform: Transform,
    probed: Mutex<Option<SourceInfo>>,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            transform: Transform::IDENTITY,
            probed: Mutex::new(None),
        }
    }

    /// Declare a geometric transform the source requires. The advertised
    /// dimensions are resolved through it.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    fn open_demuxer(&self) -> Result<DemuxerWithStreamInfo<File>, MediaError> {
        let input = File::open(&self.path).map_err(|err| {
            MediaError::ReaderFailed(format!("unable to open {}: {}", self.path.display(), err))
        })?;

        let io = IO::from_seekable_read_stream(input);

        Demuxer::builder()
            .build(io)
            .map_err(|err| MediaError::ReaderFailed(err.to_string()))?
            .find_stream_info(None)
            .map_err(|(_, err)| MediaError::ReaderFailed(err.to_string()))
    }
}

impl MediaSource for FileSource {
    fn open(&self, start: Timestamp) -> Result<Box<dyn MediaReader>, MediaError> {
        let demuxer = self.open_demuxer()?;

        let mut video_index = None;
        let mut audio_index = None;
        let mut natural_dims = (0u32, 0u32);
        let mut duration_secs = None;

        for (index, stream) in demuxer.streams().iter().enumerate() {
            let params = stream.codec_parameters();

            if params.is_video_codec() && video_index.is_none() {
                video_index = Some(index);
                if let Some(video) = params.as_video_codec_parameters() {
                    natural_dims = (video.width() as u32, video.height() as u32);
                }
                if let Some(micros) = stream.duration().as_micros() {
                    duration_secs = Some(micros as f64 / 1_000_000.0);
                }
            } else if params.is_audio_codec() && audio_index.is_none() {
                audio_index = Some(index);
            }
        }

        let video_index = video_index.ok_or(MediaError::NoTracksFound)?;

        let mut reader = FileReader {
            demuxer,
            video_index,
            audio_index,
            start,
            video_queue: VecDeque::new(),
            audio_queue: VecDeque::new(),
            eof: false,
        };

        let frame_rate = reader.estimate_frame_rate()?;

        let (width, height) = self.transform.apply(natural_dims.0, natural_dims.1);
        let info = SourceInfo {
            duration_secs,
            frame_rate,
            has_audio: audio_index.is_some(),
            width,
            height,
            transform: self.transform,
        };

        if let Ok(mut probed) = self.probed.lock() {
            *probed = Some(info);
        }

        Ok(Box::new(reader))
    }

    fn info(&self) -> Result<SourceInfo, MediaError> {
        if let Ok(probed) = self.probed.lock() {
            if let Some(info) = *probed {
                return Ok(info);
            }
        }

        // not probed yet: open a throwaway reader to populate the cache
        self.open(Timestamp::ZERO)?;
        self.probed
            .lock()
            .map_err(|_| MediaError::NoSourceLoaded)?
            .ok_or(MediaError::NoSourceLoaded)
    }
}

/// One pull cursor over a demuxed container.
struct FileReader {
    demuxer: DemuxerWithStreamInfo<File>,
    video_index: usize,
    audio_index: Option<usize>,
    start: Timestamp,
    video_queue: VecDeque<Sample>,
    audio_queue: VecDeque<Sample>,
    eof: bool,
}

impl FileReader {
    /// Read one container packet and queue it on its track.
    ///
    /// Packets outside the readable range `[start, duration)` and packets
    /// without usable timestamps are discarded. Returns `false` once the
    /// container is exhausted.
    fn pull_packet(&mut self) -> Result<bool, MediaError> {
        loop {
            let packet = self
                .demuxer
                .take()
                .map_err(|err| MediaError::ReaderFailed(err.to_string()))?;

            let Some(packet) = packet else {
                self.eof = true;
                return Ok(false);
            };

            let index = packet.stream_index();
            let kind = if index == self.video_index {
                MediaKind::Video
            } else if Some(index) == self.audio_index {
                MediaKind::Audio
            } else {
                continue;
            };

            let Some(pts_micros) = packet
                .pts()
                .as_micros()
                .or_else(|| packet.dts().as_micros())
            else {
                continue;
            };

            if pts_micros < self.start.micros {
                continue;
            }

            let pts = Timestamp::from_micros(pts_micros);
            let dts = packet
                .dts()
                .as_micros()
                .map(Timestamp::from_micros)
                .filter(|dts| *dts != pts);
            let duration = Timestamp::from_micros(duration_micros(packet.duration()));
            let data = Bytes::copy_from_slice(packet.data());

            match kind {
                MediaKind::Video => self
                    .video_queue
                    .push_back(Sample::video(data, pts, dts, duration)),
                MediaKind::Audio => self.audio_queue.push_back(Sample::audio(data, pts, duration)),
            }

            return Ok(true);
        }
    }

    /// Pull packets until the wanted track has a queued sample or the
    /// container is exhausted.
    fn fill(&mut self, wanted: MediaKind) -> Result<(), MediaError> {
        loop {
            let queued = match wanted {
                MediaKind::Video => !self.video_queue.is_empty(),
                MediaKind::Audio => !self.audio_queue.is_empty(),
            };
            if queued || self.eof {
                return Ok(());
            }
            self.pull_packet()?;
        }
    }

    /// Estimate the nominal frame rate from the spacing of the first few
    /// video packets, falling back to the crate default.
    ///
    /// The pre-read packets stay queued and are served normally afterwards.
    fn estimate_frame_rate(&mut self) -> Result<f64, MediaError> {
        while self.video_queue.len() < PROBE_VIDEO_PACKETS && !self.eof {
            self.pull_packet()?;
        }

        let mut deltas: Vec<i64> = self
            .video_queue
            .iter()
            .zip(self.video_queue.iter().skip(1))
            .map(|(a, b)| b.pts.micros - a.pts.micros)
            .filter(|delta| *delta > 0)
            .collect();

        if deltas.is_empty() {
            return Ok(DEFAULT_FRAME_RATE);
        }

        deltas.sort_unstable();
        let median = deltas[deltas.len() / 2];
        Ok(1_000_000.0 / median as f64)
    }
}

impl MediaReader for FileReader {
    fn next_video_sample(&mut self) -> Result<Option<Sample>, MediaError> {
        self.fill(MediaKind::Video)?;
        Ok(self.video_queue.pop_front())
    }

    fn next_audio_sample(&mut self) -> Result<Option<Sample>, MediaError> {
        if self.audio_index.is_none() {
            return Ok(None);
        }
        self.fill(MediaKind::Audio)?;
        Ok(self.audio_queue.pop_front())
    }
}
