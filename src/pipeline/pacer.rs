//! Realtime streaming pacer
//!
//! Pulls samples from a media reader, interleaves audio ahead of video,
//! rebases timestamps onto the session timeline and paces transmission
//! at the source frame rate. One pacer drives one play-through sequence;
//! looping re-opens the reader and carries the timeline forward so the
//! receiver observes a single continuous stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, sleep, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::constants::{AUDIO_LEAD, AUDIO_PREBUFFER_SAMPLES, PROGRESS_EVERY, SETTLE_DELAY};
use crate::error::Error;
use crate::media::{MediaReader, MediaSource};
use crate::pipeline::health::PacerHealth;
use crate::pipeline::state::PacerState;
use crate::pipeline::timeline::TimelineOffset;
use crate::pipeline::types::{Sample, Timestamp};
use crate::transport::{MediaPacket, TransportConnection};

/// Per-run pacer options.
#[derive(Debug, Clone)]
pub struct PacerConfig {
    /// Position within the source to start the first play-through from.
    pub start: Timestamp,
    /// When false, frames are sent as fast as the transport accepts
    /// them. Used by tests and offline piping.
    pub realtime: bool,
}

impl Default for PacerConfig {
    fn default() -> Self {
        Self {
            start: Timestamp::ZERO,
            realtime: true,
        }
    }
}

/// Progress snapshot published through a watch channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PacerProgress {
    /// Timeline position of the most recent video frame, in seconds.
    pub position_secs: f64,
    /// Fraction of the current play-through completed, 0.0 when the
    /// source duration is unknown.
    pub fraction: f64,
    pub frames_sent: u64,
    pub playthroughs: u64,
}

enum PlayOutcome {
    /// Reader hit end of stream; carries the end position of the last
    /// video frame in source time.
    Completed(Timestamp),
    Cancelled,
}

/// Drives one streaming session from a media source to the transport.
pub struct StreamingPacer {
    source: Arc<dyn MediaSource>,
    connection: Arc<TransportConnection>,
    timeline: TimelineOffset,
    health: Arc<PacerHealth>,
    looping: Arc<AtomicBool>,
    cancel: CancellationToken,
    state_tx: watch::Sender<PacerState>,
    progress_tx: watch::Sender<PacerProgress>,
    config: PacerConfig,
}

impl StreamingPacer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn MediaSource>,
        connection: Arc<TransportConnection>,
        timeline: TimelineOffset,
        health: Arc<PacerHealth>,
        looping: Arc<AtomicBool>,
        cancel: CancellationToken,
        state_tx: watch::Sender<PacerState>,
        progress_tx: watch::Sender<PacerProgress>,
        config: PacerConfig,
    ) -> Self {
        Self {
            source,
            connection,
            timeline,
            health,
            looping,
            cancel,
            state_tx,
            progress_tx,
            config,
        }
    }

    fn set_state(&self, next: PacerState) {
        crate::pipeline::state::publish(&self.state_tx, next);
    }

    /// Run play-throughs until end of stream, cancellation or a fatal
    /// error. Consumes the pacer; spawned by the session once the source
    /// is armed, so the state channel reads `Ready` on entry.
    pub async fn run(self) {
        self.set_state(PacerState::Streaming);
        let (frame_interval, duration_secs) = match self.source.info() {
            Ok(info) => (info.frame_interval(), info.duration_secs),
            Err(err) => {
                log::error!("source probe failed: {}", err);
                self.set_state(PacerState::Error);
                return;
            }
        };

        let mut first = true;
        loop {
            self.set_state(PacerState::Streaming);
            let start = if first { self.config.start } else { Timestamp::ZERO };
            let reader = match self.source.open(start) {
                Ok(reader) => reader,
                Err(err) => {
                    log::error!("failed to open media source: {}", err);
                    self.set_state(PacerState::Error);
                    return;
                }
            };

            let outcome = match self.play_through(reader, frame_interval, duration_secs).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    log::error!("play-through aborted: {}", err);
                    self.set_state(PacerState::Error);
                    return;
                }
            };

            let end = match outcome {
                PlayOutcome::Cancelled => {
                    self.set_state(PacerState::Stopped);
                    return;
                }
                PlayOutcome::Completed(end) => end,
            };

            self.health.record_playthrough();
            // Every later play-through starts at source time zero, so the
            // whole span of the finished one becomes timeline offset.
            self.timeline.advance(end);
            first = false;

            if !self.looping.load(Ordering::Acquire) {
                log::info!(
                    "stream complete after {} play-through(s)",
                    self.health.playthroughs()
                );
                self.set_state(PacerState::Stopped);
                return;
            }

            self.set_state(PacerState::Looping);
            log::debug!("looping, timeline offset now {}", self.timeline.current());
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.set_state(PacerState::Stopped);
                    return;
                }
                _ = sleep(SETTLE_DELAY) => {}
            }
        }
    }

    async fn play_through(
        &self,
        mut reader: Box<dyn MediaReader>,
        frame_interval: Duration,
        duration_secs: Option<f64>,
    ) -> Result<PlayOutcome, Error> {
        let mut pending_audio: Option<Sample> = None;
        let mut audio_done = false;
        let mut last_video_end = Timestamp::ZERO;
        let mut frames_this_run: u64 = 0;
        let mut next_deadline = Instant::now() + frame_interval;

        // Prime the receiver's audio buffer before the first frame.
        for _ in 0..AUDIO_PREBUFFER_SAMPLES {
            match reader.next_audio_sample()? {
                Some(sample) => self.transmit(&sample)?,
                None => {
                    audio_done = true;
                    break;
                }
            }
        }

        loop {
            if self.cancel.is_cancelled() {
                return Ok(PlayOutcome::Cancelled);
            }

            let video = match reader.next_video_sample()? {
                Some(sample) => sample,
                None => return Ok(PlayOutcome::Completed(last_video_end)),
            };

            // All audio due up to the lead window goes out first, so the
            // receiver always holds audio for the frame it is showing.
            let horizon = video.pts.add(AUDIO_LEAD);
            while !audio_done {
                let sample = match pending_audio.take() {
                    Some(sample) => sample,
                    None => match reader.next_audio_sample()? {
                        Some(sample) => sample,
                        None => {
                            audio_done = true;
                            break;
                        }
                    },
                };
                if sample.pts > horizon {
                    pending_audio = Some(sample);
                    break;
                }
                self.transmit(&sample)?;
            }

            let end = if video.duration > Timestamp::ZERO {
                video.pts.offset_by(video.duration)
            } else {
                video.pts.add(frame_interval)
            };
            last_video_end = last_video_end.max(end);

            self.transmit(&video)?;
            frames_this_run += 1;

            if frames_this_run % PROGRESS_EVERY == 0 {
                let source_secs = video.pts.as_secs_f64();
                let _ = self.progress_tx.send(PacerProgress {
                    position_secs: video.pts.offset_by(self.timeline.current()).as_secs_f64(),
                    fraction: duration_secs
                        .filter(|d| *d > 0.0)
                        .map(|d| (source_secs / d).min(1.0))
                        .unwrap_or(0.0),
                    frames_sent: self.health.frames_sent(),
                    playthroughs: self.health.playthroughs(),
                });
            }

            if self.config.realtime {
                tokio::select! {
                    _ = self.cancel.cancelled() => return Ok(PlayOutcome::Cancelled),
                    _ = sleep_until(next_deadline) => {}
                }
                next_deadline += frame_interval;
            }
        }
    }

    /// Rebase one sample onto the timeline, frame it and send it.
    fn transmit(&self, sample: &Sample) -> Result<(), Error> {
        let rebased = sample.with_offset(self.timeline.current());
        let packet = MediaPacket::from_sample(&rebased);
        let encoded = match packet.encode() {
            Ok(encoded) => encoded,
            Err(err) => {
                // a sample that cannot be framed is dropped, not fatal
                log::warn!("dropping unencodable sample: {}", err);
                self.health.record_drop();
                return Ok(());
            }
        };

        match self.connection.send(&encoded) {
            Ok(_) => {
                if sample.kind.is_video() {
                    self.health.record_frame(sample.size());
                } else {
                    self.health.record_audio(sample.size());
                }
                Ok(())
            }
            Err(err) => {
                self.health.record_drop();
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::testutil::{AUDIO_MICROS, BrokenSource, FRAME_MICROS, SyntheticSource};
    use crate::transport::PacketKind;
    use crate::transport::socket::mock::MockSocket;

    struct Harness {
        socket: MockSocket,
        health: Arc<PacerHealth>,
        timeline: TimelineOffset,
        cancel: CancellationToken,
        state_rx: watch::Receiver<PacerState>,
        progress_rx: watch::Receiver<PacerProgress>,
    }

    fn build(
        source: Arc<dyn MediaSource>,
        looping: bool,
        start: Timestamp,
    ) -> (StreamingPacer, Harness) {
        let connection = Arc::new(TransportConnection::new());
        let socket = MockSocket::new();
        connection.connect_with_socket(Box::new(socket.clone()));

        let health = Arc::new(PacerHealth::new());
        let timeline = TimelineOffset::new();
        let cancel = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(PacerState::Ready);
        let (progress_tx, progress_rx) = watch::channel(PacerProgress::default());

        let pacer = StreamingPacer::new(
            source,
            connection,
            timeline.clone(),
            health.clone(),
            Arc::new(AtomicBool::new(looping)),
            cancel.clone(),
            state_tx,
            progress_tx,
            PacerConfig {
                start,
                realtime: false,
            },
        );
        let harness = Harness {
            socket,
            health,
            timeline,
            cancel,
            state_rx,
            progress_rx,
        };
        (pacer, harness)
    }

    fn decode_wire(socket: &MockSocket) -> Vec<MediaPacket> {
        socket
            .sent_chunks()
            .iter()
            .map(|chunk| MediaPacket::decode(chunk).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_single_playthrough_sends_everything() {
        let source = Arc::new(SyntheticSource::new(60, 0));
        let (pacer, harness) = build(source, false, Timestamp::ZERO);

        pacer.run().await;

        assert_eq!(*harness.state_rx.borrow(), PacerState::Stopped);
        assert_eq!(harness.health.frames_sent(), 60);
        assert_eq!(harness.health.playthroughs(), 1);
        assert_eq!(decode_wire(&harness.socket).len(), 60);
    }

    #[tokio::test]
    async fn test_two_playthroughs_monotonic_timeline() {
        let looping = Arc::new(AtomicBool::new(true));
        let source = Arc::new(
            SyntheticSource::new(60, 0).stop_looping_after(2, looping.clone()),
        );
        let connection = Arc::new(TransportConnection::new());
        let socket = MockSocket::new();
        connection.connect_with_socket(Box::new(socket.clone()));
        let health = Arc::new(PacerHealth::new());
        let (state_tx, state_rx) = watch::channel(PacerState::Ready);
        let (progress_tx, _progress_rx) = watch::channel(PacerProgress::default());
        let pacer = StreamingPacer::new(
            source,
            connection,
            TimelineOffset::new(),
            health.clone(),
            looping,
            CancellationToken::new(),
            state_tx,
            progress_tx,
            PacerConfig {
                start: Timestamp::ZERO,
                realtime: false,
            },
        );

        pacer.run().await;

        assert_eq!(*state_rx.borrow(), PacerState::Stopped);
        assert_eq!(health.playthroughs(), 2);
        assert_eq!(health.frames_sent(), 120);

        let packets = decode_wire(&socket);
        assert_eq!(packets.len(), 120);
        for pair in packets.windows(2) {
            assert!(
                pair[1].pts() > pair[0].pts(),
                "timeline regressed across {} -> {}",
                pair[0].pts(),
                pair[1].pts()
            );
        }
        // second play-through is rebased past the end of the first
        let boundary = packets[60].pts();
        assert!(boundary.micros >= 60 * FRAME_MICROS);
    }

    #[tokio::test]
    async fn test_audio_leads_video() {
        let source = Arc::new(SyntheticSource::new(30, 100));
        let (pacer, harness) = build(source, false, Timestamp::ZERO);

        pacer.run().await;

        let packets = decode_wire(&harness.socket);
        let lead = AUDIO_LEAD.as_micros() as i64;
        let mut max_audio_pts = i64::MIN;
        for packet in &packets {
            match packet.kind {
                PacketKind::Audio => max_audio_pts = max_audio_pts.max(packet.pts),
                PacketKind::Video => {
                    // every audio sample due within the lead window was
                    // sent before this frame
                    assert!(
                        max_audio_pts + AUDIO_MICROS > packet.pts + lead
                            || max_audio_pts >= packet.pts,
                        "video at {} outran audio (last audio {})",
                        packet.pts,
                        max_audio_pts
                    );
                }
            }
        }
        assert!(harness.health.samples_sent() > 0);
    }

    #[tokio::test]
    async fn test_prebuffer_precedes_first_frame() {
        let source = Arc::new(SyntheticSource::new(10, 50));
        let (pacer, harness) = build(source, false, Timestamp::ZERO);

        pacer.run().await;

        let packets = decode_wire(&harness.socket);
        let leading_audio = packets
            .iter()
            .take_while(|p| p.kind == PacketKind::Audio)
            .count();
        assert!(leading_audio >= AUDIO_PREBUFFER_SAMPLES);
    }

    #[tokio::test]
    async fn test_start_offset_skips_samples() {
        let source = Arc::new(SyntheticSource::new(60, 0));
        let start = Timestamp::from_micros(30 * FRAME_MICROS);
        let (pacer, harness) = build(source, false, start);

        pacer.run().await;

        let packets = decode_wire(&harness.socket);
        assert_eq!(packets.len(), 30);
        assert!(packets[0].pts >= start.micros);
    }

    #[tokio::test]
    async fn test_cancellation_stops_cleanly() {
        let source = Arc::new(SyntheticSource::new(1_000_000, 0));
        let (pacer, harness) = build(source, false, Timestamp::ZERO);

        harness.cancel.cancel();
        pacer.run().await;

        assert_eq!(*harness.state_rx.borrow(), PacerState::Stopped);
    }

    #[tokio::test]
    async fn test_media_failure_is_fatal() {
        let (pacer, harness) = build(Arc::new(BrokenSource), false, Timestamp::ZERO);

        pacer.run().await;

        assert_eq!(*harness.state_rx.borrow(), PacerState::Error);
        assert_eq!(harness.health.frames_sent(), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_is_fatal() {
        let source = Arc::new(SyntheticSource::new(60, 0));
        let (pacer, harness) = build(source, false, Timestamp::ZERO);
        harness
            .socket
            .set_fail(std::io::ErrorKind::ConnectionReset);

        pacer.run().await;

        assert_eq!(*harness.state_rx.borrow(), PacerState::Error);
        assert!(harness.health.frames_dropped() > 0);
    }

    #[tokio::test]
    async fn test_progress_published() {
        let source = Arc::new(SyntheticSource::new(60, 0));
        let (pacer, harness) = build(source, false, Timestamp::ZERO);

        pacer.run().await;

        let progress = *harness.progress_rx.borrow();
        assert!(progress.frames_sent >= PROGRESS_EVERY);
        assert!(progress.position_secs > 0.0);
        assert!(progress.fraction > 0.0 && progress.fraction <= 1.0);
    }

    #[tokio::test]
    async fn test_timeline_offset_after_playthrough() {
        let source = Arc::new(SyntheticSource::new(60, 0));
        let (pacer, harness) = build(source, false, Timestamp::ZERO);

        pacer.run().await;

        // last frame starts at 59 * interval and runs one interval long
        assert_eq!(harness.timeline.current().micros, 60 * FRAME_MICROS);
    }
}
