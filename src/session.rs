//! Session coordination: one source, one connection, one pacer
//!
//! The coordinator is the only component that connects or disconnects
//! the transport and the only one that spawns the pacer task, so the
//! rest of the crate never has to reason about overlapping streams.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::{SessionOptions, TransportConfig};
use crate::error::{Error, MediaError};
use crate::media::{FileSource, MediaSource, SourceInfo};
use crate::pipeline::health::PacerHealth;
use crate::pipeline::pacer::{PacerConfig, PacerProgress, StreamingPacer};
use crate::pipeline::state::{self, PacerState};
use crate::pipeline::timeline::TimelineOffset;
use crate::pipeline::types::Timestamp;
use crate::transport::{ConnectionState, StreamingStats, TransportConnection};

/// Result of a seek request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOutcome {
    /// The pending start position was updated; takes effect on the next
    /// play-through.
    Applied,
    /// Seeking during an active stream is not supported and was ignored.
    RejectedWhileStreaming,
}

struct PacerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

struct SessionInner {
    source: Option<Arc<dyn MediaSource>>,
    start: Timestamp,
    pacer: Option<PacerHandle>,
}

/// Owns the full lifecycle of one streaming session.
pub struct SessionCoordinator {
    connection: Arc<TransportConnection>,
    transport_config: TransportConfig,
    inner: Mutex<SessionInner>,
    timeline: TimelineOffset,
    health: Arc<PacerHealth>,
    looping: Arc<AtomicBool>,
    realtime: bool,
    state_tx: watch::Sender<PacerState>,
    progress_tx: watch::Sender<PacerProgress>,
}

impl SessionCoordinator {
    pub fn new(transport_config: TransportConfig, options: SessionOptions) -> Self {
        let (state_tx, _) = watch::channel(PacerState::Idle);
        let (progress_tx, _) = watch::channel(PacerProgress::default());
        Self {
            connection: Arc::new(TransportConnection::new()),
            transport_config,
            inner: Mutex::new(SessionInner {
                source: None,
                start: Timestamp::from_secs_f64(options.start_time),
                pacer: None,
            }),
            timeline: TimelineOffset::new(),
            health: Arc::new(PacerHealth::new()),
            looping: Arc::new(AtomicBool::new(options.looping)),
            realtime: options.realtime,
            state_tx,
            progress_tx,
        }
    }

    /// Subscribe to pacer state changes.
    pub fn state(&self) -> watch::Receiver<PacerState> {
        self.state_tx.subscribe()
    }

    /// Subscribe to streaming progress updates.
    pub fn progress(&self) -> watch::Receiver<PacerProgress> {
        self.progress_tx.subscribe()
    }

    pub fn is_streaming(&self) -> bool {
        self.state_tx.borrow().is_active()
    }

    /// Open a media file and arm the session to stream it.
    pub async fn load_file(&self, path: impl AsRef<std::path::Path>) -> Result<SourceInfo, Error> {
        self.load(Arc::new(FileSource::new(path))).await
    }

    /// Arm the session with an already constructed source. Probes the
    /// source up front so an unreadable file fails here, not mid-stream.
    pub async fn load(&self, source: Arc<dyn MediaSource>) -> Result<SourceInfo, Error> {
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.pacer.take() {
            stop_pacer(handle).await;
        }

        state::publish(&self.state_tx, PacerState::Loading);
        let info = match source.info() {
            Ok(info) => info,
            Err(err) => {
                state::publish(&self.state_tx, PacerState::Error);
                return Err(err.into());
            }
        };

        log::info!(
            "loaded source: {}x{} @ {:.2} fps, audio: {}, duration: {}",
            info.width,
            info.height,
            info.frame_rate,
            info.has_audio,
            info.duration_secs
                .map(|d| format!("{d:.1}s"))
                .unwrap_or_else(|| "unknown".into()),
        );

        inner.source = Some(source);
        self.timeline.reset();
        state::publish(&self.state_tx, PacerState::Ready);
        Ok(info)
    }

    /// Connect the transport and start streaming the loaded source.
    pub async fn start_streaming(&self) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.pacer.take() {
            log::warn!("start requested while a pacer is running, restarting");
            stop_pacer(handle).await;
        }

        let source = inner
            .source
            .clone()
            .ok_or(Error::Media(MediaError::NoSourceLoaded))?;

        if self.connection.state() != ConnectionState::Connected {
            self.connection.connect(&self.transport_config)?;
        }

        let cancel = CancellationToken::new();
        let pacer = StreamingPacer::new(
            source,
            self.connection.clone(),
            self.timeline.clone(),
            self.health.clone(),
            self.looping.clone(),
            cancel.clone(),
            self.state_tx.clone(),
            self.progress_tx.clone(),
            PacerConfig {
                start: inner.start,
                realtime: self.realtime,
            },
        );
        inner.pacer = Some(PacerHandle {
            cancel,
            task: tokio::spawn(pacer.run()),
        });
        Ok(())
    }

    /// Stop the pacer, reset the timeline and drop the connection.
    /// Idempotent.
    pub async fn stop_streaming(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(handle) = inner.pacer.take() {
            stop_pacer(handle).await;
        }
        // a stopped session restarts from a fresh timeline
        self.timeline.reset();
        self.connection.disconnect();
        state::publish(&self.state_tx, PacerState::Stopped);
    }

    /// Move the pending start position. Only honored while the pacer is
    /// idle; a live stream cannot jump without resetting the receiver.
    pub async fn seek(&self, seconds: f64) -> Result<SeekOutcome, Error> {
        if self.is_streaming() {
            log::warn!("seek to {seconds:.2}s ignored: stream is active");
            return Ok(SeekOutcome::RejectedWhileStreaming);
        }

        let mut inner = self.inner.lock().await;
        if inner.source.is_none() {
            return Err(Error::Media(MediaError::NoSourceLoaded));
        }

        // a task spawned by start_streaming may not have published
        // Streaming yet; an accepted seek cancels it before re-arming
        if let Some(handle) = inner.pacer.take() {
            stop_pacer(handle).await;
        }

        inner.start = Timestamp::from_secs_f64(seconds.max(0.0));
        // re-arm; the timeline offset is intentionally preserved so a
        // later restart stays monotonic for the receiver
        state::publish(&self.state_tx, PacerState::Loading);
        state::publish(&self.state_tx, PacerState::Ready);
        log::debug!("seek armed at {:.2}s", seconds);
        Ok(SeekOutcome::Applied)
    }

    /// Toggle looping. Takes effect at the next play-through boundary.
    pub fn set_looping(&self, looping: bool) {
        self.looping.store(looping, Ordering::Release);
    }

    /// Transport statistics merged with pacer health counters.
    pub fn stats(&self) -> StreamingStats {
        let mut stats = self.connection.stats();
        stats.frames_sent = self.health.frames_sent();
        stats.samples_sent = self.health.samples_sent();
        stats.frames_dropped = self.health.frames_dropped();
        stats
    }

    pub fn health(&self) -> &PacerHealth {
        &self.health
    }

    /// Wait for the running pacer to finish on its own. Returns
    /// immediately when nothing is running. Cancel-safe: the pacer
    /// handle stays with the session, so dropping this future (for
    /// example losing a `select!` race) changes nothing.
    pub async fn wait_until_stopped(&self) {
        {
            let inner = self.inner.lock().await;
            if inner.pacer.is_none() {
                return;
            }
        }
        let mut state_rx = self.state_tx.subscribe();
        while !state_rx.borrow_and_update().is_terminal() {
            if state_rx.changed().await.is_err() {
                return;
            }
        }
    }
}

async fn stop_pacer(handle: PacerHandle) {
    handle.cancel.cancel();
    if let Err(err) = handle.task.await {
        log::error!("pacer task panicked: {err}");
    }
}
