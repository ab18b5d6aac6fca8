//! Pacer-side counters for the streaming pipeline

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters accumulated by the pacer while a session runs
///
/// All fields use atomic operations so statistics reads may race sends
/// without extra synchronization. Counters only ever grow within one
/// session; a new session starts from a fresh instance.
#[derive(Default)]
pub struct PacerHealth {
    /// Video frames handed to the transport
    pub frames_sent: AtomicU64,

    /// Audio samples handed to the transport
    pub samples_sent: AtomicU64,

    /// Payload bytes handed to the transport (real sizes, not estimates)
    pub bytes_sent: AtomicU64,

    /// Video frames dropped before transmission
    pub frames_dropped: AtomicU64,

    /// Completed play-throughs
    pub playthroughs: AtomicU64,
}

impl PacerHealth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a video frame handed to the transport
    pub fn record_frame(&self, size: usize) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(size as u64, Ordering::Relaxed);
    }

    /// Record an audio sample handed to the transport
    pub fn record_audio(&self, size: usize) {
        self.samples_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(size as u64, Ordering::Relaxed);
    }

    /// Record a dropped video frame
    pub fn record_drop(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a completed play-through
    pub fn record_playthrough(&self) {
        self.playthroughs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent.load(Ordering::Relaxed)
    }

    pub fn samples_sent(&self) -> u64 {
        self.samples_sent.load(Ordering::Relaxed)
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub fn playthroughs(&self) -> u64 {
        self.playthroughs.load(Ordering::Relaxed)
    }

    /// Get a summary of the counters
    pub fn summary(&self) -> HealthSummary {
        HealthSummary {
            frames_sent: self.frames_sent(),
            samples_sent: self.samples_sent(),
            bytes_sent: self.bytes_sent(),
            frames_dropped: self.frames_dropped(),
            playthroughs: self.playthroughs(),
        }
    }
}

/// Snapshot of pacer counters
#[derive(Debug, Clone, Default)]
pub struct HealthSummary {
    pub frames_sent: u64,
    pub samples_sent: u64,
    pub bytes_sent: u64,
    pub frames_dropped: u64,
    pub playthroughs: u64,
}

impl std::fmt::Display for HealthSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames, {} audio samples, {} bytes, {} drops, {} play-throughs",
            self.frames_sent,
            self.samples_sent,
            self.bytes_sent,
            self.frames_dropped,
            self.playthroughs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let health = PacerHealth::new();

        health.record_frame(1000);
        health.record_frame(2000);
        health.record_audio(300);
        health.record_drop();
        health.record_playthrough();

        assert_eq!(health.frames_sent(), 2);
        assert_eq!(health.samples_sent(), 1);
        assert_eq!(health.bytes_sent(), 3300);
        assert_eq!(health.frames_dropped(), 1);
        assert_eq!(health.playthroughs(), 1);
    }

    #[test]
    fn test_summary_matches_counters() {
        let health = PacerHealth::new();
        health.record_frame(512);
        health.record_audio(128);

        let summary = health.summary();
        assert_eq!(summary.frames_sent, 1);
        assert_eq!(summary.samples_sent, 1);
        assert_eq!(summary.bytes_sent, 640);
    }
}
