//! Timeline offset tracking across looped play-throughs

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use super::types::Timestamp;

/// Monotonic timeline offset tracker
///
/// Accumulates the last video PTS observed at the end of every completed
/// play-through. The pacer adds the current value to every outgoing
/// sample's PTS (and DTS) so the receiver only ever observes a growing
/// timeline even though the source restarts from zero on each loop; many
/// low-latency receivers treat timestamp regressions as stream corruption.
///
/// # Thread Safety
///
/// Cloneable handle over shared atomic state, in the same way the rest of
/// the pipeline shares its counters. Advanced only by the pacer at loop
/// boundaries; reset only by an explicit session stop, never by a seek.
#[derive(Clone, Default)]
pub struct TimelineOffset {
    micros: Arc<AtomicI64>,
}

impl TimelineOffset {
    /// Create a new tracker starting at zero
    pub fn new() -> Self {
        Self {
            micros: Arc::new(AtomicI64::new(0)),
        }
    }

    /// Current cumulative offset
    pub fn current(&self) -> Timestamp {
        Timestamp::from_micros(self.micros.load(Ordering::Relaxed))
    }

    /// Advance the offset by the last video PTS of a completed play-through
    ///
    /// Called exactly once per play-through, with that play-through's own
    /// (pre-offset) final video PTS. Negative inputs are ignored so the
    /// accumulator never regresses.
    pub fn advance(&self, last_video_pts: Timestamp) {
        if last_video_pts.micros <= 0 {
            return;
        }
        self.micros
            .fetch_add(last_video_pts.micros, Ordering::Relaxed);
    }

    /// Reset to zero. Only an explicit session stop does this.
    pub fn reset(&self) {
        self.micros.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for TimelineOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimelineOffset")
            .field("current", &self.current())
            .finish()
    }
}
