//! # relaycast
//!
//! Low-latency paced media streaming to a remote receiver.
//!
//! ```text
//! SessionCoordinator
//!     ├── MediaSource (file demux, pull-based per track)
//!     │        │
//!     │        ▼
//!     ├── StreamingPacer (audio-lead reorder, timeline offset, pacing)
//!     │        │
//!     │        ▼
//!     └── TransportConnection (chunk ≤ 1316 bytes, send, stats)
//! ```
//!
//! The pipeline runs as exactly one cancellable task per streaming
//! session. The pacer pulls samples at the source's native frame cadence,
//! keeps audio ahead of the video it accompanies, and adds a cumulative
//! timeline offset at each loop boundary so the receiver only ever sees a
//! growing timeline.

pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod session;
pub mod transport;

pub use error::{Error, Result};
pub use session::{SeekOutcome, SessionCoordinator};

/// Application-wide constants
pub mod constants {
    use std::time::Duration;

    /// Hard ceiling on a single transport chunk, in bytes.
    ///
    /// The target protocol family is tuned for small, regularly paced
    /// datagrams; larger application writes are split by the sender.
    pub const MAX_SEGMENT_SIZE: usize = 1316;

    /// How far audio delivery is kept ahead of the video it accompanies.
    pub const AUDIO_LEAD: Duration = Duration::from_millis(50);

    /// Audio samples sent before the first video frame of a play-through.
    pub const AUDIO_PREBUFFER_SAMPLES: usize = 3;

    /// Settling delay between a finished play-through and the re-open of
    /// the source for the next one.
    pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

    /// Progress is published every this many video frames.
    pub const PROGRESS_EVERY: u64 = 15;

    /// Default transport buffering latency budget in milliseconds.
    pub const DEFAULT_LATENCY_MS: u32 = 120;

    /// Default connection handshake timeout in milliseconds.
    pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 5000;

    /// Frame rate assumed when the container declares none.
    pub const DEFAULT_FRAME_RATE: f64 = 30.0;
}
