//! Pacing pipeline for relaycast
//!
//! This module holds the realtime sending side of the pipeline,
//! separating concerns between:
//! - Control: the pacer state machine and lifecycle management
//! - Timing: the monotonic timeline carried across loop iterations
//! - Ordering: audio-lead interleaving of the two elementary streams
//! - Health: counters tracking what actually went out on the wire
//!
//! # Architecture
//!
//! A single `StreamingPacer` task pulls samples from a `MediaSource`
//! reader, interleaves audio ahead of video, rebases timestamps onto
//! the session timeline and hands framed packets to the transport.
//! State and progress are published through watch channels so the
//! session coordinator (and the CLI) can observe without polling.

pub mod health;
pub mod pacer;
pub mod state;
pub mod timeline;
pub mod types;

pub use health::{HealthSummary, PacerHealth};
pub use pacer::{PacerConfig, PacerProgress, StreamingPacer};
pub use state::PacerState;
pub use timeline::TimelineOffset;
pub use types::{MediaKind, Sample, Timestamp};
