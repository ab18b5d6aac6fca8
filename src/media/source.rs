//! Media source traits for streaming playback.
//!
//! Defines the generic interface between the pacer and whatever produces
//! timestamped samples: a demuxed local file, or a live capture/encoder
//! component feeding the same contract.

use crate::error::MediaError;
use crate::pipeline::types::{Sample, Timestamp};

/// Geometric transform a source requires before delivery.
///
/// Rotation is in quarter turns clockwise. The reader resolves the
/// transform up front, so `SourceInfo` dimensions are post-rotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Transform {
    /// Clockwise quarter turns (0..=3)
    pub quarter_turns: u8,

    /// Horizontal mirror applied after rotation
    pub mirrored: bool,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        quarter_turns: 0,
        mirrored: false,
    };

    /// Whether this transform swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        self.quarter_turns % 2 == 1
    }

    /// Apply the transform to natural dimensions
    pub fn apply(&self, width: u32, height: u32) -> (u32, u32) {
        if self.swaps_dimensions() {
            (height, width)
        } else {
            (width, height)
        }
    }
}

/// Metadata describing an openable media source.
#[derive(Debug, Clone, Copy)]
pub struct SourceInfo {
    /// Total duration in seconds, once known. Populated by the probe that
    /// happens on first open, so a load request never blocks on it.
    pub duration_secs: Option<f64>,

    /// Nominal video frame rate
    pub frame_rate: f64,

    /// Whether the source carries an audio track
    pub has_audio: bool,

    /// Deliverable frame width (post-transform)
    pub width: u32,

    /// Deliverable frame height (post-transform)
    pub height: u32,

    /// Transform that was resolved into the dimensions above
    pub transform: Transform,
}

impl SourceInfo {
    /// Nominal interval between video frames
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.frame_rate.max(1.0))
    }
}

/// Source of timestamped media samples.
///
/// Implemented by transport-agnostic producers (demuxed files, scripted
/// test sources). The pacer re-opens the source through this trait at
/// every loop boundary.
pub trait MediaSource: Send + Sync {
    /// Open a reader for one play-through.
    ///
    /// `start` constrains the readable range to `[start, duration)`.
    fn open(&self, start: Timestamp) -> Result<Box<dyn MediaReader>, MediaError>;

    /// Stream metadata, available after the first successful `open`.
    fn info(&self) -> Result<SourceInfo, MediaError>;
}

/// One pull cursor over an open source.
///
/// Video and audio are pulled independently, each in PTS order.
/// `Ok(None)` signals end of track.
pub trait MediaReader: Send {
    /// Pull the next video sample in PTS order.
    fn next_video_sample(&mut self) -> Result<Option<Sample>, MediaError>;

    /// Pull the next audio sample in PTS order. Always `Ok(None)` when the
    /// source has no audio track.
    fn next_audio_sample(&mut self) -> Result<Option<Sample>, MediaError>;
}
