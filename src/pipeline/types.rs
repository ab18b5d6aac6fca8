//! Core types for the streaming pipeline

use bytes::Bytes;
use std::time::Duration;

/// Timestamp representation for media samples
///
/// Microsecond resolution, relative to the start of the sample's source.
/// The timeline offset is added in the same unit before transmission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    /// Microseconds since source start
    pub micros: i64,
}

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp { micros: 0 };

    /// Create a new timestamp from microseconds
    pub fn from_micros(micros: i64) -> Self {
        Self { micros }
    }

    /// Create a timestamp from float seconds
    pub fn from_secs_f64(secs: f64) -> Self {
        Self {
            micros: (secs * 1_000_000.0).round() as i64,
        }
    }

    /// Convert to float seconds
    pub fn as_secs_f64(&self) -> f64 {
        self.micros as f64 / 1_000_000.0
    }

    /// Convert to a duration, clamping negative values to zero
    pub fn as_duration(&self) -> Duration {
        Duration::from_micros(self.micros.max(0) as u64)
    }

    /// Add a duration to this timestamp
    pub fn add(&self, duration: Duration) -> Self {
        Self {
            micros: self.micros + duration.as_micros() as i64,
        }
    }

    /// Shift this timestamp by another one (timeline offset application)
    pub fn offset_by(&self, offset: Timestamp) -> Self {
        Self {
            micros: self.micros + offset.micros,
        }
    }

    /// Absolute difference between two timestamps
    pub fn diff(&self, other: Timestamp) -> Duration {
        Duration::from_micros((self.micros - other.micros).unsigned_abs())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

/// Kind of media data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Video frame data
    Video,
    /// Audio sample data
    Audio,
}

impl MediaKind {
    pub fn is_video(&self) -> bool {
        matches!(self, MediaKind::Video)
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "Video"),
            MediaKind::Audio => write!(f, "Audio"),
        }
    }
}

/// A timestamped unit of media data
///
/// Produced by a media reader, exclusively owned by the pacer until handed
/// to the transport, and not retained afterward.
#[derive(Clone)]
pub struct Sample {
    /// Kind of media (video or audio)
    pub kind: MediaKind,

    /// Encoded or raw media payload
    pub data: Bytes,

    /// Presentation timestamp
    pub pts: Timestamp,

    /// Decode timestamp, when it differs from PTS (B-frames)
    pub dts: Option<Timestamp>,

    /// Payload duration
    pub duration: Timestamp,
}

impl Sample {
    /// Create a new video sample
    pub fn video(data: Bytes, pts: Timestamp, dts: Option<Timestamp>, duration: Timestamp) -> Self {
        Self {
            kind: MediaKind::Video,
            data,
            pts,
            dts,
            duration,
        }
    }

    /// Create a new audio sample
    pub fn audio(data: Bytes, pts: Timestamp, duration: Timestamp) -> Self {
        Self {
            kind: MediaKind::Audio,
            data,
            pts,
            dts: None,
            duration,
        }
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Copy of this sample with the timeline offset applied to PTS and DTS
    pub fn with_offset(&self, offset: Timestamp) -> Self {
        Self {
            kind: self.kind,
            data: self.data.clone(),
            pts: self.pts.offset_by(offset),
            dts: self.dts.map(|dts| dts.offset_by(offset)),
            duration: self.duration,
        }
    }
}

impl std::fmt::Debug for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut debug = f.debug_struct("Sample");
        debug
            .field("kind", &self.kind)
            .field("pts", &self.pts)
            .field("duration", &self.duration)
            .field("size", &self.size());
        if let Some(dts) = self.dts {
            debug.field("dts", &dts);
        }
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_conversions() {
        let ts = Timestamp::from_secs_f64(1.5);
        assert_eq!(ts.micros, 1_500_000);
        assert!((ts.as_secs_f64() - 1.5).abs() < 1e-9);
        assert_eq!(ts.as_duration(), Duration::from_millis(1500));
    }

    #[test]
    fn test_timestamp_offset() {
        let pts = Timestamp::from_secs_f64(0.5);
        let offset = Timestamp::from_secs_f64(2.0);
        assert_eq!(pts.offset_by(offset).micros, 2_500_000);
    }

    #[test]
    fn test_timestamp_ordering() {
        let a = Timestamp::from_micros(100);
        let b = Timestamp::from_micros(200);
        assert!(a < b);
        assert_eq!(a.diff(b), Duration::from_micros(100));
        assert_eq!(b.diff(a), Duration::from_micros(100));
    }

    #[test]
    fn test_sample_with_offset() {
        let sample = Sample::video(
            Bytes::from_static(b"frame"),
            Timestamp::from_secs_f64(0.1),
            Some(Timestamp::from_secs_f64(0.05)),
            Timestamp::from_micros(33_333),
        );
        let shifted = sample.with_offset(Timestamp::from_secs_f64(4.0));
        assert_eq!(shifted.pts.micros, 4_100_000);
        assert_eq!(shifted.dts.unwrap().micros, 4_050_000);
        // duration and payload untouched
        assert_eq!(shifted.duration, sample.duration);
        assert_eq!(shifted.size(), 5);
    }
}
