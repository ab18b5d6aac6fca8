//! Media sources and pull-based sample readers
//!
//! A `MediaSource` opens a container and hands out `MediaReader`s: one
//! independent pull cursor per play-through, exposing the video track and
//! the optional audio track in PTS order. Any orientation transform the
//! source requires is resolved before samples leave the reader, so
//! downstream consumers always see final deliverable geometry.

mod file;
mod source;
#[cfg(test)]
pub(crate) mod testutil;

pub use file::FileSource;
pub use source::{MediaReader, MediaSource, SourceInfo, Transform};
