//! Frame extraction from camera videos.
//!
//! Wraps the external decoder (ffmpeg) and probe (ffprobe) as black
//! boxes: this module only knows the invocation, the exit status, and
//! the deterministic output naming `{camera}_%04d.{ext}`.

pub mod ffmpeg;
pub mod probe;
mod types;

pub use types::{CameraExtraction, ExtractionError, ExtractionResult, ExtractionSummary};
