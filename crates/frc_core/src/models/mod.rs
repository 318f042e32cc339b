//! Data models for frame-recon.
//!
//! This module contains the core data structures used throughout the crate:
//! - Camera sources discovered from the scene directory
//! - Frame naming convention helpers and per-frame job units
//! - The batch report ledger and its status classification

mod frames;
mod report;
mod sources;

pub use frames::{frame_dir_name, image_file_name, parse_image_file_name, FrameImage, FrameJob};
pub use report::{BatchReport, BatchStatus, FrameOutcome, FrameRecord};
pub use sources::{CameraSource, SourceOrigin};
