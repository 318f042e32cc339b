//! Camera source identification.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where a camera's frames come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceOrigin {
    /// A video file that needs (or has had) frame extraction.
    Video(PathBuf),
    /// A directory of already-extracted frame images.
    ImageDir(PathBuf),
}

/// One camera in the scene and the origin of its frames.
///
/// Immutable once discovered - discovery builds the full set up front
/// and everything downstream only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSource {
    /// Camera name/id (e.g., "cam3"). Encoded into every frame filename.
    pub name: String,
    /// Origin of this camera's frames.
    pub origin: SourceOrigin,
}

impl CameraSource {
    /// Create a camera source backed by a video file.
    pub fn from_video(name: impl Into<String>, video: PathBuf) -> Self {
        Self {
            name: name.into(),
            origin: SourceOrigin::Video(video),
        }
    }

    /// Create a camera source backed by a directory of extracted images.
    pub fn from_image_dir(name: impl Into<String>, dir: PathBuf) -> Self {
        Self {
            name: name.into(),
            origin: SourceOrigin::ImageDir(dir),
        }
    }

    /// Whether this camera requires frame extraction from a video.
    pub fn is_video(&self) -> bool {
        matches!(self.origin, SourceOrigin::Video(_))
    }

    /// Path to the backing video file, if any.
    pub fn video_path(&self) -> Option<&Path> {
        match &self.origin {
            SourceOrigin::Video(p) => Some(p),
            SourceOrigin::ImageDir(_) => None,
        }
    }
}
