//! Frame naming convention and per-frame job units.
//!
//! Every extracted image is named `{camera}_{index:04}.{ext}` and every
//! frame workspace is named `frame_{index:04}`. The parser is the inverse
//! of the formatter so camera/frame attribution never drifts.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Image extensions recognized as extracted frames.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Build the filename for one camera's image at one frame index.
pub fn image_file_name(camera: &str, index: u32, ext: &str) -> String {
    format!("{}_{:04}.{}", camera, index, ext)
}

/// Build the workspace directory name for a frame index.
pub fn frame_dir_name(index: u32) -> String {
    format!("frame_{:04}", index)
}

/// Parse `{camera}_{index:04}.{ext}` back into (camera, index).
///
/// Splits on the LAST underscore: camera names may themselves contain
/// underscores ("go_pro_3_0042.png" is camera "go_pro_3", frame 42).
/// Returns `None` for filenames that don't follow the convention or
/// don't carry a recognized image extension.
pub fn parse_image_file_name(file_name: &str) -> Option<(String, u32)> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if !IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
        return None;
    }
    let (camera, index) = stem.rsplit_once('_')?;
    if camera.is_empty() {
        return None;
    }
    let index: u32 = index.parse().ok()?;
    Some((camera.to_string(), index))
}

/// One camera's image for a specific frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameImage {
    /// Camera this image belongs to.
    pub camera: String,
    /// Path to the source image.
    pub path: PathBuf,
}

/// The unit of work for one timestamp.
///
/// Created by the batch driver when it begins processing a frame index
/// and dropped once the outcome is recorded. Never shared between frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameJob {
    /// The frame index (timestamp) this job reconstructs.
    pub index: u32,
    /// One image per camera for this timestamp.
    pub images: Vec<FrameImage>,
    /// Root of this job's workspace (`frame_<index>/`).
    pub workspace: PathBuf,
}

impl FrameJob {
    /// Create a job for one frame index.
    pub fn new(index: u32, images: Vec<FrameImage>, workspace: PathBuf) -> Self {
        Self {
            index,
            images,
            workspace,
        }
    }

    /// Label used for logging and log filenames.
    pub fn label(&self) -> String {
        frame_dir_name(self.index)
    }
}
