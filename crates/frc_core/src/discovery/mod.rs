//! Camera source discovery and frame index construction.
//!
//! Scans the scene directory for camera sources, enumerates each
//! camera's available frames, and derives the ordered set of frame
//! indices common to all cameras. Discovery errors are the only fatal
//! errors in a run: they abort before any job starts.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::extraction::{probe, ExtractionError};
use crate::models::{parse_image_file_name, CameraSource, SourceOrigin};

/// Name of the shared directory holding extracted frame images.
pub const IMAGES_DIR: &str = "images";

/// Errors raised while discovering sources or building the frame index.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// No camera videos or frame images were found.
    #[error("No camera sources found in {path}")]
    NoCamerasFound { path: PathBuf },

    /// Cameras exist but share no common frame index.
    #[error("Cameras share no common frame index")]
    NoFramesFound,

    /// Per-camera frame counts disagree beyond the configured tolerance.
    #[error(
        "Inconsistent frame counts: camera '{min_camera}' has {min} frame(s) but \
         camera '{max_camera}' has {max} (tolerance {tolerance})"
    )]
    InconsistentFrameCounts {
        min_camera: String,
        min: usize,
        max_camera: String,
        max: usize,
        tolerance: u32,
    },

    /// Failed to probe a camera video for its frame count.
    #[error("Failed to probe camera '{camera}': {source}")]
    ProbeFailed {
        camera: String,
        #[source]
        source: ExtractionError,
    },

    /// Filesystem error during discovery.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Map from camera name to its discovered frame images (index → path).
pub type CameraImageMap = BTreeMap<String, BTreeMap<u32, PathBuf>>;

/// Scan an images directory, mapping each camera's frame indices to the
/// actual files on disk.
///
/// Files that don't follow the `{camera}_{index:04}.{ext}` convention
/// are ignored. Downstream consumers must use these paths rather than
/// re-deriving names, so scenes with `jpg`/`jpeg` images (or mixed
/// extensions per camera) stage correctly.
pub fn scan_image_files(dir: &Path) -> io::Result<CameraImageMap> {
    let mut by_camera: CameraImageMap = BTreeMap::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if let Some((camera, index)) = parse_image_file_name(name) {
            by_camera.entry(camera).or_default().insert(index, entry.path());
        }
    }

    Ok(by_camera)
}

/// Scan an images directory, grouping frame indices by camera name.
pub fn scan_image_dir(dir: &Path) -> io::Result<BTreeMap<String, BTreeSet<u32>>> {
    Ok(scan_image_files(dir)?
        .into_iter()
        .map(|(camera, frames)| (camera, frames.into_keys().collect()))
        .collect())
}

/// Discover the camera sources in a scene directory.
///
/// In extraction mode each `*.mp4` at the scene root is one camera
/// (named by its file stem). Otherwise cameras are inferred from the
/// image files already present under `images/`.
pub fn discover_sources(scene_root: &Path, extract_mode: bool) -> DiscoveryResult<Vec<CameraSource>> {
    let mut sources = Vec::new();

    if extract_mode {
        let entries = std::fs::read_dir(scene_root).map_err(|e| DiscoveryError::Io {
            operation: format!("read {}", scene_root.display()),
            source: e,
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| DiscoveryError::Io {
                operation: format!("read {}", scene_root.display()),
                source: e,
            })?;
            let path = entry.path();
            let is_mp4 = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case("mp4"))
                .unwrap_or(false);
            if !path.is_file() || !is_mp4 {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            sources.push(CameraSource::from_video(stem, path.clone()));
        }
        sources.sort_by(|a, b| a.name.cmp(&b.name));
    } else {
        let images_dir = scene_root.join(IMAGES_DIR);
        if images_dir.is_dir() {
            let by_camera = scan_image_dir(&images_dir).map_err(|e| DiscoveryError::Io {
                operation: format!("scan {}", images_dir.display()),
                source: e,
            })?;
            for camera in by_camera.keys() {
                sources.push(CameraSource::from_image_dir(camera.clone(), images_dir.clone()));
            }
        }
    }

    if sources.is_empty() {
        return Err(DiscoveryError::NoCamerasFound {
            path: scene_root.to_path_buf(),
        });
    }

    tracing::info!(
        "Discovered {} camera(s): {}",
        sources.len(),
        sources
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(sources)
}

/// Enumerate the frames available for one camera.
///
/// Decoded images win; a video camera with nothing extracted yet
/// derives its expected range `0..frame_count` from a probe.
fn available_frames(
    camera: &CameraSource,
    images_dir: &Path,
    ffprobe_binary: &str,
) -> DiscoveryResult<BTreeSet<u32>> {
    if images_dir.is_dir() {
        let by_camera = scan_image_dir(images_dir).map_err(|e| DiscoveryError::Io {
            operation: format!("scan {}", images_dir.display()),
            source: e,
        })?;
        if let Some(frames) = by_camera.get(&camera.name) {
            if !frames.is_empty() {
                return Ok(frames.clone());
            }
        }
    }

    match &camera.origin {
        SourceOrigin::Video(video) => {
            let count = probe::probe_frame_count(ffprobe_binary, video).map_err(|e| {
                DiscoveryError::ProbeFailed {
                    camera: camera.name.clone(),
                    source: e,
                }
            })?;
            Ok((0..count as u32).collect())
        }
        SourceOrigin::ImageDir(_) => Ok(BTreeSet::new()),
    }
}

/// Build the ordered frame index common to all cameras.
///
/// Indices missing from any single camera are excluded. If per-camera
/// frame counts disagree by more than `tolerance` the run aborts with
/// `InconsistentFrameCounts` instead of silently truncating; within the
/// tolerance the trimmed tail is logged.
pub fn build_frame_index(
    sources: &[CameraSource],
    images_dir: &Path,
    ffprobe_binary: &str,
    tolerance: u32,
) -> DiscoveryResult<Vec<u32>> {
    if sources.is_empty() {
        return Err(DiscoveryError::NoCamerasFound {
            path: images_dir.to_path_buf(),
        });
    }

    let mut per_camera: Vec<(&CameraSource, BTreeSet<u32>)> = Vec::with_capacity(sources.len());
    for camera in sources {
        let frames = available_frames(camera, images_dir, ffprobe_binary)?;
        per_camera.push((camera, frames));
    }

    let (min_camera, min_count) = per_camera
        .iter()
        .map(|(c, f)| (c.name.as_str(), f.len()))
        .min_by_key(|(_, n)| *n)
        .expect("at least one camera");
    let (max_camera, max_count) = per_camera
        .iter()
        .map(|(c, f)| (c.name.as_str(), f.len()))
        .max_by_key(|(_, n)| *n)
        .expect("at least one camera");

    if max_count - min_count > tolerance as usize {
        return Err(DiscoveryError::InconsistentFrameCounts {
            min_camera: min_camera.to_string(),
            min: min_count,
            max_camera: max_camera.to_string(),
            max: max_count,
            tolerance,
        });
    }

    let mut iter = per_camera.iter().map(|(_, f)| f);
    let first = iter.next().expect("at least one camera").clone();
    let common: BTreeSet<u32> = iter.fold(first, |acc, f| acc.intersection(f).copied().collect());

    if common.is_empty() {
        return Err(DiscoveryError::NoFramesFound);
    }

    if common.len() < max_count {
        tracing::warn!(
            "Frame counts differ within tolerance: using {} common frame(s), \
             dropping up to {} from camera '{}'",
            common.len(),
            max_count - common.len(),
            max_camera
        );
    }

    Ok(common.into_iter().collect())
}
