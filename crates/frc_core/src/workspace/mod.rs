//! Per-frame job workspace management.
//!
//! Each frame owns an isolated subtree:
//!
//! ```text
//! frame_0042/
//!   temp/              # staging: flat per-camera input links + database.db
//!     sparse/          # mapper output models
//!   images/            # undistorted images (written by the engine)
//!   sparse/0/          # cameras.bin, images.bin, points3D.bin
//! ```
//!
//! Inputs are linked into the staging area so the engine never touches
//! the original images; undistortion writes the final `images/` and
//! `sparse/` children, and `finalize` moves the model files into
//! `sparse/0/` and removes staging. A workspace counts as complete only
//! when all three model files exist with non-zero size, so an
//! interrupted run can never claim completeness.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::{frame_dir_name, FrameJob};

/// The model files a complete reconstruction must contain.
pub const MODEL_FILES: [&str; 3] = ["cameras.bin", "images.bin", "points3D.bin"];

/// Errors raised while building or finalizing a workspace.
///
/// All of these are fatal for their frame only, never for the batch.
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// A required source image is absent at workspace-build time.
    #[error("Missing image for camera '{camera}' at frame {index}: {path}")]
    MissingCameraImage {
        camera: String,
        index: u32,
        path: PathBuf,
    },

    /// Filesystem error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for workspace operations.
pub type WorkspaceResult<T> = Result<T, WorkspaceError>;

/// Resolved paths inside one frame's workspace.
#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    /// `frame_<index>/`
    pub root: PathBuf,
    /// `frame_<index>/temp/` - staging area with flat input links.
    pub staging: PathBuf,
    /// `frame_<index>/temp/database.db` - engine working database.
    pub database: PathBuf,
    /// `frame_<index>/temp/sparse/` - mapper output.
    pub staging_sparse: PathBuf,
    /// `frame_<index>/images/` - final undistorted images.
    pub images: PathBuf,
    /// `frame_<index>/sparse/` - final model parent.
    pub sparse: PathBuf,
    /// `frame_<index>/sparse/0/` - final model files.
    pub sparse_zero: PathBuf,
}

impl WorkspacePaths {
    /// Resolve the workspace paths for a frame index under a scene root.
    pub fn for_frame(scene_root: &Path, index: u32) -> Self {
        let root = scene_root.join(frame_dir_name(index));
        let staging = root.join("temp");
        Self {
            database: staging.join("database.db"),
            staging_sparse: staging.join("sparse"),
            images: root.join("images"),
            sparse: root.join("sparse"),
            sparse_zero: root.join("sparse").join("0"),
            staging,
            root,
        }
    }

    /// Path of the mapper's first recovered model.
    pub fn staging_model(&self) -> PathBuf {
        self.staging_sparse.join("0")
    }
}

/// Check whether a workspace already holds a complete reconstruction.
///
/// Validates actual output file presence (non-zero size), not just
/// directory existence - this is the resumability guarantee.
pub fn is_complete(paths: &WorkspacePaths) -> bool {
    MODEL_FILES.iter().all(|name| {
        let file = paths.sparse_zero.join(name);
        std::fs::metadata(&file).map(|m| m.len() > 0).unwrap_or(false)
    })
}

/// Build (or reuse) the workspace for one frame job.
///
/// Verifies every per-camera source image exists, creates the staging
/// and output subtrees, and links each image flat into staging. Returns
/// the number of images linked.
pub fn build(job: &FrameJob, paths: &WorkspacePaths) -> WorkspaceResult<usize> {
    // Verify all inputs up front so a half-built staging area never
    // hides a missing camera.
    for image in &job.images {
        if !image.path.is_file() {
            return Err(WorkspaceError::MissingCameraImage {
                camera: image.camera.clone(),
                index: job.index,
                path: image.path.clone(),
            });
        }
    }

    for dir in [&paths.staging, &paths.staging_sparse, &paths.sparse_zero] {
        std::fs::create_dir_all(dir).map_err(|e| WorkspaceError::Io {
            operation: format!("create {}", dir.display()),
            source: e,
        })?;
    }

    let mut linked = 0;
    for image in &job.images {
        let file_name = image.path.file_name().ok_or_else(|| WorkspaceError::Io {
            operation: format!("resolve name of {}", image.path.display()),
            source: io::Error::new(io::ErrorKind::InvalidInput, "no file name"),
        })?;
        let dest = paths.staging.join(file_name);
        if dest.exists() {
            linked += 1;
            continue;
        }
        link_or_copy(&image.path, &dest)?;
        linked += 1;
    }

    Ok(linked)
}

/// Normalize the workspace after undistortion.
///
/// The undistorter writes `images/` and flat model files under
/// `sparse/`; move the model files into `sparse/0/`, drop the staging
/// area, and remove any stray engine outputs so only `images/` and
/// `sparse/` remain.
pub fn finalize(paths: &WorkspacePaths) -> WorkspaceResult<()> {
    std::fs::create_dir_all(&paths.sparse_zero).map_err(|e| WorkspaceError::Io {
        operation: format!("create {}", paths.sparse_zero.display()),
        source: e,
    })?;

    for name in MODEL_FILES {
        let from = paths.sparse.join(name);
        if from.is_file() {
            let to = paths.sparse_zero.join(name);
            std::fs::rename(&from, &to).map_err(|e| WorkspaceError::Io {
                operation: format!("move {} to {}", from.display(), to.display()),
                source: e,
            })?;
        }
    }

    if paths.staging.exists() {
        std::fs::remove_dir_all(&paths.staging).map_err(|e| WorkspaceError::Io {
            operation: format!("remove {}", paths.staging.display()),
            source: e,
        })?;
    }

    let entries = std::fs::read_dir(&paths.root).map_err(|e| WorkspaceError::Io {
        operation: format!("read {}", paths.root.display()),
        source: e,
    })?;
    for entry in entries {
        let entry = entry.map_err(|e| WorkspaceError::Io {
            operation: format!("read {}", paths.root.display()),
            source: e,
        })?;
        let name = entry.file_name();
        if name == "images" || name == "sparse" {
            continue;
        }
        let path = entry.path();
        let result = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        result.map_err(|e| WorkspaceError::Io {
            operation: format!("remove {}", path.display()),
            source: e,
        })?;
    }

    Ok(())
}

#[cfg(unix)]
fn link_or_copy(src: &Path, dest: &Path) -> WorkspaceResult<()> {
    let src = src.canonicalize().map_err(|e| WorkspaceError::Io {
        operation: format!("canonicalize {}", src.display()),
        source: e,
    })?;
    if std::os::unix::fs::symlink(&src, dest).is_ok() {
        return Ok(());
    }
    std::fs::copy(&src, dest)
        .map(|_| ())
        .map_err(|e| WorkspaceError::Io {
            operation: format!("copy {} to {}", src.display(), dest.display()),
            source: e,
        })
}

#[cfg(not(unix))]
fn link_or_copy(src: &Path, dest: &Path) -> WorkspaceResult<()> {
    std::fs::copy(src, dest)
        .map(|_| ())
        .map_err(|e| WorkspaceError::Io {
            operation: format!("copy {} to {}", src.display(), dest.display()),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FrameImage;
    use tempfile::TempDir;

    fn job_with_images(scene: &Path, index: u32, cameras: &[&str]) -> FrameJob {
        let images_dir = scene.join("images");
        std::fs::create_dir_all(&images_dir).unwrap();
        let images = cameras
            .iter()
            .map(|cam| {
                let path = images_dir.join(format!("{}_{:04}.png", cam, index));
                std::fs::write(&path, b"imagedata").unwrap();
                FrameImage {
                    camera: cam.to_string(),
                    path,
                }
            })
            .collect();
        FrameJob::new(index, images, scene.join(frame_dir_name(index)))
    }

    #[test]
    fn build_creates_layout_and_links_inputs() {
        let dir = TempDir::new().unwrap();
        let job = job_with_images(dir.path(), 3, &["cam0", "cam1"]);
        let paths = WorkspacePaths::for_frame(dir.path(), 3);

        let linked = build(&job, &paths).unwrap();
        assert_eq!(linked, 2);
        assert!(paths.staging.join("cam0_0003.png").exists());
        assert!(paths.staging.join("cam1_0003.png").exists());
        assert!(paths.staging_sparse.is_dir());
        assert!(paths.sparse_zero.is_dir());

        // Rebuild is idempotent.
        assert_eq!(build(&job, &paths).unwrap(), 2);
    }

    #[test]
    fn missing_source_image_is_per_frame_error() {
        let dir = TempDir::new().unwrap();
        let mut job = job_with_images(dir.path(), 5, &["cam0"]);
        job.images.push(FrameImage {
            camera: "cam1".to_string(),
            path: dir.path().join("images").join("cam1_0005.png"),
        });
        let paths = WorkspacePaths::for_frame(dir.path(), 5);

        let err = build(&job, &paths).unwrap_err();
        match err {
            WorkspaceError::MissingCameraImage { camera, index, .. } => {
                assert_eq!(camera, "cam1");
                assert_eq!(index, 5);
            }
            other => panic!("expected MissingCameraImage, got {:?}", other),
        }
        // Nothing was staged for the failed frame.
        assert!(!paths.staging.exists());
    }

    #[test]
    fn completeness_requires_all_nonempty_model_files() {
        let dir = TempDir::new().unwrap();
        let paths = WorkspacePaths::for_frame(dir.path(), 0);
        assert!(!is_complete(&paths));

        std::fs::create_dir_all(&paths.sparse_zero).unwrap();
        assert!(!is_complete(&paths));

        for name in MODEL_FILES {
            std::fs::write(paths.sparse_zero.join(name), b"model").unwrap();
        }
        assert!(is_complete(&paths));

        // A zero-size file must not count as complete.
        std::fs::write(paths.sparse_zero.join("points3D.bin"), b"").unwrap();
        assert!(!is_complete(&paths));
    }

    #[test]
    fn finalize_moves_models_and_removes_staging() {
        let dir = TempDir::new().unwrap();
        let job = job_with_images(dir.path(), 7, &["cam0"]);
        let paths = WorkspacePaths::for_frame(dir.path(), 7);
        build(&job, &paths).unwrap();

        // Simulate undistorter output: flat models in sparse/ plus strays.
        std::fs::create_dir_all(&paths.images).unwrap();
        for name in MODEL_FILES {
            std::fs::write(paths.sparse.join(name), b"model").unwrap();
        }
        std::fs::write(paths.root.join("run-colmap-geometric.sh"), b"#!/bin/sh").unwrap();
        std::fs::create_dir_all(paths.root.join("stereo")).unwrap();

        finalize(&paths).unwrap();

        assert!(is_complete(&paths));
        assert!(!paths.staging.exists());
        assert!(!paths.root.join("run-colmap-geometric.sh").exists());
        assert!(!paths.root.join("stereo").exists());
        assert!(paths.images.is_dir());
    }
}
