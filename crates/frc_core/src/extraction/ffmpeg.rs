//! Frame extraction via ffmpeg.
//!
//! Each camera video is decoded once into numbered still images named
//! `{camera}_%04d.{ext}` under the shared `images/` directory. ffmpeg has
//! no selective re-extraction, so idempotency works at the camera level:
//! a camera whose expected outputs all exist is skipped entirely, and an
//! incomplete camera is decoded again in full.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::config::ExtractionSettings;
use crate::discovery::scan_image_dir;
use crate::models::{CameraSource, SourceOrigin};

use super::probe;
use super::types::{CameraExtraction, ExtractionError, ExtractionResult, ExtractionSummary};

/// Check if ffmpeg is available on this system.
pub fn is_available(binary: &str) -> bool {
    Command::new(binary)
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Build the ffmpeg argument vector for one camera video.
///
/// Frame numbering starts at 0 so extracted indices line up with the
/// frame index set.
pub fn extraction_args(video: &Path, images_dir: &Path, camera: &str, ext: &str) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-i".to_string(),
        video.display().to_string(),
        "-start_number".to_string(),
        "0".to_string(),
        images_dir
            .join(format!("{}_%04d.{}", camera, ext))
            .display()
            .to_string(),
    ]
}

/// Extract one camera's video into still images.
///
/// Idempotent: if `expected` frames are already present for this camera
/// (or any are present and the expected count is unknown), the decode is
/// skipped and the existing images are used.
pub fn extract_camera(
    binary: &str,
    camera: &CameraSource,
    images_dir: &Path,
    ext: &str,
    expected: Option<usize>,
) -> ExtractionResult<CameraExtraction> {
    let video = match &camera.origin {
        SourceOrigin::Video(p) => p.as_path(),
        SourceOrigin::ImageDir(_) => {
            // Nothing to decode; report what is already there.
            let present = count_camera_frames(images_dir, &camera.name)?;
            return Ok(CameraExtraction {
                camera: camera.name.clone(),
                frames_present: present,
                skipped: true,
            });
        }
    };

    if !video.exists() {
        return Err(ExtractionError::FileNotFound(video.to_path_buf()));
    }

    let existing = count_camera_frames(images_dir, &camera.name)?;
    let complete = match expected {
        Some(n) => existing >= n,
        None => existing > 0,
    };
    if complete {
        tracing::info!(
            "Camera '{}': {} frame(s) already extracted, skipping decode",
            camera.name,
            existing
        );
        return Ok(CameraExtraction {
            camera: camera.name.clone(),
            frames_present: existing,
            skipped: true,
        });
    }

    std::fs::create_dir_all(images_dir).map_err(|e| ExtractionError::Io {
        operation: format!("create {}", images_dir.display()),
        source: e,
    })?;

    let args = extraction_args(video, images_dir, &camera.name, ext);
    tracing::info!("Extracting frames: {} {}", binary, args.join(" "));

    let output = Command::new(binary)
        .args(&args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| ExtractionError::ToolLaunchFailed {
            tool: binary.to_string(),
            source: e,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractionError::CommandFailed {
            tool: binary.to_string(),
            exit_code: output.status.code().unwrap_or(-1),
            message: stderr.trim().to_string(),
        });
    }

    let produced = count_camera_frames(images_dir, &camera.name)?;
    if produced == 0 {
        return Err(ExtractionError::NoOutputProduced {
            camera: camera.name.clone(),
        });
    }

    Ok(CameraExtraction {
        camera: camera.name.clone(),
        frames_present: produced,
        skipped: false,
    })
}

/// Extract all camera videos, continuing past per-camera failures.
///
/// The aggregate summary is surfaced only after every camera was
/// attempted; one bad video never blocks the others.
pub fn extract_all(
    settings: &ExtractionSettings,
    sources: &[CameraSource],
    images_dir: &Path,
) -> ExtractionSummary {
    let mut summary = ExtractionSummary::default();

    for camera in sources {
        // Expected count guides the skip check; a probe failure just
        // disables it and the decode proceeds.
        let expected = camera
            .video_path()
            .and_then(|v| probe::probe_frame_count(&settings.ffprobe_binary, v).ok());

        match extract_camera(
            &settings.ffmpeg_binary,
            camera,
            images_dir,
            &settings.image_extension,
            expected,
        ) {
            Ok(result) => summary.completed.push(result),
            Err(e) => {
                tracing::warn!("Extraction failed for camera '{}': {}", camera.name, e);
                summary.failed.push((camera.name.clone(), e));
            }
        }
    }

    summary
}

fn count_camera_frames(images_dir: &Path, camera: &str) -> ExtractionResult<usize> {
    if !images_dir.exists() {
        return Ok(0);
    }
    let by_camera = scan_image_dir(images_dir).map_err(|e| ExtractionError::Io {
        operation: format!("scan {}", images_dir.display()),
        source: e,
    })?;
    Ok(by_camera.get(camera).map(|s| s.len()).unwrap_or(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn args_follow_naming_convention() {
        let args = extraction_args(
            Path::new("/scene/cam0.mp4"),
            Path::new("/scene/images"),
            "cam0",
            "png",
        );
        assert!(args.contains(&"-start_number".to_string()));
        assert!(args.contains(&"0".to_string()));
        assert!(args.last().unwrap().ends_with("cam0_%04d.png"));
    }

    #[test]
    fn missing_video_is_file_not_found() {
        let dir = TempDir::new().unwrap();
        let camera = CameraSource::from_video("cam0", PathBuf::from("/nonexistent/cam0.mp4"));
        let result = extract_camera("ffmpeg", &camera, dir.path(), "png", None);
        assert!(matches!(result, Err(ExtractionError::FileNotFound(_))));
    }

    #[test]
    fn complete_camera_is_skipped() {
        let dir = TempDir::new().unwrap();
        let images = dir.path().join("images");
        std::fs::create_dir_all(&images).unwrap();
        for i in 0..3 {
            std::fs::write(images.join(format!("cam0_{:04}.png", i)), b"x").unwrap();
        }

        let video = dir.path().join("cam0.mp4");
        std::fs::write(&video, b"stub").unwrap();
        let camera = CameraSource::from_video("cam0", video);

        // Binary name is bogus on purpose: a skip must never invoke it.
        let result =
            extract_camera("no-such-ffmpeg", &camera, &images, "png", Some(3)).unwrap();
        assert!(result.skipped);
        assert_eq!(result.frames_present, 3);
    }

    #[test]
    fn one_camera_failure_does_not_stop_others() {
        let dir = TempDir::new().unwrap();
        let images = dir.path().join("images");
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("cam1_0000.png"), b"x").unwrap();

        let sources = vec![
            CameraSource::from_video("cam0", PathBuf::from("/nonexistent/cam0.mp4")),
            CameraSource::from_video("cam1", dir.path().join("cam1.mp4")),
        ];
        std::fs::write(dir.path().join("cam1.mp4"), b"stub").unwrap();

        let settings = ExtractionSettings {
            ffmpeg_binary: "no-such-ffmpeg".to_string(),
            ffprobe_binary: "no-such-ffprobe".to_string(),
            ..ExtractionSettings::default()
        };

        let summary = extract_all(&settings, &sources, &images);
        // cam0 fails (missing file), cam1 skips (frames already present).
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, "cam0");
        assert_eq!(summary.completed.len(), 1);
        assert!(summary.completed[0].skipped);
    }
}
