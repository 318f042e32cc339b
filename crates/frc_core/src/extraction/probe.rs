//! Video probing via ffprobe.
//!
//! Used by discovery in extract-on-demand mode: before any frames are
//! decoded the expected frame index range is derived from the video's
//! frame count.

use std::path::Path;
use std::process::Command;

use super::types::{ExtractionError, ExtractionResult};

/// Check if ffprobe is available on this system.
pub fn is_available(binary: &str) -> bool {
    Command::new(binary)
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Read the frame count of a video's first video stream.
///
/// Counts packets rather than trusting `nb_frames`, which containers
/// frequently omit.
pub fn probe_frame_count(binary: &str, video: &Path) -> ExtractionResult<usize> {
    if !video.exists() {
        return Err(ExtractionError::FileNotFound(video.to_path_buf()));
    }

    let output = Command::new(binary)
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-count_packets",
            "-show_entries",
            "stream=nb_read_packets",
            "-of",
            "json",
        ])
        .arg(video)
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

    let json_str = String::from_utf8_lossy(&output.stdout);
    let data: serde_json::Value =
        serde_json::from_str(&json_str).map_err(|e| ExtractionError::ParseError {
            tool: binary.to_string(),
            message: e.to_string(),
        })?;

    let count = data
        .get("streams")
        .and_then(|s| s.as_array())
        .and_then(|s| s.first())
        .and_then(|s| s.get("nb_read_packets"))
        .and_then(|v| v.as_str())
        .and_then(|v| v.parse::<usize>().ok())
        .ok_or_else(|| ExtractionError::ParseError {
            tool: binary.to_string(),
            message: format!("no nb_read_packets in output for {}", video.display()),
        })?;

    tracing::debug!("Probed {} frames in {}", count, video.display());

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn nonexistent_file_error() {
        let result = probe_frame_count("ffprobe", &PathBuf::from("/nonexistent/cam0.mp4"));
        assert!(matches!(result, Err(ExtractionError::FileNotFound(_))));
    }

    #[test]
    fn missing_binary_is_launch_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let video = dir.path().join("cam0.mp4");
        std::fs::write(&video, b"not a real video").unwrap();

        let result = probe_frame_count("definitely-not-ffprobe-bin", &video);
        assert!(matches!(
            result,
            Err(ExtractionError::ToolLaunchFailed { .. })
        ));
    }
}
