//! Types for frame extraction operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for extraction operations.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Source video file not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Failed to launch the external tool.
    #[error("Failed to run {tool}: {source}")]
    ToolLaunchFailed {
        tool: String,
        #[source]
        source: io::Error,
    },

    /// The external tool exited with a non-zero status.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// Failed to parse tool output.
    #[error("Failed to parse {tool} output: {message}")]
    ParseError { tool: String, message: String },

    /// Extraction ran but produced no frame images.
    #[error("No frames produced for camera '{camera}'")]
    NoOutputProduced { camera: String },

    /// General I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },
}

/// Result type for extraction operations.
pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// Outcome of extracting one camera's video.
#[derive(Debug, Clone)]
pub struct CameraExtraction {
    /// Camera name.
    pub camera: String,
    /// Number of frame images present after extraction.
    pub frames_present: usize,
    /// Whether extraction was skipped because outputs already existed.
    pub skipped: bool,
}

/// Aggregate of per-camera extraction outcomes.
///
/// One camera failing never stops extraction for the others; failures
/// are collected here and surfaced once every camera was attempted.
#[derive(Debug, Default)]
pub struct ExtractionSummary {
    /// Cameras that extracted (or were already extracted).
    pub completed: Vec<CameraExtraction>,
    /// Cameras that failed, with the underlying error.
    pub failed: Vec<(String, ExtractionError)>,
}

impl ExtractionSummary {
    /// Whether every attempted camera succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// One-line summary for logging.
    pub fn summary(&self) -> String {
        let skipped = self.completed.iter().filter(|c| c.skipped).count();
        format!(
            "{} camera(s) extracted ({} skipped), {} failed",
            self.completed.len(),
            skipped,
            self.failed.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_failures() {
        let mut summary = ExtractionSummary::default();
        summary.completed.push(CameraExtraction {
            camera: "cam0".to_string(),
            frames_present: 120,
            skipped: true,
        });
        summary.failed.push((
            "cam1".to_string(),
            ExtractionError::NoOutputProduced {
                camera: "cam1".to_string(),
            },
        ));

        assert!(!summary.all_succeeded());
        assert!(summary.summary().contains("1 failed"));
        assert!(summary.summary().contains("1 skipped"));
    }

    #[test]
    fn error_display_carries_context() {
        let err = ExtractionError::CommandFailed {
            tool: "ffmpeg".to_string(),
            exit_code: 1,
            message: "moov atom not found".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ffmpeg"));
        assert!(msg.contains("exit code 1"));
    }
}
