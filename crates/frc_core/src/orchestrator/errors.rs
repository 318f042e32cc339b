//! Error types for the reconstruction pipeline.
//!
//! Errors carry context that chains through layers:
//! Frame → Step → Operation → Detail
//!
//! Everything here is per-frame: the batch driver catches these at its
//! boundary and records them in the ledger, never aborting the run.

use std::io;

use thiserror::Error;

use crate::colmap::StageError;
use crate::workspace::WorkspaceError;

/// Top-level pipeline error with frame context.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A step failed during execution.
    #[error("Frame {frame} failed at step '{step_name}': {source}")]
    StepFailed {
        frame: u32,
        step_name: String,
        #[source]
        source: StepError,
    },

    /// Failed to set up the frame job (logger, directories).
    #[error("Frame {frame} setup failed: {message}")]
    SetupFailed { frame: u32, message: String },

    /// Pipeline was cancelled.
    #[error("Frame {frame} was cancelled")]
    Cancelled { frame: u32 },
}

impl PipelineError {
    /// Create a step failed error.
    pub fn step_failed(frame: u32, step_name: impl Into<String>, source: StepError) -> Self {
        Self::StepFailed {
            frame,
            step_name: step_name.into(),
            source,
        }
    }

    /// Create a setup failed error.
    pub fn setup_failed(frame: u32, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            frame,
            message: message.into(),
        }
    }

    /// Create a cancelled error.
    pub fn cancelled(frame: u32) -> Self {
        Self::Cancelled { frame }
    }
}

/// Error from a pipeline step with operation context.
#[derive(Error, Debug)]
pub enum StepError {
    /// Input validation failed.
    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    /// Output validation failed.
    #[error("Output validation failed: {0}")]
    InvalidOutput(String),

    /// An engine stage failed (non-zero exit, timeout, launch failure).
    #[error(transparent)]
    Stage(#[from] StageError),

    /// Workspace build or finalize failed.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// A precondition was not met.
    #[error("Precondition not met: {0}")]
    PreconditionFailed(String),
}

impl StepError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create an invalid output error.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::InvalidOutput(message.into())
    }

    /// Create an I/O error with context.
    pub fn io_error(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Create a precondition failed error.
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }
}

/// Result type for step operations.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_chains_through_step_and_pipeline() {
        let stage_err = StageError::CommandFailed {
            stage: "feature_matching".to_string(),
            exit_code: 1,
            output: "no matches found".to_string(),
        };
        let pipeline_err =
            PipelineError::step_failed(42, "Matching", StepError::from(stage_err));

        let msg = pipeline_err.to_string();
        assert!(msg.contains("Frame 42"));
        assert!(msg.contains("Matching"));
        assert!(msg.contains("feature_matching"));
        assert!(msg.contains("exit code 1"));
    }

    #[test]
    fn workspace_error_converts_to_step_error() {
        let ws_err = WorkspaceError::MissingCameraImage {
            camera: "cam1".to_string(),
            index: 2,
            path: "/scene/images/cam1_0002.png".into(),
        };
        let step_err: StepError = ws_err.into();
        let msg = step_err.to_string();
        assert!(msg.contains("cam1"));
        assert!(msg.contains("frame 2"));
    }
}
