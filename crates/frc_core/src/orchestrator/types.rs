//! Core types for the reconstruction pipeline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::logging::JobLogger;
use crate::models::FrameJob;
use crate::workspace::WorkspacePaths;

/// Progress callback type for reporting pipeline progress.
///
/// Arguments: (step_name, percent_complete, message)
pub type ProgressCallback = Box<dyn Fn(&str, u32, &str) + Send + Sync>;

/// Read-only context passed to pipeline steps.
///
/// Contains the frame job and shared resources that steps can read but
/// not modify. Mutable state goes in `JobState`.
pub struct Context {
    /// The frame job being reconstructed.
    pub job: FrameJob,
    /// Resolved workspace paths for this frame.
    pub paths: WorkspacePaths,
    /// Run settings (engine, extraction, logging).
    pub settings: Settings,
    /// Per-frame logger.
    pub logger: Arc<JobLogger>,
    /// Optional progress callback.
    progress_callback: Option<ProgressCallback>,
}

impl Context {
    /// Create a new context for a frame job.
    pub fn new(
        job: FrameJob,
        paths: WorkspacePaths,
        settings: Settings,
        logger: Arc<JobLogger>,
    ) -> Self {
        Self {
            job,
            paths,
            settings,
            logger,
            progress_callback: None,
        }
    }

    /// Set the progress callback.
    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Report progress to the callback (if set).
    pub fn report_progress(&self, step_name: &str, percent: u32, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            callback(step_name, percent, message);
        }
    }

    /// Frame index shorthand.
    pub fn frame(&self) -> u32 {
        self.job.index
    }

    /// Per-stage timeout in seconds (0 = none).
    pub fn stage_timeout(&self) -> u64 {
        self.settings.engine.stage_timeout_secs
    }
}

/// Record of one executed engine stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    /// Stage name.
    pub stage: String,
    /// Full command line that was run.
    pub command: String,
}

/// Mutable job state that accumulates results from pipeline steps.
///
/// This is a write-once manifest: each step records its output in its
/// own section and never overwrites another step's.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobState {
    /// Frame index.
    pub frame: u32,
    /// When the job started.
    pub started_at: Option<String>,
    /// Number of per-camera images linked into staging.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images_staged: Option<usize>,
    /// Feature extraction record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<StageRecord>,
    /// Feature matching record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching: Option<StageRecord>,
    /// Mapping (bundle adjustment) record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapping: Option<StageRecord>,
    /// Undistortion record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undistort: Option<StageRecord>,
}

impl JobState {
    /// Create a new job state for a frame.
    pub fn new(frame: u32) -> Self {
        Self {
            frame,
            started_at: Some(chrono::Local::now().to_rfc3339()),
            ..Default::default()
        }
    }

    /// Check if the workspace has been staged.
    pub fn has_workspace(&self) -> bool {
        self.images_staged.is_some()
    }

    /// Check if features have been extracted.
    pub fn has_features(&self) -> bool {
        self.features.is_some()
    }

    /// Check if matching has run.
    pub fn has_matching(&self) -> bool {
        self.matching.is_some()
    }

    /// Check if mapping has run.
    pub fn has_mapping(&self) -> bool {
        self.mapping.is_some()
    }
}

/// Result of executing a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Step completed successfully.
    Success,
    /// Step was skipped (preconditions not met, but not an error).
    Skipped(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_state_tracks_progression() {
        let mut state = JobState::new(7);
        assert!(!state.has_workspace());
        assert!(!state.has_features());

        state.images_staged = Some(4);
        state.features = Some(StageRecord {
            stage: "feature_extraction".to_string(),
            command: "colmap feature_extractor ...".to_string(),
        });

        assert!(state.has_workspace());
        assert!(state.has_features());
        assert!(!state.has_matching());
    }

    #[test]
    fn job_state_serializes() {
        let state = JobState::new(12);
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"frame\":12"));
    }
}
