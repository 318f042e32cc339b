//! Reconstruction orchestration.
//!
//! The orchestrator turns a frame index into per-frame pipeline runs:
//!
//! - [`BatchDriver`] walks the index, skipping complete workspaces and
//!   isolating per-frame failures in the ledger
//! - [`Pipeline`] executes the steps for one frame with validation at
//!   every boundary
//! - [`steps`] holds the concrete steps: workspace staging followed by
//!   the four engine stages

pub mod batch;
pub mod errors;
pub mod pipeline;
pub mod step;
pub mod steps;
pub mod types;

pub use batch::BatchDriver;
pub use errors::{PipelineError, PipelineResult, StepError, StepResult};
pub use pipeline::{CancelHandle, Pipeline, PipelineRunResult};
pub use step::PipelineStep;
pub use types::{Context, JobState, ProgressCallback, StageRecord, StepOutcome};

use steps::{
    FeatureExtractionStep, MappingStep, MatchingStep, UndistortStep, WorkspaceStep,
};

/// Build the standard reconstruction pipeline for one frame.
///
/// Steps run strictly in dependency order; a failure anywhere aborts
/// the remaining steps for that frame.
pub fn create_reconstruction_pipeline() -> Pipeline {
    Pipeline::new()
        .with_step(WorkspaceStep)
        .with_step(FeatureExtractionStep)
        .with_step(MatchingStep)
        .with_step(MappingStep)
        .with_step(UndistortStep)
}
