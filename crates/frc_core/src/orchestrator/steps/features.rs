//! Feature extraction step.

use crate::colmap::{self, STAGE_FEATURES};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StageRecord, StepOutcome};

/// Runs SIFT feature extraction over the staged images.
pub struct FeatureExtractionStep;

impl PipelineStep for FeatureExtractionStep {
    fn name(&self) -> &str {
        "Features"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if !ctx.paths.staging.is_dir() {
            return Err(StepError::precondition_failed(format!(
                "Staging directory missing: {}",
                ctx.paths.staging.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let spec = colmap::feature_extractor(&ctx.settings.engine, &ctx.paths);
        colmap::run_stage(STAGE_FEATURES, &spec, ctx.stage_timeout(), &ctx.logger)?;
        state.features = Some(StageRecord {
            stage: STAGE_FEATURES.to_string(),
            command: spec.command_line(),
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        if !ctx.paths.database.is_file() {
            return Err(StepError::invalid_output(format!(
                "Feature database was not created: {}",
                ctx.paths.database.display()
            )));
        }
        if !state.has_features() {
            return Err(StepError::invalid_output("No feature stage recorded"));
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Extract SIFT features from every staged camera image"
    }
}
