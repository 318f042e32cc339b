//! Undistortion and workspace finalization step.

use crate::colmap::{self, STAGE_UNDISTORT};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StageRecord, StepOutcome};
use crate::workspace;

/// Undistorts images against the sparse model, then normalizes the
/// workspace into its final `images/` + `sparse/0/` shape.
pub struct UndistortStep;

impl PipelineStep for UndistortStep {
    fn name(&self) -> &str {
        "Undistort"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        let model = ctx.paths.staging_model();
        if !model.is_dir() {
            return Err(StepError::precondition_failed(format!(
                "Sparse model missing, mapping must run first: {}",
                model.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let spec = colmap::image_undistorter(&ctx.settings.engine, &ctx.paths);
        colmap::run_stage(STAGE_UNDISTORT, &spec, ctx.stage_timeout(), &ctx.logger)?;

        workspace::finalize(&ctx.paths)?;
        ctx.logger.info(&format!(
            "Workspace normalized: {}",
            ctx.paths.root.display()
        ));

        state.undistort = Some(StageRecord {
            stage: STAGE_UNDISTORT.to_string(),
            command: spec.command_line(),
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, _state: &JobState) -> StepResult<()> {
        if !workspace::is_complete(&ctx.paths) {
            return Err(StepError::invalid_output(format!(
                "Model files missing or empty under {}",
                ctx.paths.sparse_zero.display()
            )));
        }
        if !ctx.paths.images.is_dir() {
            return Err(StepError::invalid_output(format!(
                "Undistorted images missing: {}",
                ctx.paths.images.display()
            )));
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Undistort images and finalize the frame workspace"
    }
}
