//! Workspace staging step.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StepOutcome};
use crate::workspace;

/// Builds the per-frame workspace and links source images into staging.
pub struct WorkspaceStep;

impl PipelineStep for WorkspaceStep {
    fn name(&self) -> &str {
        "Workspace"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if ctx.job.images.is_empty() {
            return Err(StepError::invalid_input(format!(
                "Frame {} has no source images",
                ctx.frame()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let linked = workspace::build(&ctx.job, &ctx.paths)?;
        ctx.logger.info(&format!(
            "Staged {} camera images into {}",
            linked,
            ctx.paths.staging.display()
        ));
        state.images_staged = Some(linked);
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        if !ctx.paths.staging.is_dir() {
            return Err(StepError::invalid_output(format!(
                "Staging directory was not created: {}",
                ctx.paths.staging.display()
            )));
        }
        match state.images_staged {
            Some(n) if n == ctx.job.images.len() => Ok(()),
            Some(n) => Err(StepError::invalid_output(format!(
                "Staged {} of {} images",
                n,
                ctx.job.images.len()
            ))),
            None => Err(StepError::invalid_output("No staging count recorded")),
        }
    }

    fn description(&self) -> &str {
        "Stage per-camera source images into an isolated frame workspace"
    }
}
