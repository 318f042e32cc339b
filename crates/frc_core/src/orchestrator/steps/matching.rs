//! Feature matching step.

use crate::colmap::{self, STAGE_MATCHING};
use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StageRecord, StepOutcome};

/// Runs exhaustive feature matching across the workspace.
pub struct MatchingStep;

impl PipelineStep for MatchingStep {
    fn name(&self) -> &str {
        "Matching"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if !ctx.paths.database.is_file() {
            return Err(StepError::precondition_failed(format!(
                "Feature database missing, extraction must run first: {}",
                ctx.paths.database.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let spec = colmap::exhaustive_matcher(&ctx.settings.engine, &ctx.paths);
        colmap::run_stage(STAGE_MATCHING, &spec, ctx.stage_timeout(), &ctx.logger)?;
        state.matching = Some(StageRecord {
            stage: STAGE_MATCHING.to_string(),
            command: spec.command_line(),
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, _ctx: &Context, state: &JobState) -> StepResult<()> {
        if !state.has_matching() {
            return Err(StepError::invalid_output("No matching stage recorded"));
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Match features exhaustively between all camera images"
    }
}
