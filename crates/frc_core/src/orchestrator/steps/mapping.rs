//! Sparse mapping step.

use crate::orchestrator::errors::{StepError, StepResult};
use crate::orchestrator::step::PipelineStep;
use crate::orchestrator::types::{Context, JobState, StageRecord, StepOutcome};
use crate::colmap::{self, STAGE_MAPPING};

/// Runs incremental mapping to recover a sparse model.
pub struct MappingStep;

impl PipelineStep for MappingStep {
    fn name(&self) -> &str {
        "Mapping"
    }

    fn validate_input(&self, ctx: &Context) -> StepResult<()> {
        if !ctx.paths.database.is_file() {
            return Err(StepError::precondition_failed(format!(
                "Feature database missing: {}",
                ctx.paths.database.display()
            )));
        }
        if !ctx.paths.staging_sparse.is_dir() {
            return Err(StepError::precondition_failed(format!(
                "Mapper output directory missing: {}",
                ctx.paths.staging_sparse.display()
            )));
        }
        Ok(())
    }

    fn execute(&self, ctx: &Context, state: &mut JobState) -> StepResult<StepOutcome> {
        let spec = colmap::mapper(&ctx.settings.engine, &ctx.paths);
        colmap::run_stage(STAGE_MAPPING, &spec, ctx.stage_timeout(), &ctx.logger)?;
        state.mapping = Some(StageRecord {
            stage: STAGE_MAPPING.to_string(),
            command: spec.command_line(),
        });
        Ok(StepOutcome::Success)
    }

    fn validate_output(&self, ctx: &Context, state: &JobState) -> StepResult<()> {
        // The mapper writes its first model under temp/sparse/0; an
        // empty output directory means reconstruction found no model.
        if !ctx.paths.staging_model().is_dir() {
            return Err(StepError::invalid_output(format!(
                "Mapper produced no model under {}",
                ctx.paths.staging_sparse.display()
            )));
        }
        if !state.has_mapping() {
            return Err(StepError::invalid_output("No mapping stage recorded"));
        }
        Ok(())
    }

    fn description(&self) -> &str {
        "Recover camera poses and a sparse point cloud"
    }
}
