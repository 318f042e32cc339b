//! Reconstruction engine (COLMAP) command layer.
//!
//! The engine is a black box: this module builds stage argument
//! vectors, runs them as blocking child processes, and maps exit
//! statuses into stage errors. It never parses the engine's binary
//! outputs - completeness is judged by file presence alone (see
//! `crate::workspace`).

mod command;
mod stages;

pub use command::{run_stage, CommandSpec, StageError, StageResult};
pub use stages::{
    all_stages, exhaustive_matcher, feature_extractor, image_undistorter, mapper,
    STAGE_FEATURES, STAGE_MAPPING, STAGE_MATCHING, STAGE_UNDISTORT,
};
