//! Concrete reconstruction pipeline steps.
//!
//! Each step wraps one unit of per-frame work: staging the workspace,
//! then the four engine stages. They share the validate/execute/validate
//! contract from [`super::step::PipelineStep`].

mod features;
mod mapping;
mod matching;
mod undistort;
mod workspace;

pub use features::FeatureExtractionStep;
pub use mapping::MappingStep;
pub use matching::MatchingStep;
pub use undistort::UndistortStep;
pub use workspace::WorkspaceStep;
