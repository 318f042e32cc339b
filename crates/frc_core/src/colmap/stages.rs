//! Stage command builders for the reconstruction engine.
//!
//! The four stages form a strictly sequential, dependent pipeline:
//! matching needs extracted features, mapping needs matches, and
//! undistortion needs a mapped model. The GPU flag is threaded
//! uniformly into every GPU-capable stage.

use crate::config::EngineSettings;
use crate::workspace::WorkspacePaths;

use super::command::CommandSpec;

/// Stage names used in logs and error classification.
pub const STAGE_FEATURES: &str = "feature_extraction";
pub const STAGE_MATCHING: &str = "feature_matching";
pub const STAGE_MAPPING: &str = "mapping";
pub const STAGE_UNDISTORT: &str = "undistortion";

fn gpu_flag(use_gpu: bool) -> &'static str {
    if use_gpu {
        "1"
    } else {
        "0"
    }
}

/// SIFT feature extraction over the staged images.
pub fn feature_extractor(engine: &EngineSettings, ws: &WorkspacePaths) -> CommandSpec {
    CommandSpec::new(&engine.binary)
        .arg("feature_extractor")
        .path_arg("--database_path", &ws.database)
        .path_arg("--image_path", &ws.staging)
        .flag(
            "--ImageReader.single_camera",
            if engine.single_camera { "1" } else { "0" },
        )
        .flag("--ImageReader.camera_model", &engine.camera_model)
        .flag("--SiftExtraction.use_gpu", gpu_flag(engine.use_gpu))
}

/// Exhaustive feature matching across all images in the workspace.
pub fn exhaustive_matcher(engine: &EngineSettings, ws: &WorkspacePaths) -> CommandSpec {
    CommandSpec::new(&engine.binary)
        .arg("exhaustive_matcher")
        .path_arg("--database_path", &ws.database)
        .flag("--SiftMatching.use_gpu", gpu_flag(engine.use_gpu))
}

/// Incremental mapping (bundle adjustment) producing a sparse model.
pub fn mapper(engine: &EngineSettings, ws: &WorkspacePaths) -> CommandSpec {
    CommandSpec::new(&engine.binary)
        .arg("mapper")
        .path_arg("--database_path", &ws.database)
        .path_arg("--image_path", &ws.staging)
        .path_arg("--output_path", &ws.staging_sparse)
        .arg(format!(
            "--Mapper.ba_global_function_tolerance={}",
            engine.ba_global_function_tolerance
        ))
}

/// Image undistortion against the recovered sparse model.
///
/// Writes undistorted `images/` and flat model files under the frame
/// root; `workspace::finalize` normalizes them into `sparse/0/`.
pub fn image_undistorter(engine: &EngineSettings, ws: &WorkspacePaths) -> CommandSpec {
    CommandSpec::new(&engine.binary)
        .arg("image_undistorter")
        .path_arg("--image_path", &ws.staging)
        .path_arg("--input_path", &ws.staging_model())
        .path_arg("--output_path", &ws.root)
        .flag("--output_type", "COLMAP")
}

/// All stage commands for one workspace, in execution order.
pub fn all_stages(engine: &EngineSettings, ws: &WorkspacePaths) -> Vec<(&'static str, CommandSpec)> {
    vec![
        (STAGE_FEATURES, feature_extractor(engine, ws)),
        (STAGE_MATCHING, exhaustive_matcher(engine, ws)),
        (STAGE_MAPPING, mapper(engine, ws)),
        (STAGE_UNDISTORT, image_undistorter(engine, ws)),
    ]
}
