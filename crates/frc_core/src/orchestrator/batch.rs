//! Batch driver: runs the reconstruction pipeline over a frame index.
//!
//! Frames are strictly independent: each gets its own workspace, its own
//! logger, and its own outcome in the ledger. A per-frame failure is
//! recorded and the driver moves on; only discovery errors (handled
//! before the driver starts) abort a run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Settings;
use crate::discovery::{self, CameraImageMap, IMAGES_DIR};
use crate::logging::{JobLogger, LogConfig};
use crate::models::{
    frame_dir_name, image_file_name, BatchReport, FrameImage, FrameJob, FrameOutcome,
};
use crate::orchestrator::errors::PipelineError;
use crate::orchestrator::types::{Context, JobState};
use crate::workspace::{self, WorkspacePaths};

/// Drives the per-frame pipeline over every index in a frame index.
///
/// Frames run strictly sequentially, so at most one engine process is
/// alive at a time and GPU-capable stages never contend for the device.
/// Any future parallel driver must add that mutual exclusion itself.
pub struct BatchDriver {
    /// Scene root containing `images/` and the frame workspaces.
    scene_root: PathBuf,
    /// Run settings shared by all frames.
    settings: Settings,
    /// The ledger, appended to as frames finish.
    report: Mutex<BatchReport>,
}

impl BatchDriver {
    /// Create a driver for one scene.
    pub fn new(scene_root: impl Into<PathBuf>, settings: Settings) -> Self {
        Self {
            scene_root: scene_root.into(),
            settings,
            report: Mutex::new(BatchReport::new()),
        }
    }

    /// Process every frame index in order and return the ledger.
    ///
    /// For each index: a workspace already holding a complete model is
    /// recorded as `AlreadyComplete` without invoking any stage; anything
    /// else runs the full pipeline. Failures are caught at this boundary,
    /// recorded with their chained message, and never stop the batch.
    pub fn run(&self, frame_index: &[u32], cameras: &[String]) -> BatchReport {
        tracing::info!(
            "Processing {} frame(s) across {} camera(s)",
            frame_index.len(),
            cameras.len()
        );

        // One scan up front: jobs are assembled from the files that are
        // actually on disk, whatever their extension.
        let images_dir = self.scene_root.join(IMAGES_DIR);
        let image_map = discovery::scan_image_files(&images_dir).unwrap_or_default();

        for &index in frame_index {
            let outcome = self.process_frame(index, cameras, &image_map);
            match &outcome {
                FrameOutcome::Reconstructed => {
                    tracing::info!("Frame {} reconstructed", index);
                }
                FrameOutcome::AlreadyComplete => {
                    tracing::info!("Frame {} already complete, skipping", index);
                }
                FrameOutcome::Failed { reason } => {
                    tracing::warn!("Frame {} failed: {}", index, reason);
                }
            }
            self.report.lock().record(index, outcome);
        }

        let report = self.report.lock().clone();
        tracing::info!("Batch finished: {}", report.summary());

        if let Err(e) = self.write_report(&report) {
            tracing::warn!("Could not write batch report: {}", e);
        }

        report
    }

    /// Process one frame index, mapping every error into an outcome.
    fn process_frame(&self, index: u32, cameras: &[String], image_map: &CameraImageMap) -> FrameOutcome {
        let paths = WorkspacePaths::for_frame(&self.scene_root, index);

        // Resumability check before anything is touched.
        if workspace::is_complete(&paths) {
            return FrameOutcome::AlreadyComplete;
        }

        match self.run_pipeline(index, cameras, image_map, paths) {
            Ok(()) => FrameOutcome::Reconstructed,
            Err(e) => FrameOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }

    fn run_pipeline(
        &self,
        index: u32,
        cameras: &[String],
        image_map: &CameraImageMap,
        paths: WorkspacePaths,
    ) -> Result<(), PipelineError> {
        let job = self.frame_job(index, cameras, image_map);
        let logger = self.frame_logger(&job)?;
        logger.info(&format!(
            "Reconstructing frame {} from {} camera(s)",
            index,
            job.images.len()
        ));

        let ctx = Context::new(job, paths, self.settings.clone(), logger);
        let mut state = JobState::new(index);

        let pipeline = super::create_reconstruction_pipeline();
        let result = pipeline.run(&ctx, &mut state);
        self.write_state_manifest(&state);
        result.map(|_| ())
    }

    /// Assemble the job unit: one image path per camera at this index.
    ///
    /// Paths come from the discovery scan, so the extension is whatever
    /// is actually on disk. A camera with no scanned file at this index
    /// falls back to the conventional name, purely so the workspace
    /// error can name the file that was expected.
    fn frame_job(&self, index: u32, cameras: &[String], image_map: &CameraImageMap) -> FrameJob {
        let images_dir = self.scene_root.join(IMAGES_DIR);
        let ext = &self.settings.extraction.image_extension;
        let images = cameras
            .iter()
            .map(|camera| {
                let path = image_map
                    .get(camera)
                    .and_then(|frames| frames.get(&index))
                    .cloned()
                    .unwrap_or_else(|| images_dir.join(image_file_name(camera, index, ext)));
                FrameImage {
                    camera: camera.clone(),
                    path,
                }
            })
            .collect();
        FrameJob::new(index, images, self.scene_root.join(frame_dir_name(index)))
    }

    /// Persist the per-frame state manifest next to the frame's log.
    ///
    /// Best effort: the manifest is diagnostic output and never fails
    /// the frame.
    fn write_state_manifest(&self, state: &JobState) {
        let log_dir = self.scene_root.join(&self.settings.paths.logs_folder);
        let path = log_dir.join(format!("{}.state.json", frame_dir_name(state.frame)));
        match serde_json::to_string_pretty(state) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    tracing::warn!("Could not write state manifest {}: {}", path.display(), e);
                }
            }
            Err(e) => tracing::warn!("Could not serialize state for frame {}: {}", state.frame, e),
        }
    }

    fn frame_logger(&self, job: &FrameJob) -> Result<Arc<JobLogger>, PipelineError> {
        let log_dir = self.scene_root.join(&self.settings.paths.logs_folder);
        let config = LogConfig::from_settings(&self.settings.logging);
        JobLogger::new(job.label(), log_dir, config, None)
            .map(Arc::new)
            .map_err(|e| PipelineError::setup_failed(job.index, format!("logger: {}", e)))
    }

    /// Write the JSON ledger next to the frame workspaces.
    fn write_report(&self, report: &BatchReport) -> std::io::Result<()> {
        let path = self.report_path();
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&path, json)?;
        tracing::info!("Batch report written to {}", path.display());
        Ok(())
    }

    /// Path of the JSON batch report for this scene.
    pub fn report_path(&self) -> PathBuf {
        self.scene_root.join(&self.settings.paths.report_name)
    }

    /// Scene root this driver operates on.
    pub fn scene_root(&self) -> &Path {
        &self.scene_root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BatchStatus;
    use crate::workspace::MODEL_FILES;
    use tempfile::TempDir;

    /// Settings whose engine binary cannot exist, so any attempted
    /// stage invocation fails loudly instead of silently succeeding.
    fn settings_with_bogus_engine() -> Settings {
        let mut settings = Settings::default();
        settings.engine.binary = "definitely-not-a-real-engine".to_string();
        settings
    }

    fn write_complete_workspace(scene: &Path, index: u32) {
        let paths = WorkspacePaths::for_frame(scene, index);
        std::fs::create_dir_all(&paths.sparse_zero).unwrap();
        std::fs::create_dir_all(&paths.images).unwrap();
        for name in MODEL_FILES {
            std::fs::write(paths.sparse_zero.join(name), b"model").unwrap();
        }
    }

    fn write_frame_images(scene: &Path, cameras: &[&str], index: u32) {
        let images = scene.join(IMAGES_DIR);
        std::fs::create_dir_all(&images).unwrap();
        for cam in cameras {
            std::fs::write(images.join(format!("{}_{:04}.png", cam, index)), b"px").unwrap();
        }
    }

    #[test]
    fn completed_frames_skip_without_any_engine_invocation() {
        let dir = TempDir::new().unwrap();
        for index in 0..3 {
            write_complete_workspace(dir.path(), index);
        }

        // The bogus engine binary would turn any stage invocation into
        // a recorded failure, so an all-AlreadyComplete ledger proves
        // zero invocations happened.
        let driver = BatchDriver::new(dir.path(), settings_with_bogus_engine());
        let report = driver.run(&[0, 1, 2], &["cam0".to_string(), "cam1".to_string()]);

        assert!(report.all_already_complete());
        assert_eq!(report.status(), BatchStatus::FullSuccess);
    }

    #[test]
    fn one_failing_frame_does_not_stop_the_batch() {
        let dir = TempDir::new().unwrap();
        let cameras = vec!["cam0".to_string(), "cam1".to_string()];

        // Frames 0, 1, 3 are already reconstructed; frame 2 is missing
        // one camera image and must fail in isolation.
        for index in [0, 1, 3] {
            write_complete_workspace(dir.path(), index);
        }
        write_frame_images(dir.path(), &["cam0"], 2);

        let driver = BatchDriver::new(dir.path(), settings_with_bogus_engine());
        let report = driver.run(&[0, 1, 2, 3], &cameras);

        assert_eq!(report.succeeded(), vec![0, 1, 3]);
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, 2);
        assert!(failed[0].1.contains("cam1"));
        assert_eq!(report.status(), BatchStatus::PartialFailure);
    }

    #[test]
    fn jpg_scene_stages_from_discovered_paths() {
        let dir = TempDir::new().unwrap();
        let images = dir.path().join(IMAGES_DIR);
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("cam0_0000.jpg"), b"px").unwrap();
        std::fs::write(images.join("cam1_0000.jpg"), b"px").unwrap();

        let driver = BatchDriver::new(dir.path(), settings_with_bogus_engine());
        let report = driver.run(&[0], &["cam0".to_string(), "cam1".to_string()]);

        // The jpg files must be staged as-is. Getting past the workspace
        // step means the only failure left is the unlaunchable engine.
        let paths = WorkspacePaths::for_frame(dir.path(), 0);
        assert!(paths.staging.join("cam0_0000.jpg").exists());
        assert!(paths.staging.join("cam1_0000.jpg").exists());

        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert!(
            failed[0].1.contains("Features"),
            "unexpected failure reason: {}",
            failed[0].1
        );
        assert!(!failed[0].1.contains("Missing image"));
    }

    #[test]
    fn mixed_extensions_per_camera_stage_cleanly() {
        let dir = TempDir::new().unwrap();
        let images = dir.path().join(IMAGES_DIR);
        std::fs::create_dir_all(&images).unwrap();
        std::fs::write(images.join("cam0_0000.png"), b"px").unwrap();
        std::fs::write(images.join("cam1_0000.jpeg"), b"px").unwrap();

        let driver = BatchDriver::new(dir.path(), settings_with_bogus_engine());
        driver.run(&[0], &["cam0".to_string(), "cam1".to_string()]);

        let paths = WorkspacePaths::for_frame(dir.path(), 0);
        assert!(paths.staging.join("cam0_0000.png").exists());
        assert!(paths.staging.join("cam1_0000.jpeg").exists());
    }

    #[test]
    fn state_manifest_written_for_attempted_frames() {
        let dir = TempDir::new().unwrap();
        write_frame_images(dir.path(), &["cam0"], 0);

        let driver = BatchDriver::new(dir.path(), settings_with_bogus_engine());
        driver.run(&[0], &["cam0".to_string()]);

        let manifest = dir.path().join(".logs").join("frame_0000.state.json");
        let json = std::fs::read_to_string(&manifest).unwrap();
        assert!(json.contains("\"images_staged\": 1"));
    }

    #[test]
    fn report_is_written_to_scene_root() {
        let dir = TempDir::new().unwrap();
        write_complete_workspace(dir.path(), 0);

        let driver = BatchDriver::new(dir.path(), Settings::default());
        driver.run(&[0], &["cam0".to_string()]);

        let report_path = driver.report_path();
        assert!(report_path.is_file());
        let json = std::fs::read_to_string(report_path).unwrap();
        assert!(json.contains("already_complete"));
    }

    #[test]
    fn every_frame_failing_is_total_failure() {
        let dir = TempDir::new().unwrap();
        let driver = BatchDriver::new(dir.path(), settings_with_bogus_engine());
        let report = driver.run(&[0, 1], &["cam0".to_string()]);

        assert_eq!(report.succeeded(), Vec::<u32>::new());
        assert_eq!(report.status(), BatchStatus::TotalFailure);
        assert_eq!(report.status().exit_code(), 1);
    }
}
