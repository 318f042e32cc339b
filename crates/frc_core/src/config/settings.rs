//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Every field has a serde default so a partial config file is valid.

use serde::{Deserialize, Serialize};

/// Root settings structure containing all configuration sections.
///
/// There is no process-wide singleton: the loaded settings are passed
/// into the batch driver and threaded through to each component.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Frame extraction settings.
    #[serde(default)]
    pub extraction: ExtractionSettings,

    /// Reconstruction engine settings.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Paths for logs and the batch report, relative to the scene directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Folder for per-frame log files.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,

    /// Filename for the JSON batch report.
    #[serde(default = "default_report_name")]
    pub report_name: String,
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

fn default_report_name() -> String {
    "batch_report.json".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            logs_folder: default_logs_folder(),
            report_name: default_report_name(),
        }
    }
}

/// Frame extraction (external decoder) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSettings {
    /// Decoder binary.
    #[serde(default = "default_ffmpeg")]
    pub ffmpeg_binary: String,

    /// Probe binary used to read video frame counts.
    #[serde(default = "default_ffprobe")]
    pub ffprobe_binary: String,

    /// Extension for extracted frame images.
    #[serde(default = "default_image_extension")]
    pub image_extension: String,

    /// Allowed spread between per-camera frame counts before the run
    /// aborts with an inconsistency error. Within the tolerance the
    /// intersection of available frames is used (and logged).
    #[serde(default)]
    pub frame_count_tolerance: u32,
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_ffprobe() -> String {
    "ffprobe".to_string()
}

fn default_image_extension() -> String {
    "png".to_string()
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            ffmpeg_binary: default_ffmpeg(),
            ffprobe_binary: default_ffprobe(),
            image_extension: default_image_extension(),
            frame_count_tolerance: 0,
        }
    }
}

/// Reconstruction engine (COLMAP) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Engine binary.
    #[serde(default = "default_engine_binary")]
    pub binary: String,

    /// Use GPU for the GPU-capable stages (feature extraction, matching).
    #[serde(default = "default_true")]
    pub use_gpu: bool,

    /// Camera model passed to feature extraction.
    #[serde(default = "default_camera_model")]
    pub camera_model: String,

    /// Treat all images as sharing one camera. Off for multi-camera rigs.
    #[serde(default)]
    pub single_camera: bool,

    /// Bundle adjustment global function tolerance for the mapper.
    #[serde(default = "default_ba_tolerance")]
    pub ba_global_function_tolerance: f64,

    /// Per-stage timeout in seconds. 0 disables the timeout and every
    /// stage blocks until the engine exits.
    #[serde(default)]
    pub stage_timeout_secs: u64,
}

fn default_engine_binary() -> String {
    "colmap".to_string()
}

fn default_camera_model() -> String {
    "PINHOLE".to_string()
}

fn default_ba_tolerance() -> f64 {
    0.000001
}

fn default_true() -> bool {
    true
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            binary: default_engine_binary(),
            use_gpu: true,
            camera_model: default_camera_model(),
            single_camera: false,
            ba_global_function_tolerance: default_ba_tolerance(),
            stage_timeout_secs: 0,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Use compact log format (engine output only kept in the tail buffer).
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of engine output lines kept for error diagnosis.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Show timestamps in per-frame log files.
    #[serde(default = "default_true")]
    pub show_timestamps: bool,
}

fn default_error_tail() -> u32 {
    20
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            show_timestamps: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let settings = Settings::default();
        assert_eq!(settings.engine.binary, "colmap");
        assert!(settings.engine.use_gpu);
        assert_eq!(settings.engine.camera_model, "PINHOLE");
        assert_eq!(settings.extraction.image_extension, "png");
        assert_eq!(settings.extraction.frame_count_tolerance, 0);
        assert_eq!(settings.engine.stage_timeout_secs, 0);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [engine]
            use_gpu = false
            "#,
        )
        .unwrap();
        assert!(!settings.engine.use_gpu);
        assert_eq!(settings.engine.binary, "colmap");
        assert_eq!(settings.paths.logs_folder, ".logs");
    }

    #[test]
    fn settings_round_trip() {
        let mut settings = Settings::default();
        settings.extraction.frame_count_tolerance = 2;
        settings.engine.stage_timeout_secs = 600;

        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.extraction.frame_count_tolerance, 2);
        assert_eq!(parsed.engine.stage_timeout_secs, 600);
    }
}
