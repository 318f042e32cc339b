//! Configuration management for frame-recon.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Defaults for every missing key
//!
//! # Example
//!
//! ```no_run
//! use frc_core::config::ConfigManager;
//!
//! let mut config = ConfigManager::new("scene/frame-recon.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Engine: {}", config.settings().engine.binary);
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    EngineSettings, ExtractionSettings, LoggingSettings, PathSettings, Settings,
};
