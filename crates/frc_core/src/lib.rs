//! FRC Core - Backend logic for frame-recon
//!
//! This crate contains all orchestration logic with zero CLI dependencies:
//! frame discovery, video frame extraction, per-frame workspace management,
//! and the reconstruction stage pipeline driving an external COLMAP binary.
//! It can be used by the CLI binary or embedded in another tool.

pub mod colmap;
pub mod config;
pub mod discovery;
pub mod extraction;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod workspace;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_returns_value() {
        assert!(!version().is_empty());
    }
}
