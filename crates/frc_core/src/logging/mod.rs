//! Logging for frame-recon.
//!
//! Two complementary schemes:
//! - `tracing` macros for library-level diagnostics (the binary installs
//!   a `tracing-subscriber`)
//! - A per-frame [`JobLogger`] that writes one log file per frame job and
//!   keeps a tail buffer of engine output for error diagnosis

mod job_logger;
mod types;

pub use job_logger::JobLogger;
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};
