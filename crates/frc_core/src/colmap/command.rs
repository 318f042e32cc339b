//! Low-level engine command execution.
//!
//! Each reconstruction stage is an opaque external command with a
//! well-defined exit status. This module builds argument vectors,
//! runs them as blocking child processes with captured output, and
//! enforces the optional per-stage timeout.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;

use crate::logging::JobLogger;

/// How often a running stage is polled for exit or timeout.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Error type for reconstruction stage execution.
#[derive(Error, Debug)]
pub enum StageError {
    /// The engine binary could not be launched at all.
    #[error("Stage '{stage}' failed to launch: {source}")]
    LaunchFailed {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine exited with a non-zero status.
    #[error("Stage '{stage}' failed with exit code {exit_code}: {output}")]
    CommandFailed {
        stage: String,
        exit_code: i32,
        output: String,
    },

    /// The stage exceeded the configured timeout and was killed.
    #[error("Stage '{stage}' timed out after {timeout_secs}s")]
    TimedOut { stage: String, timeout_secs: u64 },

    /// I/O error while supervising the child process.
    #[error("Stage '{stage}' I/O error: {source}")]
    Io {
        stage: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for stage execution.
pub type StageResult<T> = Result<T, StageError>;

/// A fully-built external command, inspectable before execution.
///
/// Keeping the argument vector explicit lets configuration (GPU flag,
/// tolerances, paths) be asserted on without running anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to invoke.
    pub program: String,
    /// Arguments in order.
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Start a new command spec.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append a `--flag value` pair.
    pub fn flag(self, flag: &str, value: impl Into<String>) -> Self {
        self.arg(flag).arg(value)
    }

    /// Append a path argument.
    pub fn path_arg(self, flag: &str, path: &Path) -> Self {
        self.flag(flag, path.display().to_string())
    }

    /// Render the full command line for logging.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Run one reconstruction stage to completion.
///
/// The child's stdout and stderr are streamed into the job logger's
/// tail buffer. With `timeout_secs > 0` an overrunning child is killed
/// and the stage reports a distinguished timeout failure; stage
/// failures are never retried.
pub fn run_stage(
    stage: &str,
    spec: &CommandSpec,
    timeout_secs: u64,
    logger: &Arc<JobLogger>,
) -> StageResult<()> {
    logger.command(&spec.command_line());
    logger.clear_tail();

    let mut child = Command::new(&spec.program)
        .args(&spec.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| StageError::LaunchFailed {
            stage: stage.to_string(),
            source: e,
        })?;

    let captured: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let mut readers = Vec::new();

    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, false, Arc::clone(&captured), logger));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, true, Arc::clone(&captured), logger));
    }

    let deadline = (timeout_secs > 0).then(|| Instant::now() + Duration::from_secs(timeout_secs));

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        for reader in readers {
                            let _ = reader.join();
                        }
                        logger.error(&format!(
                            "Stage '{}' exceeded {}s timeout, killed",
                            stage, timeout_secs
                        ));
                        return Err(StageError::TimedOut {
                            stage: stage.to_string(),
                            timeout_secs,
                        });
                    }
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.kill();
                return Err(StageError::Io {
                    stage: stage.to_string(),
                    source: e,
                });
            }
        }
    };

    for reader in readers {
        let _ = reader.join();
    }

    if !status.success() {
        let exit_code = status.code().unwrap_or(-1);
        logger.show_tail(stage);
        let output = captured.lock().join("\n");
        return Err(StageError::CommandFailed {
            stage: stage.to_string(),
            exit_code,
            output,
        });
    }

    Ok(())
}

/// Stream reader thread shared by stdout and stderr.
fn spawn_reader<R: std::io::Read + Send + 'static>(
    stream: R,
    is_stderr: bool,
    captured: Arc<Mutex<Vec<String>>>,
    logger: &Arc<JobLogger>,
) -> thread::JoinHandle<()> {
    let logger = Arc::clone(logger);
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.lines() {
            let Ok(line) = line else { break };
            captured.lock().push(line.clone());
            logger.output_line(&line, is_stderr);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use tempfile::TempDir;

    fn test_logger(dir: &TempDir) -> Arc<JobLogger> {
        Arc::new(JobLogger::new("frame_0000", dir.path(), LogConfig::default(), None).unwrap())
    }

    #[test]
    fn command_line_renders_in_order() {
        let spec = CommandSpec::new("colmap")
            .arg("feature_extractor")
            .flag("--database_path", "/ws/temp/database.db")
            .flag("--SiftExtraction.use_gpu", "1");
        assert_eq!(
            spec.command_line(),
            "colmap feature_extractor --database_path /ws/temp/database.db \
             --SiftExtraction.use_gpu 1"
        );
    }

    #[test]
    fn successful_command_returns_ok() {
        let dir = TempDir::new().unwrap();
        let logger = test_logger(&dir);
        let spec = CommandSpec::new("true");
        run_stage("noop", &spec, 0, &logger).unwrap();
    }

    #[test]
    fn nonzero_exit_is_command_failed() {
        let dir = TempDir::new().unwrap();
        let logger = test_logger(&dir);
        let spec = CommandSpec::new("false");
        let err = run_stage("failing", &spec, 0, &logger).unwrap_err();
        match err {
            StageError::CommandFailed {
                stage, exit_code, ..
            } => {
                assert_eq!(stage, "failing");
                assert_eq!(exit_code, 1);
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[test]
    fn missing_binary_is_launch_failure() {
        let dir = TempDir::new().unwrap();
        let logger = test_logger(&dir);
        let spec = CommandSpec::new("definitely-not-colmap-bin");
        let err = run_stage("features", &spec, 0, &logger).unwrap_err();
        assert!(matches!(err, StageError::LaunchFailed { .. }));
    }

    #[test]
    fn overrunning_stage_times_out() {
        let dir = TempDir::new().unwrap();
        let logger = test_logger(&dir);
        let spec = CommandSpec::new("sleep").arg("30");
        let start = Instant::now();
        let err = run_stage("slow", &spec, 1, &logger).unwrap_err();
        assert!(matches!(
            err,
            StageError::TimedOut {
                timeout_secs: 1,
                ..
            }
        ));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn output_is_captured_on_failure() {
        let dir = TempDir::new().unwrap();
        let logger = test_logger(&dir);
        let spec = CommandSpec::new("sh")
            .arg("-c")
            .arg("echo diagnostic detail >&2; exit 3");
        let err = run_stage("mapper", &spec, 0, &logger).unwrap_err();
        match err {
            StageError::CommandFailed {
                exit_code, output, ..
            } => {
                assert_eq!(exit_code, 3);
                assert!(output.contains("diagnostic detail"));
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }
}
