//! Batch report ledger.
//!
//! The batch driver records one `FrameRecord` per frame index as it goes.
//! The report is append-only and is the only state shared across frames.

use serde::{Deserialize, Serialize};

/// Outcome of processing one frame index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FrameOutcome {
    /// Reconstruction pipeline ran and produced a complete model.
    Reconstructed,
    /// Workspace already held a complete reconstruction; no stages ran.
    AlreadyComplete,
    /// The frame failed; the reason is the caught error's message.
    Failed { reason: String },
}

impl FrameOutcome {
    /// Whether this outcome counts as a success.
    pub fn is_success(&self) -> bool {
        !matches!(self, FrameOutcome::Failed { .. })
    }
}

/// One ledger entry: a frame index and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRecord {
    /// The frame index.
    pub index: u32,
    /// What happened to it.
    #[serde(flatten)]
    pub outcome: FrameOutcome,
}

/// Batch-level success classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Every frame succeeded (reconstructed or already complete).
    FullSuccess,
    /// Some frames succeeded, some failed.
    PartialFailure,
    /// No frame succeeded.
    TotalFailure,
}

impl BatchStatus {
    /// Process exit code for this status.
    pub fn exit_code(&self) -> i32 {
        match self {
            BatchStatus::FullSuccess => 0,
            BatchStatus::PartialFailure => 2,
            BatchStatus::TotalFailure => 1,
        }
    }
}

/// Aggregate of all frame outcomes for one run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    /// Per-frame records in processing order.
    pub records: Vec<FrameRecord>,
}

impl BatchReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one frame's outcome.
    pub fn record(&mut self, index: u32, outcome: FrameOutcome) {
        self.records.push(FrameRecord { index, outcome });
    }

    /// Indices that succeeded, in order.
    pub fn succeeded(&self) -> Vec<u32> {
        self.records
            .iter()
            .filter(|r| r.outcome.is_success())
            .map(|r| r.index)
            .collect()
    }

    /// Failed indices with their reasons, in order.
    pub fn failed(&self) -> Vec<(u32, &str)> {
        self.records
            .iter()
            .filter_map(|r| match &r.outcome {
                FrameOutcome::Failed { reason } => Some((r.index, reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Whether every record is `AlreadyComplete`.
    pub fn all_already_complete(&self) -> bool {
        !self.records.is_empty()
            && self
                .records
                .iter()
                .all(|r| r.outcome == FrameOutcome::AlreadyComplete)
    }

    /// Classify the batch as a whole.
    pub fn status(&self) -> BatchStatus {
        let succeeded = self.records.iter().filter(|r| r.outcome.is_success()).count();
        let failed = self.records.len() - succeeded;

        if failed == 0 {
            BatchStatus::FullSuccess
        } else if succeeded == 0 {
            BatchStatus::TotalFailure
        } else {
            BatchStatus::PartialFailure
        }
    }

    /// One-line summary for logging.
    pub fn summary(&self) -> String {
        let succeeded = self.succeeded().len();
        let failed = self.records.len() - succeeded;
        format!(
            "{} frame(s): {} succeeded, {} failed",
            self.records.len(),
            succeeded,
            failed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        let mut report = BatchReport::new();
        report.record(0, FrameOutcome::Reconstructed);
        report.record(1, FrameOutcome::AlreadyComplete);
        assert_eq!(report.status(), BatchStatus::FullSuccess);
        assert_eq!(report.status().exit_code(), 0);

        report.record(2, FrameOutcome::Failed {
            reason: "mapper failed".to_string(),
        });
        assert_eq!(report.status(), BatchStatus::PartialFailure);
        assert_eq!(report.status().exit_code(), 2);

        let mut all_failed = BatchReport::new();
        all_failed.record(0, FrameOutcome::Failed {
            reason: "no images".to_string(),
        });
        assert_eq!(all_failed.status(), BatchStatus::TotalFailure);
        assert_eq!(all_failed.status().exit_code(), 1);
    }

    #[test]
    fn ledger_lists_failures_with_reasons() {
        let mut report = BatchReport::new();
        report.record(0, FrameOutcome::Reconstructed);
        report.record(2, FrameOutcome::Failed {
            reason: "missing image for camera cam1".to_string(),
        });

        assert_eq!(report.succeeded(), vec![0]);
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, 2);
        assert!(failed[0].1.contains("cam1"));
    }

    #[test]
    fn already_complete_detection() {
        let mut report = BatchReport::new();
        assert!(!report.all_already_complete());
        report.record(0, FrameOutcome::AlreadyComplete);
        report.record(1, FrameOutcome::AlreadyComplete);
        assert!(report.all_already_complete());
        report.record(2, FrameOutcome::Reconstructed);
        assert!(!report.all_already_complete());
    }

    #[test]
    fn report_serializes() {
        let mut report = BatchReport::new();
        report.record(3, FrameOutcome::Failed {
            reason: "timeout".to_string(),
        });
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"index\":3"));
        assert!(json.contains("\"outcome\":\"failed\""));
    }
}
