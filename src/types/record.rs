//! Per-step execution records: appended exactly once per step per run,
//! immutable after creation.

use serde::{Deserialize, Serialize};

/// Why a step was skipped rather than run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The idempotency probe held; the desired state already exists.
    Satisfied,
    /// The step precedes the `resume_from` boundary.
    Resume,
}

/// Terminal outcome of one step attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    Skipped(SkipReason),
    /// Dry-run only: the step would have run.
    WouldRun,
    Failed(String),
}

impl StepOutcome {
    /// Stable label used in facts and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            StepOutcome::Succeeded => "succeeded",
            StepOutcome::Skipped(_) => "skipped",
            StepOutcome::WouldRun => "would_run",
            StepOutcome::Failed(_) => "failed",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StepOutcome::Failed(_))
    }
}

/// Handle to one snapshot taken for a step, locating the payload inside
/// the run's backup directory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRef {
    /// Global per-run sequence number; rollback replays in reverse.
    pub seq: u64,
    /// Relative form of the mutated path (leading `/` stripped).
    pub rel: String,
    /// Payload location relative to the run directory.
    pub payload: String,
}

/// One entry per step attempt.
#[derive(Clone, Debug)]
pub struct ExecutionRecord {
    pub step_id: String,
    pub ts: String,
    pub outcome: StepOutcome,
    /// Stable error identifier when `outcome` is `Failed`.
    pub error_id: Option<&'static str>,
    pub snapshots: Vec<SnapshotRef>,
    pub duration_ms: u64,
}
