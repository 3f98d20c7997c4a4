use uuid::Uuid;

use super::ids::RunId;
use super::record::{ExecutionRecord, StepOutcome};

#[derive(Clone, Debug, Default)]
pub struct PreflightReport {
    pub ok: bool,
    pub warnings: Vec<String>,
    pub stops: Vec<String>,
}

/// Aggregate result of one run. Step-level errors live in the records;
/// the run as a whole only errors out before execution starts.
#[derive(Clone, Debug)]
pub struct RunReport {
    pub run_id: RunId,
    pub plan_uuid: Uuid,
    pub records: Vec<ExecutionRecord>,
    pub duration_ms: u64,
    /// Step id the plan halted on when `stop_on_failure` tripped.
    pub halted_on: Option<String>,
}

impl RunReport {
    pub fn ok(&self) -> bool {
        !self.records.iter().any(|r| r.outcome.is_failure())
    }

    pub fn summary(&self) -> RunSummary {
        let mut s = RunSummary::default();
        for r in &self.records {
            match r.outcome {
                StepOutcome::Succeeded => s.succeeded += 1,
                StepOutcome::Skipped(_) => s.skipped += 1,
                StepOutcome::WouldRun => s.would_run += 1,
                StepOutcome::Failed(_) => s.failed += 1,
            }
        }
        s
    }
}

/// Counts of step outcomes plus the irreversible steps touched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub would_run: usize,
    pub failed: usize,
    pub irreversible: Vec<String>,
}

/// Result of replaying one run's snapshots in reverse.
#[derive(Clone, Debug, Default)]
pub struct RollbackReport {
    pub run_id: String,
    /// Relative paths restored, in restore order.
    pub restored: Vec<String>,
    /// Step id of the first irreversible step encountered, where the
    /// replay stopped.
    pub halted_at: Option<String>,
    pub errors: Vec<String>,
}

impl RollbackReport {
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}
