pub mod errors;
pub mod ids;
pub mod plan;
pub mod record;
pub mod report;
pub mod step;

pub use errors::{Error, ErrorKind, Result};
pub use ids::{action_id, plan_id, RunId};
pub use plan::{RunMode, RunOptions, RunPlan};
pub use record::{ExecutionRecord, SkipReason, SnapshotRef, StepOutcome};
pub use report::{PreflightReport, RollbackReport, RunReport, RunSummary};
pub use step::{CommandSpec, Probe, ServiceOp, Step, StepAction};
