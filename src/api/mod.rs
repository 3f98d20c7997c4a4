// Facade for API module; delegates to submodules under src/api/

use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use crate::adapters::LockManager;
use crate::backup::PruneResult;
use crate::constants::DEFAULT_LOCK_TIMEOUT_MS;
use crate::exec::{CommandRunner, SystemRunner};
use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::registry::StepRegistry;
use crate::types::{PreflightReport, RollbackReport, RunId, RunOptions, RunPlan, RunReport};

pub mod errors;
mod execute;
mod plan;
mod rollback;

/// Engine facade: owns the sinks, the executor seam, the backup area,
/// and the lock, and exposes the plan/preflight/execute/rollback cycle.
pub struct Provisioner<E: FactsEmitter, A: AuditSink> {
    facts: E,
    audit: A,
    backup_root: PathBuf,
    host_root: PathBuf,
    runner: Box<dyn CommandRunner>,
    lock: Option<Box<dyn LockManager>>, // None in dev/test; set by the CLI
    lock_timeout_ms: u64,
}

impl<E: FactsEmitter, A: AuditSink> Provisioner<E, A> {
    pub fn new(facts: E, audit: A, backup_root: PathBuf) -> Self {
        Self {
            facts,
            audit,
            backup_root,
            host_root: PathBuf::from("/"),
            runner: Box::new(SystemRunner),
            lock: None,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    /// Substitute the executor seam (tests script the host this way).
    pub fn with_command_runner(mut self, runner: Box<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_lock_manager(mut self, lock: Box<dyn LockManager>) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn with_lock_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    /// Root the restore target somewhere other than `/` (tests).
    pub fn with_host_root(mut self, root: PathBuf) -> Self {
        self.host_root = root;
        self
    }

    /// Build the run plan: dependency-ordered, `--only`-filtered, with
    /// the resume boundary validated. Emits one `plan` fact per selected
    /// step.
    pub fn plan(
        &self,
        registry: &StepRegistry,
        options: &RunOptions,
    ) -> Result<RunPlan, errors::ApiError> {
        plan::build(self, registry, options)
    }

    /// Evaluate the pre-execution checks for a plan without running it.
    /// `execute` performs the same checks and rejects the run on any stop.
    pub fn preflight(&self, plan: &RunPlan, options: &RunOptions) -> PreflightReport {
        crate::preflight::run(&crate::preflight::PreflightInput {
            plan,
            options,
            backup_root: &self.backup_root,
        })
    }

    /// Execute a plan. Step-level failures are recorded in the report;
    /// only pre-execution rejections (preconditions, locking) error out.
    pub fn execute(
        &self,
        plan: &RunPlan,
        options: &RunOptions,
    ) -> Result<RunReport, errors::ApiError> {
        execute::run(self, plan, options)
    }

    /// Replay a recorded run's snapshots in reverse. Manual only; the
    /// engine never rolls back on its own.
    pub fn rollback(&self, run_id: &RunId) -> Result<RollbackReport, errors::ApiError> {
        rollback::run(self, run_id)
    }

    /// Prune backup run directories according to retention knobs.
    ///
    /// Emits a `prune.result` fact with counts and the policy used.
    pub fn prune_backups(
        &self,
        count_limit: Option<usize>,
        age_limit: Option<Duration>,
    ) -> Result<PruneResult, errors::ApiError> {
        // Synthesize a stable plan-like id for pruning from the root path.
        let plan_like = format!("prune:{}", self.backup_root.display());
        let pid = Uuid::new_v5(&Uuid::NAMESPACE_URL, plan_like.as_bytes());
        let tctx = AuditCtx::new(
            &self.facts as &dyn FactsEmitter,
            pid.to_string(),
            "prune".to_string(),
            crate::logging::redact::now_iso(),
            AuditMode { dry_run: false, redact: false },
        );
        let slog = StageLogger::new(&tctx);

        match crate::backup::prune_runs(&self.backup_root, count_limit, age_limit) {
            Ok(res) => {
                slog.prune_result()
                    .merge(json!({
                        "backup_root": self.backup_root.display().to_string(),
                        "retention_count_limit": count_limit,
                        "retention_age_limit_ms": age_limit.map(|d| d.as_millis() as u64),
                        "pruned_count": res.pruned_count,
                        "retained_count": res.retained_count,
                    }))
                    .emit_success();
                Ok(res)
            }
            Err(e) => {
                slog.prune_result()
                    .merge(json!({
                        "backup_root": self.backup_root.display().to_string(),
                        "error": e.to_string(),
                    }))
                    .emit_failure();
                Err(errors::ApiError::Backup(e.to_string()))
            }
        }
    }

    pub(crate) fn facts(&self) -> &dyn FactsEmitter {
        &self.facts
    }

    pub(crate) fn audit(&self) -> &dyn AuditSink {
        &self.audit
    }

    pub(crate) fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub(crate) fn lock_manager(&self) -> Option<&dyn LockManager> {
        self.lock.as_deref()
    }

    pub(crate) fn lock_timeout_ms(&self) -> u64 {
        self.lock_timeout_ms
    }

    pub(crate) fn backup_root(&self) -> &std::path::Path {
        &self.backup_root
    }

    pub(crate) fn host_root(&self) -> &std::path::Path {
        &self.host_root
    }
}
