//! Execute stage: walk the plan in order, realize idempotency via the
//! satisfaction probes, snapshot before mutation, and record every
//! decision.
//!
//! Side-effects:
//! - Emits facts for `apply.attempt`, `check`, and `apply.result` per
//!   step, plus a `run.summary`.
//! - Acquires the process lock in commit mode when a manager is
//!   configured.
//! - Never rolls back on failure; rollback is a separate, manual stage.

mod handlers;

use std::time::Instant;

use log::Level;
use serde_json::json;

use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{ts_for_mode, AuditSink, FactsEmitter, StageLogger, RUN_ID_ZERO};
use crate::preflight::{self, PreflightInput};
use crate::types::ids::plan_id;
use crate::types::plan::{RunMode, RunOptions, RunPlan};
use crate::types::record::{ExecutionRecord, SkipReason, StepOutcome};
use crate::types::report::RunReport;
use crate::types::RunId;

use super::errors::ApiError;
use super::Provisioner;

pub(crate) fn run<E: FactsEmitter, A: AuditSink>(
    api: &Provisioner<E, A>,
    plan: &RunPlan,
    options: &RunOptions,
) -> Result<RunReport, ApiError> {
    let t0 = Instant::now();
    let dry = options.mode == RunMode::DryRun;
    let pid = plan_id(plan);
    let run_id = if dry {
        RunId::from_name(RUN_ID_ZERO)
    } else {
        RunId::now()
    };

    let tctx = AuditCtx::new(
        api.facts(),
        pid.to_string(),
        run_id.to_string(),
        ts_for_mode(options.mode),
        AuditMode { dry_run: dry, redact: dry },
    );
    let slog = StageLogger::new(&tctx);
    api.audit().log(Level::Info, "run: starting");

    // Preconditions gate the whole run; a rejected run touches nothing.
    let pf = preflight::run(&PreflightInput {
        plan,
        options,
        backup_root: api.backup_root(),
    });
    for w in &pf.warnings {
        slog.preflight().field("note", json!(w)).emit_warn();
    }
    for s in &pf.stops {
        slog.preflight().field("note", json!(s)).emit_failure();
    }
    if !pf.ok {
        api.audit().log(Level::Error, "run: rejected by preflight");
        return Err(ApiError::Precondition(pf.stops.join("; ")));
    }
    slog.preflight()
        .field("warnings", json!(pf.warnings.len()))
        .emit_success();

    // Serialize against other engine instances before mutating anything.
    let mut _lock_guard = None;
    if !dry {
        if let Some(mgr) = api.lock_manager() {
            let t_lock = Instant::now();
            match mgr.acquire_process_lock(api.lock_timeout_ms()) {
                Ok(guard) => {
                    slog.apply_attempt()
                        .field("lock_backend", json!("file"))
                        .field("lock_wait_ms", json!(t_lock.elapsed().as_millis() as u64))
                        .emit_success();
                    _lock_guard = Some(guard);
                }
                Err(e) => {
                    slog.apply_attempt()
                        .field("lock_backend", json!("file"))
                        .field(
                            "error_id",
                            json!(crate::api::errors::id_str(crate::api::errors::ErrorId::E_LOCKING)),
                        )
                        .field("error", json!(e.to_string()))
                        .emit_failure();
                    return Err(ApiError::LockingTimeout(e.to_string()));
                }
            }
        }
    }

    let run_dir = crate::backup::run_dir(api.backup_root(), &run_id);
    let mut seq: u64 = 0;
    let mut records: Vec<ExecutionRecord> = Vec::new();
    let mut halted_on: Option<String> = None;
    let mut reached = options.resume_from.is_none();

    for (idx, step) in plan.steps.iter().enumerate() {
        if !reached {
            if options.resume_from.as_deref() == Some(step.id.as_str()) {
                reached = true;
            } else {
                let record = ExecutionRecord {
                    step_id: step.id.clone(),
                    ts: ts_for_mode(options.mode),
                    outcome: StepOutcome::Skipped(SkipReason::Resume),
                    error_id: None,
                    snapshots: Vec::new(),
                    duration_ms: 0,
                };
                handlers::emit_record(&slog, &pid, step, idx, &record, json!({"skip_reason": "resume"}));
                records.push(record);
                continue;
            }
        }

        let record = handlers::run_step(api, &slog, &pid, step, idx, options, &run_dir, &mut seq);
        let failed = record.outcome.is_failure();
        records.push(record);

        if failed && options.stop_on_failure {
            halted_on = Some(step.id.clone());
            api.audit()
                .log(Level::Error, &format!("run: halted on step {}", step.id));
            break;
        }
    }

    let report = RunReport {
        run_id,
        plan_uuid: pid,
        records,
        duration_ms: u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX),
        halted_on,
    };

    let summary = report.summary();
    let decision_ok = report.ok();
    let builder = slog
        .run_summary()
        .field("succeeded", json!(summary.succeeded))
        .field("skipped", json!(summary.skipped))
        .field("would_run", json!(summary.would_run))
        .field("failed", json!(summary.failed))
        .field("irreversible", json!(irreversible_touched(&report, plan)))
        .field("halted_on", json!(report.halted_on));
    if decision_ok {
        builder.emit_success();
    } else {
        builder.emit_failure();
    }
    api.audit().log(Level::Info, "run: finished");

    Ok(report)
}

/// Irreversible steps that actually ran; the summary calls these out
/// because re-running or rolling back cannot undo them.
fn irreversible_touched(report: &RunReport, plan: &RunPlan) -> Vec<String> {
    report
        .records
        .iter()
        .filter(|r| matches!(r.outcome, StepOutcome::Succeeded))
        .filter_map(|r| {
            plan.steps
                .iter()
                .find(|s| s.id == r.step_id)
                .filter(|s| !s.reversible)
                .map(|s| s.id.clone())
        })
        .collect()
}
