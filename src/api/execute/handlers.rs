//! Per-step handling: probe, snapshot, apply, and fact emission.

use std::path::Path;
use std::time::Instant;

use log::Level;
use serde_json::json;
use uuid::Uuid;

use crate::api::errors::{error_id_for_step, id_str, ErrorId};
use crate::exec::{evaluate_probe, output_tail, StepExecutor};
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::ids::action_id;
use crate::types::plan::{RunMode, RunOptions};
use crate::types::record::{ExecutionRecord, SkipReason, StepOutcome};
use crate::types::step::Step;

use crate::api::Provisioner;
use crate::logging::ts_for_mode;

/// Drive one step through its state machine and return its record.
/// Step-level errors are converted into the record, never propagated.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run_step<E: FactsEmitter, A: AuditSink>(
    api: &Provisioner<E, A>,
    slog: &StageLogger<'_>,
    pid: &Uuid,
    step: &Step,
    idx: usize,
    options: &RunOptions,
    run_dir: &Path,
    seq: &mut u64,
) -> ExecutionRecord {
    let t0 = Instant::now();
    let dry = options.mode == RunMode::DryRun;
    let aid = action_id(pid, step, idx);
    let ts = ts_for_mode(options.mode);

    slog.apply_attempt()
        .step(step.id.clone())
        .action(aid.to_string())
        .emit_success();

    // CHECKING: the idempotency probe decides SATISFIED vs NEEDS_RUN.
    let satisfied = match evaluate_probe(&step.satisfied, api.runner()) {
        Ok(sat) => {
            slog.check()
                .step(step.id.clone())
                .field("satisfied", json!(sat))
                .emit_success();
            sat
        }
        Err(e) => {
            // State that cannot be probed safely must not be mutated.
            let eid = error_id_for_step(&e);
            slog.check().step(step.id.clone()).field("error", json!(e.to_string())).emit_failure();
            let record = ExecutionRecord {
                step_id: step.id.clone(),
                ts,
                outcome: StepOutcome::Failed(format!("probe failed: {e}")),
                error_id: Some(id_str(eid)),
                snapshots: Vec::new(),
                duration_ms: elapsed_ms(t0),
            };
            emit_record(slog, pid, step, idx, &record, json!({}));
            return record;
        }
    };

    if satisfied {
        let record = ExecutionRecord {
            step_id: step.id.clone(),
            ts,
            outcome: StepOutcome::Skipped(SkipReason::Satisfied),
            error_id: None,
            snapshots: Vec::new(),
            duration_ms: elapsed_ms(t0),
        };
        emit_record(slog, pid, step, idx, &record, json!({"skip_reason": "satisfied"}));
        return record;
    }

    if dry {
        // Record what would run without touching executor or backup.
        let record = ExecutionRecord {
            step_id: step.id.clone(),
            ts,
            outcome: StepOutcome::WouldRun,
            error_id: None,
            snapshots: Vec::new(),
            duration_ms: elapsed_ms(t0),
        };
        emit_record(slog, pid, step, idx, &record, json!({}));
        return record;
    }

    // Snapshot before mutation; a step whose state cannot be backed up
    // must not run.
    let snapshots = match crate::backup::snapshot_step(run_dir, api.host_root(), step, seq) {
        Ok(refs) => refs,
        Err(e) => {
            let record = ExecutionRecord {
                step_id: step.id.clone(),
                ts,
                outcome: StepOutcome::Failed(format!("snapshot failed: {e}")),
                error_id: Some(id_str(ErrorId::E_BACKUP)),
                snapshots: Vec::new(),
                duration_ms: elapsed_ms(t0),
            };
            emit_record(slog, pid, step, idx, &record, json!({}));
            return record;
        }
    };

    // RUNNING.
    let executor = StepExecutor::new(api.runner(), options.step_timeout);
    match executor.apply(&step.action) {
        Ok(output) => {
            let mut extra = json!({"snapshots": snapshots.len()});
            if let Some(out) = output {
                if !out.stdout.is_empty() {
                    api.audit().log(Level::Info, &out.stdout);
                }
                if !out.stderr.is_empty() {
                    api.audit().log(Level::Warn, &out.stderr);
                }
                if let Some(obj) = extra.as_object_mut() {
                    obj.insert("exit_code".into(), json!(out.status));
                    obj.insert("stdout_tail".into(), json!(output_tail(&out.stdout)));
                    obj.insert("stderr_tail".into(), json!(output_tail(&out.stderr)));
                }
            }
            let record = ExecutionRecord {
                step_id: step.id.clone(),
                ts,
                outcome: StepOutcome::Succeeded,
                error_id: None,
                snapshots,
                duration_ms: elapsed_ms(t0),
            };
            emit_record(slog, pid, step, idx, &record, extra);
            record
        }
        Err(e) => {
            let eid = error_id_for_step(&e);
            let record = ExecutionRecord {
                step_id: step.id.clone(),
                ts,
                outcome: StepOutcome::Failed(e.to_string()),
                error_id: Some(id_str(eid)),
                snapshots,
                duration_ms: elapsed_ms(t0),
            };
            emit_record(slog, pid, step, idx, &record, json!({}));
            record
        }
    }
}

/// Emit the `apply.result` fact for a finished record.
pub(crate) fn emit_record(
    slog: &StageLogger<'_>,
    pid: &Uuid,
    step: &Step,
    idx: usize,
    record: &ExecutionRecord,
    extra: serde_json::Value,
) {
    let aid = action_id(pid, step, idx);
    let mut b = slog
        .apply_result()
        .step(step.id.clone())
        .action(aid.to_string())
        .field("outcome", json!(record.outcome.label()))
        .field("reversible", json!(step.reversible))
        .field("duration_ms", json!(record.duration_ms))
        .merge(extra);
    if let Some(eid) = record.error_id {
        b = b.field("error_id", json!(eid));
    }
    if let StepOutcome::Failed(msg) = &record.outcome {
        b = b.field("error", json!(msg));
    }
    if record.outcome.is_failure() {
        b.emit_failure();
    } else {
        b.emit_success();
    }
}

fn elapsed_ms(t0: Instant) -> u64 {
    u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX)
}
