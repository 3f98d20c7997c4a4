//! Rollback stage: replay a recorded run's snapshots in reverse
//! chronological order, stopping at the first irreversible step.
//!
//! Manually triggered only: automatic rollback of partially-applied
//! system state (a package already half configured) can itself be
//! destructive.

use log::Level;
use serde_json::json;
use uuid::Uuid;

use crate::backup::{read_journal, restore_snapshot, RestoreError};
use crate::logging::audit::{AuditCtx, AuditMode};
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::report::RollbackReport;
use crate::types::RunId;

use super::errors::{id_str, ApiError, ErrorId};
use super::Provisioner;

pub(crate) fn run<E: FactsEmitter, A: AuditSink>(
    api: &Provisioner<E, A>,
    run_id: &RunId,
) -> Result<RollbackReport, ApiError> {
    let run_dir = crate::backup::run_dir(api.backup_root(), run_id);
    if !run_dir.is_dir() {
        return Err(ApiError::UnknownRun(run_id.to_string()));
    }
    let journal = read_journal(&run_dir).map_err(|e| ApiError::Backup(e.to_string()))?;

    // No plan exists at rollback time; derive a stable id from the run.
    let pid = Uuid::new_v5(&Uuid::NAMESPACE_URL, format!("rollback:{run_id}").as_bytes());
    let tctx = AuditCtx::new(
        api.facts(),
        pid.to_string(),
        run_id.to_string(),
        crate::logging::redact::now_iso(),
        AuditMode { dry_run: false, redact: false },
    );
    let slog = StageLogger::new(&tctx);
    api.audit().log(Level::Info, &format!("rollback: starting for run {run_id}"));

    let mut report = RollbackReport {
        run_id: run_id.to_string(),
        ..RollbackReport::default()
    };

    'entries: for entry in journal.iter().rev() {
        if !entry.reversible {
            report.halted_at = Some(entry.step_id.clone());
            slog.rollback()
                .step(entry.step_id.clone())
                .field("error_id", json!(id_str(ErrorId::E_IRREVERSIBLE)))
                .emit_warn();
            break;
        }
        for snap in entry.snapshots.iter().rev() {
            match restore_snapshot(&run_dir, api.host_root(), snap) {
                Ok(()) => {
                    report.restored.push(snap.rel.clone());
                    slog.rollback()
                        .step(entry.step_id.clone())
                        .path(snap.rel.clone())
                        .emit_success();
                }
                Err(e) => {
                    let eid = match e {
                        RestoreError::Conflict(_) => ErrorId::E_RESTORE_CONFLICT,
                        _ => ErrorId::E_RESTORE_FAILED,
                    };
                    report
                        .errors
                        .push(format!("restore {} failed: {e}", snap.rel));
                    slog.rollback()
                        .step(entry.step_id.clone())
                        .path(snap.rel.clone())
                        .field("error_id", json!(id_str(eid)))
                        .field("error", json!(e.to_string()))
                        .emit_failure();
                    break 'entries;
                }
            }
        }
    }

    let b = slog
        .rollback_summary()
        .field("restored", json!(report.restored.len()))
        .field("halted_at", json!(report.halted_at))
        .field("errors", json!(report.errors.len()));
    if report.ok() {
        b.emit_success();
    } else {
        b.emit_failure();
    }
    api.audit().log(Level::Info, "rollback: finished");

    Ok(report)
}
