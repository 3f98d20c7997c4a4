//! Snapshot creation: copy the prior content/state of each path a step
//! may alter into the run's backup area, then journal the step.

use std::fs;
use std::io;
use std::os::unix;
use std::os::unix::fs::PermissionsExt as _;
use std::path::Path;

use crate::exec::write_file_atomic;
use crate::types::record::SnapshotRef;
use crate::types::step::Step;

use super::index::{append_entry, JournalEntry};
use super::sidecar::{sha256_hex_of, write_sidecar, Sidecar};
use super::{payload_rel, rel_of};

/// Snapshot every path a step declares, then append the journal entry.
///
/// `seq` is the run-global snapshot counter; it advances once per path so
/// rollback can replay strictly in reverse. Steps that mutate no paths
/// (e.g. package installs) still get a journal entry so rollback sees
/// them, in particular irreversible ones, where it must stop.
///
/// # Errors
///
/// Any IO failure here is a `BackupIOError` to the caller: the step must
/// not run, since rollback would then be impossible.
pub fn snapshot_step(
    run_dir: &Path,
    host_root: &Path,
    step: &Step,
    seq: &mut u64,
) -> io::Result<Vec<SnapshotRef>> {
    let mut refs = Vec::with_capacity(step.mutates_paths.len());
    for path in &step.mutates_paths {
        let r = create_snapshot(run_dir, host_root, step, *seq, path)?;
        *seq += 1;
        refs.push(r);
    }
    append_entry(
        run_dir,
        &JournalEntry {
            step_id: step.id.clone(),
            reversible: step.reversible,
            snapshots: refs.clone(),
            ts: crate::logging::redact::now_iso(),
        },
    )?;
    Ok(refs)
}

/// Copy one path's current content/existence state into the run area.
/// - regular file: copy bytes, record mode and payload hash
/// - symlink: record the destination
/// - directory: record existence
/// - absent: tombstone sidecar, restore deletes whatever appeared
fn create_snapshot(
    run_dir: &Path,
    host_root: &Path,
    step: &Step,
    seq: u64,
    path: &Path,
) -> io::Result<SnapshotRef> {
    let rel = rel_of(host_root, path);
    let payload = payload_rel(host_root, path, seq);
    let payload_abs = run_dir.join(&payload);
    if let Some(parent) = payload_abs.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut sc = Sidecar::new(
        &step.id,
        seq,
        rel.to_string_lossy().into_owned(),
        step.reversible,
    );

    match fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let dest = fs::read_link(path)?;
            let _ = fs::remove_file(&payload_abs);
            unix::fs::symlink(&dest, &payload_abs)?;
            sc.prior_kind = "symlink".to_string();
            sc.prior_dest = Some(dest.to_string_lossy().into_owned());
        }
        Ok(meta) if meta.is_dir() => {
            sc.prior_kind = "dir".to_string();
            sc.mode = Some(format!("{:o}", meta.permissions().mode() & 0o7777));
        }
        Ok(meta) => {
            let bytes = fs::read(path)?;
            write_file_atomic(&payload_abs, &bytes, None)?;
            sc.prior_kind = "file".to_string();
            sc.mode = Some(format!("{:o}", meta.permissions().mode() & 0o7777));
            sc.payload_hash = sha256_hex_of(&payload_abs);
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            // prior_kind stays "none": the tombstone case.
        }
        Err(e) => return Err(e),
    }

    write_sidecar(&payload_abs, &sc)?;
    Ok(SnapshotRef {
        seq,
        rel: sc.rel.clone(),
        payload: payload.to_string_lossy().into_owned(),
    })
}
