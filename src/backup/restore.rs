//! Snapshot restore: reverse exactly one snapshot, refusing when a
//! later still-applied snapshot in the same run owns the path.

use std::fs;
use std::io;
use std::os::unix;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::exec::write_file_atomic;
use crate::types::record::SnapshotRef;

use super::index::read_journal;
use super::sidecar::{read_sidecar, sha256_hex_of, sidecar_path_for};

#[derive(Debug, Error)]
pub enum RestoreError {
    #[error("restore conflict: {0}")]
    Conflict(String),
    #[error("snapshot integrity: {0}")]
    Integrity(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Restore one snapshot against the live filesystem rooted at `host_root`
/// (`/` in production, a temp root in tests).
///
/// A `.restored` marker is left next to the payload so out-of-order
/// restore attempts can be detected as conflicts.
pub fn restore_snapshot(
    run_dir: &Path,
    host_root: &Path,
    snap: &SnapshotRef,
) -> Result<(), RestoreError> {
    let payload_abs = run_dir.join(&snap.payload);
    let sc = read_sidecar(&sidecar_path_for(&payload_abs))?;

    // A later snapshot of the same path that has not itself been
    // restored means a still-applied step owns the live content.
    for entry in read_journal(run_dir)? {
        for other in &entry.snapshots {
            if other.rel == snap.rel
                && other.seq > snap.seq
                && !marker_path(&run_dir.join(&other.payload)).exists()
            {
                return Err(RestoreError::Conflict(format!(
                    "{} is owned by later step {} (snapshot #{})",
                    snap.rel, entry.step_id, other.seq
                )));
            }
        }
    }

    let live = host_root.join(PathBuf::from(&snap.rel));
    match sc.prior_kind.as_str() {
        "file" => {
            let expected = sc.payload_hash.as_deref();
            if let Some(expected) = expected {
                let actual = sha256_hex_of(&payload_abs);
                if actual.as_deref() != Some(expected) {
                    return Err(RestoreError::Integrity(format!(
                        "payload hash mismatch for {}",
                        snap.rel
                    )));
                }
            }
            let bytes = fs::read(&payload_abs)?;
            let mode = sc
                .mode
                .as_deref()
                .and_then(|m| u32::from_str_radix(m, 8).ok());
            remove_live(&live)?;
            write_file_atomic(&live, &bytes, mode)?;
        }
        "symlink" => {
            let dest = sc.prior_dest.clone().ok_or_else(|| {
                RestoreError::Integrity(format!("symlink snapshot for {} lacks dest", snap.rel))
            })?;
            remove_live(&live)?;
            if let Some(parent) = live.parent() {
                fs::create_dir_all(parent)?;
            }
            unix::fs::symlink(dest, &live)?;
        }
        "dir" => {
            fs::create_dir_all(&live)?;
        }
        "none" => {
            // The path did not exist before the step; undo whatever
            // appeared.
            remove_live(&live)?;
        }
        other => {
            return Err(RestoreError::Integrity(format!(
                "unknown prior_kind {other:?} for {}",
                snap.rel
            )));
        }
    }

    fs::File::create(marker_path(&payload_abs))?;
    Ok(())
}

fn marker_path(payload_abs: &Path) -> PathBuf {
    let mut s = payload_abs.as_os_str().to_owned();
    s.push(".restored");
    PathBuf::from(s)
}

fn remove_live(live: &Path) -> io::Result<()> {
    match fs::symlink_metadata(live) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(live),
        Ok(_) => fs::remove_file(live),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
