//! Run-scoped backup area.
//!
//! Layout under the backup root:
//!
//! ```text
//! <root>/<run-id>/journal.jsonl            applied steps, in order
//! <root>/<run-id>/<rel-parent>/.<name>.<seq>.bak            payload
//! <root>/<run-id>/<rel-parent>/.<name>.<seq>.bak.meta.json  sidecar
//! ```
//!
//! Snapshots are taken immediately before a step's apply; a step whose
//! state cannot be backed up must not run, since rollback would then be
//! impossible. Snapshots are deleted only by explicit prune.

mod index;
mod prune;
mod restore;
mod sidecar;
mod snapshot;

pub use index::{read_journal, JournalEntry};
pub use prune::{prune_runs, PruneResult};
pub use restore::{restore_snapshot, RestoreError};
pub use sidecar::{sha256_hex_of, Sidecar};
pub use snapshot::snapshot_step;

use std::path::{Component, Path, PathBuf};

use crate::constants::SNAPSHOT_SUFFIX;
use crate::types::ids::RunId;

/// Directory holding one run's snapshots and journal.
pub fn run_dir(root: &Path, run_id: &RunId) -> PathBuf {
    root.join(run_id.as_str())
}

/// Relative form of a mutated path: expressed against the host root
/// (`/` in production) so the backup area mirrors the host's structure
/// and restore can reconstruct the live path under any root.
pub(crate) fn rel_of(host_root: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix(host_root) {
        Ok(p) => p.to_path_buf(),
        Err(_) => path
            .components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .collect(),
    }
}

/// Payload location for snapshot `seq` of `path`, relative to the run
/// directory.
pub(crate) fn payload_rel(host_root: &Path, path: &Path, seq: u64) -> PathBuf {
    let rel = rel_of(host_root, path);
    let name = rel
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("snapshot")
        .to_string();
    let parent = rel.parent().map(Path::to_path_buf).unwrap_or_default();
    parent.join(format!(".{name}.{seq}{SNAPSHOT_SUFFIX}"))
}
