//! Retention pruning for the backup root. Snapshots are never deleted
//! implicitly; this is the one explicit deletion path.

use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

#[derive(Debug, Clone, Copy, Default)]
pub struct PruneResult {
    pub pruned_count: usize,
    pub retained_count: usize,
}

/// Delete whole run directories beyond the retention limits.
///
/// Run directory names are timestamp-shaped, so lexicographic order is
/// chronological; `count_limit` keeps the newest N runs, `age_limit`
/// drops runs whose directory mtime is older than the window.
pub fn prune_runs(
    root: &Path,
    count_limit: Option<usize>,
    age_limit: Option<Duration>,
) -> io::Result<PruneResult> {
    let mut runs: Vec<PathBuf> = Vec::new();
    let rd = match std::fs::read_dir(root) {
        Ok(rd) => rd,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PruneResult::default()),
        Err(e) => return Err(e),
    };
    for entry in rd {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            runs.push(entry.path());
        }
    }
    runs.sort();

    let mut doomed: Vec<PathBuf> = Vec::new();
    if let Some(limit) = count_limit {
        if runs.len() > limit {
            let cut = runs.len() - limit;
            doomed.extend_from_slice(&runs[..cut]);
            runs.drain(..cut);
        }
    }
    if let Some(age) = age_limit {
        let now = SystemTime::now();
        runs.retain(|dir| {
            let old = std::fs::metadata(dir)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|mtime| now.duration_since(mtime).ok())
                .map(|elapsed| elapsed > age)
                .unwrap_or(false);
            if old {
                doomed.push(dir.clone());
            }
            !old
        });
    }

    for dir in &doomed {
        std::fs::remove_dir_all(dir)?;
    }
    Ok(PruneResult {
        pruned_count: doomed.len(),
        retained_count: runs.len(),
    })
}
