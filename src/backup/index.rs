//! Per-run journal: one JSON line per applied step, appended before the
//! apply runs. Rollback replays it in reverse; the ordering here is the
//! chronological record of what touched the host.

use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::RUN_JOURNAL_NAME;
use crate::types::record::SnapshotRef;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub step_id: String,
    pub reversible: bool,
    pub snapshots: Vec<SnapshotRef>,
    pub ts: String,
}

pub(crate) fn append_entry(run_dir: &Path, entry: &JournalEntry) -> io::Result<()> {
    std::fs::create_dir_all(run_dir)?;
    let path = run_dir.join(RUN_JOURNAL_NAME);
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;
    let line = serde_json::to_string(entry)
        .map_err(|e| io::Error::other(format!("journal encode failed: {e}")))?;
    writeln!(f, "{line}")?;
    f.sync_data()
}

/// Applied steps in apply order. A missing journal means nothing was
/// applied in that run.
pub fn read_journal(run_dir: &Path) -> io::Result<Vec<JournalEntry>> {
    let path = run_dir.join(RUN_JOURNAL_NAME);
    let f = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut out = Vec::new();
    for line in BufReader::new(f).lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let entry: JournalEntry = serde_json::from_str(&line)
            .map_err(|e| io::Error::other(format!("journal decode failed: {e}")))?;
        out.push(entry);
    }
    Ok(out)
}
