//! Durable JSONL reporter: the append-only record every run leaves behind.
//!
//! One JSON line per fact, flushed before `emit` returns so a crash
//! mid-plan leaves a truthful partial log usable for `--resume-from`.
//! Free-form audit lines are written with a `#` prefix so log parsers can
//! skip them.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::Level;
use serde_json::Value;

use super::facts::{AuditSink, FactsEmitter};
use crate::types::report::RunSummary;

#[derive(Clone)]
pub struct JsonlReporter {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl JsonlReporter {
    /// Open (or create) the log file in append mode.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file: Arc::new(Mutex::new(file)) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_line(&self, line: &str) -> io::Result<()> {
        // A poisoned lock only means another writer panicked mid-line;
        // keep appending rather than losing the record.
        let mut f = match self.file.lock() {
            Ok(f) => f,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(f, "{line}")?;
        // Durability over throughput: a partial log must be truthful.
        f.sync_data()
    }

    /// Read back every structured fact for a run. Non-JSON (free-form)
    /// lines and facts for other runs are skipped.
    pub fn read_run<P: AsRef<Path>>(path: P, run_id: &str) -> io::Result<Vec<Value>> {
        let f = File::open(path)?;
        let mut out = Vec::new();
        for line in BufReader::new(f).lines() {
            let line = line?;
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Ok(v) = serde_json::from_str::<Value>(&line) else {
                continue;
            };
            if v.get("run_id").and_then(|r| r.as_str()) == Some(run_id) {
                out.push(v);
            }
        }
        Ok(out)
    }

    /// Produce outcome counts and the irreversible steps touched for a
    /// recorded run, from the log alone.
    pub fn summarize<P: AsRef<Path>>(path: P, run_id: &str) -> io::Result<RunSummary> {
        let mut s = RunSummary::default();
        for v in Self::read_run(path, run_id)? {
            if v.get("stage").and_then(|x| x.as_str()) != Some("apply.result") {
                continue;
            }
            let Some(outcome) = v.get("outcome").and_then(|x| x.as_str()) else {
                continue;
            };
            match outcome {
                "succeeded" => s.succeeded += 1,
                "skipped" => s.skipped += 1,
                "would_run" => s.would_run += 1,
                "failed" => s.failed += 1,
                _ => {}
            }
            if outcome == "succeeded"
                && v.get("reversible").and_then(|x| x.as_bool()) == Some(false)
            {
                if let Some(id) = v.get("step_id").and_then(|x| x.as_str()) {
                    s.irreversible.push(id.to_string());
                }
            }
        }
        Ok(s)
    }
}

impl FactsEmitter for JsonlReporter {
    fn emit(&self, _subsystem: &str, _event: &str, _decision: &str, fields: Value) {
        let line = fields.to_string();
        if let Err(e) = self.append_line(&line) {
            log::error!("facts log write failed: {e}");
        }
    }
}

impl AuditSink for JsonlReporter {
    fn log(&self, level: Level, msg: &str) {
        // Free-form line; one `#` per line keeps multi-line tool output
        // parseable.
        for part in msg.lines() {
            if let Err(e) = self.append_line(&format!("# [{level}] {part}")) {
                log::error!("facts log write failed: {e}");
            }
        }
    }
}
