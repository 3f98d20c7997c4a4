//! Shared crate-wide constants for groundwork.
//!
//! Centralizes magic values and default labels used across modules.
//! Adjusting these here will propagate through the crate.

/// Default backup area root used by the CLI unless `--backup-dir` is given.
/// Each run creates one timestamped directory underneath it.
pub const DEFAULT_BACKUP_ROOT: &str = "/var/backups/groundwork";

/// Default append-only facts log used by the CLI unless `--log-path` is given.
pub const DEFAULT_LOG_PATH: &str = "/var/log/groundwork.jsonl";

/// Name of the advisory lock file created inside the backup root.
/// Two engine instances must never interleave package-manager invocations.
pub const LOCK_FILE_NAME: &str = ".groundwork.lock";

/// Poll interval in milliseconds for the file-backed lock manager
/// (see `adapters/lock_file.rs`).
pub const LOCK_POLL_MS: u64 = 25;

/// Default lock timeout used by `Provisioner::new()` unless overridden by
/// `with_lock_timeout_ms()`.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Poll interval in milliseconds while waiting on a child process when a
/// per-step timeout is configured (see `exec/mod.rs`).
pub const EXEC_POLL_MS: u64 = 25;

/// Maximum number of bytes of captured stdout/stderr carried into a fact.
/// Full output still reaches the audit sink as free-form lines.
pub const OUTPUT_TAIL_MAX: usize = 4096;

/// Temporary filename suffix used for atomic config-file staging within a
/// directory. The temporary name is constructed as `.{fname}{TMP_SUFFIX}`.
pub const TMP_SUFFIX: &str = ".groundwork.tmp";

/// Snapshot payload suffix inside a run's backup directory:
/// `.<name>.<seq>.bak`, with a `.meta.json` sidecar alongside.
pub const SNAPSHOT_SUFFIX: &str = ".bak";

/// Per-run journal of applied steps, appended before each apply.
/// Rollback replays it in reverse.
pub const RUN_JOURNAL_NAME: &str = "journal.jsonl";

/// Sidecar schema identifier written with every snapshot.
pub const SIDECAR_SCHEMA: &str = "snapshot_meta.v1";

/// UUIDv5 namespace tag for deterministic plan/action IDs.
pub const NS_TAG: &str = "https://groundwork-dev/groundwork";
