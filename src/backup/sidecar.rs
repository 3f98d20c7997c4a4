use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::constants::SIDECAR_SCHEMA;
use crate::exec::write_file_atomic;

/// Snapshot metadata written alongside every payload. The sidecar is
/// authoritative for what existed before the step ran; the payload file
/// is absent when `prior_kind` is `none` or `dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sidecar {
    pub schema: String,
    pub step_id: String,
    pub seq: u64,
    /// Relative form of the snapshotted path.
    pub rel: String,
    /// "file" | "symlink" | "dir" | "none"
    pub prior_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Symlink destination when `prior_kind` is "symlink".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_dest: Option<String>,
    /// SHA-256 of the payload when `prior_kind` is "file".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_hash: Option<String>,
    /// Whether the owning step can be undone; rollback halts at the
    /// first snapshot where this is false.
    pub reversible: bool,
    pub ts: String,
}

impl Sidecar {
    pub(crate) fn new(step_id: &str, seq: u64, rel: String, reversible: bool) -> Self {
        Self {
            schema: SIDECAR_SCHEMA.to_string(),
            step_id: step_id.to_string(),
            seq,
            rel,
            prior_kind: "none".to_string(),
            mode: None,
            prior_dest: None,
            payload_hash: None,
            reversible,
            ts: crate::logging::redact::now_iso(),
        }
    }
}

pub(crate) fn sidecar_path_for(payload: &Path) -> PathBuf {
    let mut s = payload.as_os_str().to_owned();
    s.push(".meta.json");
    PathBuf::from(s)
}

pub(crate) fn write_sidecar(payload: &Path, sc: &Sidecar) -> std::io::Result<()> {
    let body = serde_json::to_vec_pretty(sc)
        .map_err(|e| std::io::Error::other(format!("sidecar encode failed: {e}")))?;
    write_file_atomic(&sidecar_path_for(payload), &body, None)
}

pub(crate) fn read_sidecar(sc_path: &Path) -> std::io::Result<Sidecar> {
    let f = std::fs::File::open(sc_path)?;
    serde_json::from_reader(f)
        .map_err(|e| std::io::Error::other(format!("sidecar decode failed: {e}")))
}

/// Hex SHA-256 of a file's contents; `None` when unreadable.
#[must_use]
pub fn sha256_hex_of(path: &Path) -> Option<String> {
    let mut f = std::fs::File::open(path).ok()?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = f.read(&mut buf).ok()?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Some(format!("{:x}", hasher.finalize()))
}
