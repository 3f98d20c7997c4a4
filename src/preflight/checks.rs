//! Low-level preflight helper checks.

use std::env;
use std::io;
use std::os::unix::fs::PermissionsExt as _;
use std::path::Path;

/// Effective-uid probe; package managers and sysctl writes need root.
#[must_use]
pub fn running_as_root() -> bool {
    rustix::process::geteuid().is_root()
}

/// Create the directory if needed and prove it accepts writes by
/// round-tripping a probe file.
pub fn ensure_dir_writable(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let probe = dir.join(".write-probe");
    std::fs::write(&probe, b"probe")?;
    std::fs::remove_file(&probe)
}

/// Whether an executable with this name is reachable via PATH.
/// Absolute or relative program paths are checked directly.
#[must_use]
pub fn tool_on_path(program: &str) -> bool {
    if program.contains('/') {
        return is_executable(Path::new(program));
    }
    let Some(path) = env::var_os("PATH") else {
        return false;
    };
    env::split_paths(&path).any(|dir| is_executable(&dir.join(program)))
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
