//! Atomic config-file rendering: stage in the target directory, fsync,
//! rename over the final name, fsync the parent. Staging next to the
//! target keeps the rename on one filesystem.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt as _;
use std::path::Path;

use crate::constants::TMP_SUFFIX;

pub fn write_file_atomic(path: &Path, contents: &[u8], mode: Option<u32>) -> io::Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    let fname = path
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let tmp = parent.join(format!(".{fname}{TMP_SUFFIX}"));

    let mut f = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp)?;
    f.write_all(contents)?;
    if let Some(mode) = mode {
        fs::set_permissions(&tmp, fs::Permissions::from_mode(mode))?;
    }
    f.sync_all()?;
    drop(f);

    fs::rename(&tmp, path)?;
    fsync_parent_dir(path);
    Ok(())
}

/// Best-effort parent directory sync after a rename.
pub(crate) fn fsync_parent_dir(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(d) = File::open(parent) {
            let _ = d.sync_all();
        }
    }
}
