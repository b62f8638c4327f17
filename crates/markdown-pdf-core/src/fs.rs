//! Filesystem helpers shared by the pipeline and the renderer.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, TempPath};

const STAGING_PREFIX: &str = ".markdown-pdf";

/// Directory that will hold `path`; `.` for bare file names.
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Create the directory that will hold `path`.
pub fn ensure_parent(path: &Path) -> io::Result<()> {
    fs::create_dir_all(parent_dir(path))
}

/// Reserve an empty staging file in `dir`. The file is removed when the
/// returned handle drops unless it is persisted first.
pub fn staging_path(dir: &Path, suffix: &str) -> io::Result<TempPath> {
    Ok(Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(suffix)
        .tempfile_in(dir)?
        .into_temp_path())
}

/// Atomically write `contents` to `path` via a sibling temporary file and a
/// rename, so readers never observe partial content.
pub fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let parent = parent_dir(path);
    fs::create_dir_all(&parent)?;

    let mut tmp = Builder::new().prefix(STAGING_PREFIX).tempfile_in(&parent)?;
    tmp.as_file_mut().write_all(contents.as_bytes())?;
    tmp.as_file_mut().sync_all()?;

    tmp.persist(path).map(|_| ()).map_err(|err| err.error)
}
