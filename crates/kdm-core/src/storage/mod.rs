//! Disk-side file lifecycle: temp naming, finalize rename, bucket links.
//!
//! A transfer writes `<name>.<suffix>` next to its destination and renames it
//! into place once verified. In bucket mode every finished file is also stored
//! once under the bucket directory, keyed by its server path, and later jobs
//! for the same path hard-link from there instead of downloading.

mod writer;

pub use writer::{ChunkWriter, OpenMode};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Temp file path: appends `.<suffix>` to the final path (e.g. `a.png` → `a.png.tmp`).
pub fn temp_path(final_path: &Path, suffix: &str) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(".");
    o.push(suffix);
    PathBuf::from(o)
}

/// Bucket location for a server path: `<bucket>/<server path without leading slash>`.
pub fn bucket_file_path(bucket: &Path, server_path: &str) -> PathBuf {
    bucket.join(server_path.trim_start_matches('/'))
}

/// Size of a regular file at `path`, or `None` if absent.
pub fn existing_len(path: &Path) -> io::Result<Option<u64>> {
    match fs::metadata(path) {
        Ok(m) if m.is_file() => Ok(Some(m.len())),
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Hard-link `src` to `dst`, creating parent directories. A `dst` that already
/// exists counts as success, so concurrent jobs may race on the same link.
/// Returns whether this call created the link.
pub fn link_if_absent(src: &Path, dst: &Path) -> io::Result<bool> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    match fs::hard_link(src, dst) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e),
    }
}

/// Rename the finished temp file to its final name.
pub fn finalize(temp: &Path, final_path: &Path) -> io::Result<()> {
    fs::rename(temp, final_path)
}

/// Remove a temp file, ignoring "not found".
pub fn discard(temp: &Path) -> io::Result<()> {
    match fs::remove_file(temp) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
