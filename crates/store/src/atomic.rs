//! Crash-safe file replacement

use folio_core::{Error, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Replace `target` with `data` atomically
///
/// Writes to a temp file in `tmp_dir`, fsyncs it, renames it over `target`,
/// then fsyncs the parent directory. `tmp_dir` must be on the same
/// filesystem as `target`. Readers see either the old or the new contents.
pub fn atomic_write(tmp_dir: &Path, target: &Path, data: &[u8]) -> Result<()> {
    fs::create_dir_all(tmp_dir).map_err(|e| Error::io(tmp_dir, e))?;
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;

    let tmp_path = unique_tmp_path(tmp_dir);
    let result = write_and_sync(&tmp_path, data).and_then(|()| {
        fs::rename(&tmp_path, target).map_err(|e| Error::io(target, e))
    });
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
        return result;
    }

    sync_dir(parent)
}

fn unique_tmp_path(tmp_dir: &Path) -> PathBuf {
    let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    tmp_dir.join(format!("{}-{}.tmp", std::process::id(), seq))
}

fn write_and_sync(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| Error::io(path, e))?;
    file.write_all(data).map_err(|e| Error::io(path, e))?;
    file.sync_all().map_err(|e| Error::io(path, e))
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| Error::io(dir, e))
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
