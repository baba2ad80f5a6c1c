//! Exclusive lock on a data directory for the watch daemon

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "daemon.lock";

/// Held for the lifetime of a running daemon
pub struct DaemonLock {
    path: PathBuf,
    // The flock lives as long as this handle
    file: File,
}

/// Who holds the lock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockHolder {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

impl DaemonLock {
    /// Acquire the lock for `data_dir`
    ///
    /// Fails if another process holds the flock. The kernel drops a dead
    /// process's flock, so a leftover lock file that can be locked is simply
    /// taken over and rewritten.
    pub fn acquire(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let lock_path = data_dir.join(LOCK_FILE);

        // A releasing daemon unlinks the file; retry if we locked an unlinked inode
        for _ in 0..3 {
            let mut file = open_lock_file(&lock_path)?;

            if !try_flock_exclusive(&file)? {
                match read_holder(&mut file) {
                    Ok(holder) => anyhow::bail!(
                        "Daemon already running (pid {}, started {})",
                        holder.pid,
                        holder.started_at.format("%Y-%m-%d %H:%M:%S UTC")
                    ),
                    Err(_) => anyhow::bail!("Daemon already running (starting up)"),
                }
            }

            if !is_same_file(&file, &lock_path) {
                continue;
            }

            if let Ok(holder) = read_holder(&mut file) {
                tracing::warn!(pid = holder.pid, path = %lock_path.display(), "Taking over stale daemon lock");
            }
            write_holder(&mut file)?;

            return Ok(Self {
                path: lock_path,
                file,
            });
        }

        anyhow::bail!("Daemon lock at {} keeps changing", lock_path.display())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock and remove the lock file
    pub fn release(mut self) -> Result<()> {
        self.remove_if_ours().context("Failed to remove lock file")
    }

    /// Unlink the lock file unless it was replaced by another daemon's
    fn remove_if_ours(&mut self) -> std::io::Result<()> {
        if !is_same_file(&self.file, &self.path) {
            return Ok(());
        }
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

impl Drop for DaemonLock {
    fn drop(&mut self) {
        let _ = self.remove_if_ours();
    }
}

/// Process holding the daemon lock for `data_dir`, if any
pub fn current_holder(data_dir: &Path) -> Result<Option<LockHolder>> {
    let lock_path = data_dir.join(LOCK_FILE);
    if !lock_path.exists() {
        return Ok(None);
    }

    let mut file = match OpenOptions::new().read(true).write(true).open(&lock_path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).context("Failed to open lock file"),
    };

    // If we can take the lock nobody holds it; closing the file releases it again
    if try_flock_exclusive(&file)? {
        return Ok(None);
    }

    match read_holder(&mut file) {
        Ok(holder) if is_process_alive(holder.pid) => Ok(Some(holder)),
        _ => Ok(None),
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("Failed to open lock file {}", path.display()))
}

fn write_holder(file: &mut File) -> Result<()> {
    let holder = LockHolder {
        pid: std::process::id(),
        started_at: Utc::now(),
    };
    let serialized = serde_json::to_string(&holder).context("Failed to serialize lock content")?;

    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(serialized.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn read_holder(file: &mut File) -> Result<LockHolder> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    serde_json::from_str(&contents).context("Failed to parse lock content")
}

/// Non-blocking exclusive flock
#[cfg(unix)]
fn try_flock_exclusive(file: &File) -> Result<bool> {
    use nix::fcntl::{flock, FlockArg};
    use std::os::unix::io::AsRawFd;

    match flock(file.as_raw_fd(), FlockArg::LockExclusiveNonblock) {
        Ok(()) => Ok(true),
        Err(nix::errno::Errno::EWOULDBLOCK) => Ok(false),
        Err(e) => Err(e).context("flock failed"),
    }
}

#[cfg(not(unix))]
fn try_flock_exclusive(_file: &File) -> Result<bool> {
    Ok(true)
}

/// Whether `path` still names the inode behind `file`
#[cfg(unix)]
fn is_same_file(file: &File, path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (file.metadata(), std::fs::metadata(path)) {
        (Ok(held), Ok(named)) => held.dev() == named.dev() && held.ino() == named.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(_file: &File, path: &Path) -> bool {
    path.exists()
}

#[cfg(unix)]
fn is_process_alive(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Null signal: existence check only
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(nix::errno::Errno::ESRCH) => false,
        Err(_) => true,
    }
}

#[cfg(not(unix))]
fn is_process_alive(_pid: u32) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lock_is_exclusive() {
        let temp_dir = TempDir::new().unwrap();

        let first = DaemonLock::acquire(temp_dir.path()).unwrap();
        // flock is per open file description, so a second open in this process conflicts
        assert!(DaemonLock::acquire(temp_dir.path()).is_err());

        drop(first);
        assert!(DaemonLock::acquire(temp_dir.path()).is_ok());
    }

    #[test]
    fn test_holder_reported_while_held() {
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(current_holder(temp_dir.path()).unwrap(), None);

        let lock = DaemonLock::acquire(temp_dir.path()).unwrap();
        let holder = current_holder(temp_dir.path()).unwrap().unwrap();
        assert_eq!(holder.pid, std::process::id());

        let path = lock.path().to_path_buf();
        lock.release().unwrap();
        assert!(!path.exists());
        assert_eq!(current_holder(temp_dir.path()).unwrap(), None);
    }

    #[test]
    fn test_leftover_lock_file_is_not_held() {
        let temp_dir = TempDir::new().unwrap();
        let stale = LockHolder {
            pid: 999_999,
            started_at: Utc::now(),
        };
        std::fs::write(
            temp_dir.path().join(LOCK_FILE),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();

        assert_eq!(current_holder(temp_dir.path()).unwrap(), None);
        let lock = DaemonLock::acquire(temp_dir.path()).unwrap();
        assert_eq!(current_holder(temp_dir.path()).unwrap().unwrap().pid, std::process::id());
        drop(lock);
    }

    #[test]
    fn test_held_lock_without_holder_record_is_not_taken() {
        let temp_dir = TempDir::new().unwrap();
        let lock_path = temp_dir.path().join(LOCK_FILE);

        // Another daemon between flock and writing its record
        let held = open_lock_file(&lock_path).unwrap();
        assert!(try_flock_exclusive(&held).unwrap());

        let err = DaemonLock::acquire(temp_dir.path()).err().unwrap();
        assert!(err.to_string().contains("already running"));
        assert!(lock_path.exists());

        drop(held);
        assert!(DaemonLock::acquire(temp_dir.path()).is_ok());
    }

    #[test]
    fn test_replaced_lock_file_is_left_alone() {
        let temp_dir = TempDir::new().unwrap();
        let lock = DaemonLock::acquire(temp_dir.path()).unwrap();
        let path = lock.path().to_path_buf();

        std::fs::remove_file(&path).unwrap();
        std::fs::write(&path, b"other").unwrap();

        lock.release().unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"other");
    }

    #[test]
    fn test_process_alive() {
        assert!(is_process_alive(std::process::id()));
        assert!(!is_process_alive(999_999));
    }
}
