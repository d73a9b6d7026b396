use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const LOCK_FILE: &str = "lock";
const RETRY_INTERVAL: Duration = Duration::from_millis(25);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Advisory lock serializing vault mutations.
///
/// Every mutating command takes this before touching documents or the
/// cache, so a watch process and a one-shot command cannot interleave
/// writes. The holder's pid sits in the lock file for diagnostics; the
/// flock itself is the source of truth.
pub struct VaultLock {
    file: File,
    path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("could not open lock file {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not lock {path}: held by {holder}")]
    Busy { path: PathBuf, holder: String },
}

impl VaultLock {
    /// Take the vault lock, retrying until `timeout` elapses. The error
    /// names the holding process when one can be read back.
    pub fn acquire(sidecar: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = sidecar.join(LOCK_FILE);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|source| LockError::Open {
                path: path.clone(),
                source,
            })?;

        let deadline = Instant::now() + timeout;
        while !flock_nonblocking(&file) {
            if Instant::now() >= deadline {
                let holder = read_holder(&mut file);
                return Err(LockError::Busy { path, holder });
            }
            std::thread::sleep(RETRY_INTERVAL);
        }

        let mut lock = VaultLock { file, path };
        lock.write_holder();
        Ok(lock)
    }

    pub fn acquire_default(sidecar: &Path) -> Result<Self, LockError> {
        Self::acquire(sidecar, DEFAULT_TIMEOUT)
    }

    fn write_holder(&mut self) {
        // Best effort only
        let _ = self.file.set_len(0);
        let _ = self.file.seek(SeekFrom::Start(0));
        let _ = write!(self.file, "{}", std::process::id());
        let _ = self.file.flush();
    }
}

impl Drop for VaultLock {
    fn drop(&mut self) {
        // flock releases with the descriptor; the file is disposable
        let _ = fs::remove_file(&self.path);
    }
}

fn read_holder(file: &mut File) -> String {
    let mut pid = String::new();
    let _ = file.seek(SeekFrom::Start(0));
    let _ = file.read_to_string(&mut pid);
    let pid = pid.trim();
    if pid.is_empty() {
        "another tasklens process".to_string()
    } else {
        format!("pid {pid}")
    }
}

/// Non-blocking exclusive flock; true when the lock was taken.
#[cfg(unix)]
pub(crate) fn flock_nonblocking(file: &File) -> bool {
    use std::os::unix::io::AsRawFd;
    unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) == 0 }
}

#[cfg(not(unix))]
pub(crate) fn flock_nonblocking(_file: &File) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sidecar(tmp: &TempDir) -> PathBuf {
        let dir = tmp.path().join(".tasklens");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_lock_releases_on_drop() {
        let tmp = TempDir::new().unwrap();
        let dir = sidecar(&tmp);

        let held = VaultLock::acquire_default(&dir).unwrap();
        assert!(dir.join(LOCK_FILE).exists());
        drop(held);

        VaultLock::acquire_default(&dir).unwrap();
    }

    #[test]
    fn test_contention_names_the_holder() {
        let tmp = TempDir::new().unwrap();
        let dir = sidecar(&tmp);

        let _held = VaultLock::acquire_default(&dir).unwrap();

        match VaultLock::acquire(&dir, Duration::from_millis(50)) {
            Err(LockError::Busy { holder, .. }) => {
                assert_eq!(holder, format!("pid {}", std::process::id()));
            }
            Err(other) => panic!("expected Busy, got {other}"),
            Ok(_) => panic!("lock should be held"),
        }
    }
}
