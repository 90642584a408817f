//! Advisory, reentrant file locking via a sibling `.lock` file.
//!
//! Mirrors the source's `Lock` class: a lock is a tiny file next to the one
//! being guarded, holding an owner id and a timestamp. Acquisition is a
//! poll loop with a fixed delay; release removes the file if (and only if)
//! we still own it. Locking a stream that isn't backed by a real file is a
//! no-op, per the spec.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How `FileLock::acquire` should behave when the lock is already held.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WaitPolicy {
    /// Poll until acquired, ignoring `timeout`.
    #[default]
    Blocking,
    /// Return immediately if the lock is held.
    NonBlocking,
    /// Poll until acquired or `timeout` elapses.
    Timeout(Duration),
}

const POLL_DELAY: Duration = Duration::from_millis(50);

/// A lock file sitting next to the path it guards.
pub struct FileLock {
    lock_path: PathBuf,
    owner: u64,
    held: bool,
}

impl FileLock {
    /// Build (but do not acquire) a lock for `path`, using `path` with its
    /// extension replaced by `.lock`, same as the source.
    pub fn new(path: &Path, owner: u64) -> Self {
        let lock_path = path.with_extension("lock");
        FileLock { lock_path, owner, held: false }
    }

    fn read_owner(&self) -> Option<u64> {
        let contents = fs::read_to_string(&self.lock_path).ok()?;
        contents.lines().next()?.trim().parse().ok()
    }

    /// Acquire the lock, honoring `policy`. Reentrant: an owner that already
    /// holds the lock succeeds immediately.
    pub fn acquire(&mut self, policy: WaitPolicy) -> io::Result<bool> {
        let deadline = match policy {
            WaitPolicy::Timeout(d) => Some(Instant::now() + d),
            _ => None,
        };
        loop {
            if self.lock_path.exists() {
                if self.read_owner() == Some(self.owner) {
                    self.held = true;
                    return Ok(true);
                }
                match policy {
                    WaitPolicy::NonBlocking => return Ok(false),
                    WaitPolicy::Timeout(_) => {
                        if Instant::now() >= deadline.unwrap() {
                            return Ok(false);
                        }
                    }
                    WaitPolicy::Blocking => {}
                }
                std::thread::sleep(POLL_DELAY);
                continue;
            }

            let mut f = fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&self.lock_path)?;
            use std::io::Write;
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default();
            writeln!(f, "{}", self.owner)?;
            writeln!(f, "{}", now.as_secs())?;
            self.held = true;
            return Ok(true);
        }
    }

    /// Release the lock if we hold it. A no-op otherwise.
    pub fn release(&mut self) -> io::Result<()> {
        if !self.held {
            return Ok(());
        }
        if self.read_owner() == Some(self.owner) {
            match fs::remove_file(&self.lock_path) {
                Ok(()) | Err(_) if !self.lock_path.exists() => {}
                Err(e) => return Err(e),
                _ => {}
            }
        }
        self.held = false;
        Ok(())
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reentrant_same_owner() {
        let dir = std::env::temp_dir().join(format!("sgmltree-lock-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("doc.xml");
        let mut a = FileLock::new(&path, 1);
        let mut b = FileLock::new(&path, 1);
        assert!(a.acquire(WaitPolicy::NonBlocking).unwrap());
        assert!(b.acquire(WaitPolicy::NonBlocking).unwrap());
        a.release().unwrap();
    }

    #[test]
    fn conflicting_owner_non_blocking_fails() {
        let dir = std::env::temp_dir().join(format!("sgmltree-lock-test2-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("doc.xml");
        let mut a = FileLock::new(&path, 1);
        let mut b = FileLock::new(&path, 2);
        assert!(a.acquire(WaitPolicy::NonBlocking).unwrap());
        assert!(!b.acquire(WaitPolicy::NonBlocking).unwrap());
        a.release().unwrap();
    }
}
