use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{LockError, UtilError};
use crate::Result;

const LOCK_SUFFIX: &str = ".lock";

/// Scoped guard over a `<target>.lock` file.
///
/// Holding a `Lockfile` means `<target>.lock` exists and was created by us
/// with exclusive-open semantics. New content is written into the lock file
/// and becomes visible at `target` only through the atomic rename performed
/// by [`commit`](Lockfile::commit). Dropping the guard without committing
/// removes the lock file and leaves `target` untouched.
#[derive(Debug)]
pub struct Lockfile {
    target: PathBuf,
    lock_path: PathBuf,
    file: Option<File>,
    done: bool,
}

impl Lockfile {
    /// Take the lock for `target` by creating `<target>.lock` exclusively.
    ///
    /// Fails with [`LockError::AlreadyHeld`] when another process holds it.
    pub fn hold(target: impl AsRef<Path>) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let mut lock_path = target.clone().into_os_string();
        lock_path.push(LOCK_SUFFIX);
        let lock_path = PathBuf::from(lock_path);

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => UtilError::Lock(LockError::AlreadyHeld {
                    path: lock_path.clone(),
                }),
                _ => UtilError::Lock(LockError::Create {
                    path: lock_path.clone(),
                    source: e,
                }),
            })?;

        Ok(Self {
            target,
            lock_path,
            file: Some(file),
            done: false,
        })
    }

    /// The path the committed content will end up at.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Flush, sync, and atomically rename the lock file onto the target.
    pub fn commit(mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .and_then(|()| file.sync_all())
                .map_err(|e| LockError::Commit {
                    path: self.lock_path.clone(),
                    source: e,
                })?;
        }
        fs::rename(&self.lock_path, &self.target).map_err(|e| LockError::Commit {
            path: self.lock_path.clone(),
            source: e,
        })?;
        self.done = true;
        Ok(())
    }

    /// Release the lock without touching the target.
    pub fn abandon(mut self) -> Result<()> {
        self.file.take();
        if self.lock_path.exists() {
            fs::remove_file(&self.lock_path)?;
        }
        self.done = true;
        Ok(())
    }
}

impl Write for Lockfile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("lock file closed"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("lock file closed"))?
            .flush()
    }
}

impl Drop for Lockfile {
    fn drop(&mut self) {
        if !self.done {
            self.file.take();
            let _ = fs::remove_file(&self.lock_path);
        }
    }
}
