//! Exclusive-creation lock files
//!
//! Every file the repository mutates (index, refs, merge state) is rewritten
//! through a `<path>.lock` sibling. The lock is created with `create_new`, so a
//! second writer fails immediately instead of waiting. Committing renames the
//! lock over the target, which makes the new contents visible atomically.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

const LOCK_SUFFIX: &str = "lock";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LockError {
    #[error(
        "Unable to create '{}': File exists.\n\n\
        Another bit process seems to be running in this repository.\n\
        If it still fails, a bit process may have crashed in this repository earlier:\n\
        remove the file manually to continue.",
        .lock_path.display()
    )]
    LockDenied { lock_path: PathBuf },
    #[error("could not create '{}': parent directory does not exist", .lock_path.display())]
    MissingParent { lock_path: PathBuf },
    #[error("could not create '{}': permission denied", .lock_path.display())]
    NoPermission {
        lock_path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("not holding lock on file: {}", .lock_path.display())]
    StaleLock { lock_path: PathBuf },
}

#[derive(Debug)]
pub struct Lockfile {
    file_path: PathBuf,
    lock_path: PathBuf,
    lock: Option<File>,
}

impl Lockfile {
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        let lock_path = Self::lock_path_for(path);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .map_err(|source| match source.kind() {
                io::ErrorKind::AlreadyExists => LockError::LockDenied {
                    lock_path: lock_path.clone(),
                },
                io::ErrorKind::NotFound => LockError::MissingParent {
                    lock_path: lock_path.clone(),
                },
                _ => LockError::NoPermission {
                    lock_path: lock_path.clone(),
                    source,
                },
            })?;

        trace!(path = %lock_path.display(), "acquired lock");

        Ok(Lockfile {
            file_path: path.to_path_buf(),
            lock_path,
            lock: Some(file),
        })
    }

    /// Acquire the lock, creating the missing parent directories first.
    pub fn acquire_creating_parents(path: &Path) -> anyhow::Result<Self> {
        match Self::acquire(path) {
            Err(LockError::MissingParent { .. }) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                Ok(Self::acquire(path)?)
            }
            other => Ok(other?),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn is_held(&self) -> bool {
        self.lock.is_some()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), LockError> {
        let lock_path = self.lock_path.clone();
        let file = self.held_mut()?;

        file.write_all(bytes)
            .map_err(|source| LockError::NoPermission { lock_path, source })
    }

    pub fn commit(mut self) -> Result<(), LockError> {
        let file = self.lock.take().ok_or_else(|| LockError::StaleLock {
            lock_path: self.lock_path.clone(),
        })?;

        let finish = file
            .sync_all()
            .and_then(|_| {
                drop(file);
                std::fs::rename(&self.lock_path, &self.file_path)
            })
            .map_err(|source| LockError::NoPermission {
                lock_path: self.lock_path.clone(),
                source,
            });

        if finish.is_err() {
            let _ = std::fs::remove_file(&self.lock_path);
        } else {
            debug!(path = %self.file_path.display(), "committed lock");
        }

        finish
    }

    pub fn rollback(mut self) -> Result<(), LockError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), LockError> {
        let file = self.lock.take().ok_or_else(|| LockError::StaleLock {
            lock_path: self.lock_path.clone(),
        })?;
        drop(file);

        std::fs::remove_file(&self.lock_path).map_err(|source| LockError::NoPermission {
            lock_path: self.lock_path.clone(),
            source,
        })?;
        trace!(path = %self.lock_path.display(), "released lock");

        Ok(())
    }

    fn held_mut(&mut self) -> Result<&mut File, LockError> {
        match self.lock.as_mut() {
            Some(file) => Ok(file),
            None => Err(LockError::StaleLock {
                lock_path: self.lock_path.clone(),
            }),
        }
    }

    fn lock_path_for(path: &Path) -> PathBuf {
        let mut name = path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(LOCK_SUFFIX);
        path.with_file_name(name)
    }
}

impl Write for Lockfile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let file = self
            .held_mut()
            .map_err(|err| io::Error::new(io::ErrorKind::BrokenPipe, err))?;
        file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.lock.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

impl Drop for Lockfile {
    fn drop(&mut self) {
        if self.lock.is_some() {
            let _ = self.release();
        }
    }
}
