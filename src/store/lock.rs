use crate::Result;
use fs4::fs_std::FileExt;
use ohno::IntoAppError;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Log target for the store lock
const LOG_TARGET: &str = "     store";

/// Holds the exclusive lock on a store for as long as it is alive.
#[derive(Debug)]
pub struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Blocks until the lock file beside `store_path` can be locked exclusively.
    ///
    /// # Errors
    ///
    /// Fails if the lock file cannot be created or locked.
    pub fn acquire(store_path: &Path) -> Result<Self> {
        let path = lock_path(store_path);

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .into_app_err_with(|| format!("opening store lock file at '{}'", path.display()))?;

        file.lock_exclusive()
            .into_app_err_with(|| format!("acquiring exclusive lock on '{}'", path.display()))?;
        log::debug!(target: LOG_TARGET, "Acquired store lock at '{}'", path.display());

        Ok(Self { file, path })
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            log::warn!(target: LOG_TARGET, "Could not unlock '{}': {e:#}", self.path.display());
        }
    }
}

/// `<store>.lock`
#[must_use]
pub fn lock_path(store_path: &Path) -> PathBuf {
    let mut name = store_path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}
