//! Cross-process locking for the updater's state documents.
//!
//! The schedule state and the archive index are read-modify-written by every
//! firecommit invocation. Holding a [`StateLock`] for the duration of one
//! read-modify-write makes concurrent invocations take turns instead of
//! losing each other's updates.

use anyhow::{Context, Result};
use fs4::fs_std::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive advisory lock on `<document>.lock`, released on drop.
#[derive(Debug)]
pub struct StateLock {
    file: File,
    path: PathBuf,
}

impl StateLock {
    /// Lock the document at `target`.
    ///
    /// Creates the parent directory and the sibling lock file if needed, then
    /// blocks (on a blocking-pool thread) until no other process holds it.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use firecommit::upgrade::lock::StateLock;
    /// use std::path::Path;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let _lock = StateLock::acquire(Path::new("/tmp/firecommit/update-check.json")).await?;
    /// // read, modify and write the document here
    /// # Ok(())
    /// # }
    /// ```
    pub async fn acquire(target: &Path) -> Result<Self> {
        let mut lock_name = target.as_os_str().to_owned();
        lock_name.push(".lock");
        let lock_path = PathBuf::from(lock_name);

        if let Some(parent) = lock_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let path = lock_path.clone();
        let file = tokio::task::spawn_blocking(move || -> Result<File> {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(false)
                .open(&path)
                .with_context(|| format!("Failed to open lock file: {}", path.display()))?;

            file.lock_exclusive()
                .with_context(|| format!("Failed to acquire lock: {}", path.display()))?;

            Ok(file)
        })
        .await
        .context("Failed to spawn blocking task for lock acquisition")??;

        Ok(Self {
            file,
            path: lock_path,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!("Failed to unlock {}: {}", self.path.display(), e);
        }
    }
}
