use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::lock::StateLock;
use super::replace::BinaryReplacer;
use crate::constants::BINARY_NAME;
use crate::core::UpdateError;
use crate::utils::fs::{atomic_write, make_executable};
use crate::utils::platform::exe_suffix;

/// File name of the archive index inside the archive directory.
pub const INDEX_FILE: &str = "versions.json";

/// One archived binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionEntry {
    pub version: String,
    pub archived_at: DateTime<Utc>,
    /// File name relative to the archive directory.
    pub filename: String,
}

/// The archive index: entries in insertion order, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveIndex {
    #[serde(default)]
    pub versions: Vec<VersionEntry>,
}

impl ArchiveIndex {
    #[must_use]
    pub fn find(&self, version: &str) -> Option<&VersionEntry> {
        self.versions.iter().find(|e| e.version == version)
    }
}

/// Bounded local history of previously installed firecommit binaries.
///
/// Before every update the running binary is copied into the archive
/// directory and recorded in `versions.json`, so `firecommit rollback` can
/// put it back later. After the update the archive is pruned to the newest
/// few entries.
///
/// # Layout
///
/// ```text
/// <data_dir>/firecommit/versions/
/// ├── versions.json
/// ├── firecommit-v0.3.0
/// └── firecommit-dev-42-20260215-abc1234
/// ```
///
/// # Examples
///
/// ```rust,no_run
/// use firecommit::upgrade::archive::VersionArchive;
/// use firecommit::upgrade::replace::platform_replacer;
/// use std::path::PathBuf;
///
/// # async fn example() -> anyhow::Result<()> {
/// let archive = VersionArchive::new(PathBuf::from("/home/user/.local/share/firecommit/versions"));
/// let exe = PathBuf::from("/usr/local/bin/firecommit");
///
/// archive.archive("v0.3.0", &exe).await?;
/// for entry in archive.list().await.iter().rev() {
///     println!("{} ({})", entry.version, entry.archived_at);
/// }
///
/// let replacer = platform_replacer(exe);
/// archive.restore("v0.3.0", replacer.as_ref()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct VersionArchive {
    dir: PathBuf,
}

impl VersionArchive {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    /// Path of an entry's archived binary.
    #[must_use]
    pub fn entry_path(&self, entry: &VersionEntry) -> PathBuf {
        self.dir.join(&entry.filename)
    }

    /// Deterministic archive file name for `version`.
    ///
    /// Characters outside `[A-Za-z0-9._-]` are replaced so a version string
    /// can never escape the archive directory. A replaced name also carries
    /// a short SHA-256 of the raw version, so `v1/2` and `v1_2` get
    /// different files.
    #[must_use]
    pub fn filename_for_version(version: &str) -> String {
        let safe: String = version
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
            .collect();
        if safe == version {
            format!("{BINARY_NAME}-{safe}{}", exe_suffix())
        } else {
            let digest = hex::encode(Sha256::digest(version.as_bytes()));
            format!("{BINARY_NAME}-{safe}-{}{}", &digest[..8], exe_suffix())
        }
    }

    /// Read the index. Missing or corrupt indexes yield an empty archive.
    pub async fn load(&self) -> ArchiveIndex {
        let path = self.index_path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return ArchiveIndex::default(),
            Err(e) => {
                warn!("Failed to read version archive index {}: {}", path.display(), e);
                return ArchiveIndex::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring corrupt version archive index {}: {}", path.display(), e);
            ArchiveIndex::default()
        })
    }

    fn save(&self, index: &ArchiveIndex) -> Result<()> {
        let json =
            serde_json::to_string_pretty(index).context("Failed to serialize archive index")?;
        atomic_write(&self.index_path(), json.as_bytes())
    }

    /// Entries oldest-first, as recorded.
    pub async fn list(&self) -> Vec<VersionEntry> {
        self.load().await.versions
    }

    /// Copy `executable` into the archive as `version`.
    ///
    /// Returns `false` without touching anything if `version` is already
    /// archived.
    pub async fn archive(&self, version: &str, executable: &Path) -> Result<bool> {
        let _lock = StateLock::acquire(&self.index_path()).await?;
        let mut index = self.load().await;

        if index.find(version).is_some() {
            debug!("Version {} already archived", version);
            return Ok(false);
        }

        fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create archive directory {}", self.dir.display()))?;

        let filename = Self::filename_for_version(version);
        if let Some(owner) = index.versions.iter().find(|e| e.filename == filename) {
            anyhow::bail!(
                "Archive file {} already belongs to version {}; not archiving {}",
                filename,
                owner.version,
                version
            );
        }
        let dest = self.dir.join(&filename);
        info!("Archiving {} to {}", version, dest.display());
        fs::copy(executable, &dest)
            .await
            .with_context(|| format!("Failed to copy {} to the archive", executable.display()))?;
        make_executable(&dest)?;

        index.versions.push(VersionEntry {
            version: version.to_string(),
            archived_at: Utc::now(),
            filename,
        });
        self.save(&index)?;
        Ok(true)
    }

    /// Keep only the newest `keep` entries, deleting the files of the rest.
    ///
    /// Entries are dropped in index order, oldest first. File deletion is
    /// best-effort; the index is rewritten in every case. Returns the removed
    /// entries.
    pub async fn prune(&self, keep: usize) -> Result<Vec<VersionEntry>> {
        let _lock = StateLock::acquire(&self.index_path()).await?;
        let mut index = self.load().await;

        let excess = index.versions.len().saturating_sub(keep);
        let removed: Vec<VersionEntry> = index.versions.drain(..excess).collect();

        for entry in &removed {
            if index.versions.iter().any(|kept| kept.filename == entry.filename) {
                warn!("Keeping {}: still referenced by a newer entry", entry.filename);
                continue;
            }
            let path = self.entry_path(entry);
            match fs::remove_file(&path).await {
                Ok(()) => debug!("Pruned archived {}", entry.version),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to delete archived binary {}: {}", path.display(), e),
            }
        }

        self.save(&index)?;
        Ok(removed)
    }

    /// Reinstall the archived `version` through `replacer`.
    ///
    /// Returns the replacer's "applied now" flag.
    pub async fn restore(&self, version: &str, replacer: &dyn BinaryReplacer) -> Result<bool> {
        let index = self.load().await;
        let entry = index.find(version).ok_or_else(|| UpdateError::VersionNotArchived {
            version: version.to_string(),
        })?;

        let source = self.entry_path(entry);
        if !fs::try_exists(&source).await.unwrap_or(false) {
            return Err(UpdateError::ArchivedBinaryMissing {
                version: version.to_string(),
                path: source.display().to_string(),
            }
            .into());
        }

        info!("Restoring {} from {}", version, source.display());
        replacer.replace(&source)
    }
}
