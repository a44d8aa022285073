use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use super::archive::{VersionArchive, VersionEntry};
use super::asset::{Platform, select_asset};
use super::channel::Channel;
use super::download::Downloader;
use super::extract::extract_binary;
use super::release::ReleaseSource;
use super::replace::{BinaryReplacer, platform_replacer};
use super::verification::ChecksumVerifier;
use super::version::has_newer_version;
use crate::constants::DEFAULT_KEEP_VERSIONS;
use crate::utils::platform::current_executable;

/// Result of [`SelfUpdater::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Nothing newer on the channel.
    UpToDate { version: String },
    /// The new binary is in place.
    Updated { from: String, to: String },
    /// The new binary is staged and replaces the old one after this process exits.
    Staged { from: String, to: String },
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpToDate { version } => write!(f, "firecommit is up to date ({version})"),
            Self::Updated { from, to } => write!(f, "Updated firecommit {from} → {to}"),
            Self::Staged { from, to } => {
                write!(f, "Update {from} → {to} staged; it completes when firecommit exits")
            }
        }
    }
}

/// Core self-update manager for firecommit binary upgrades.
///
/// `SelfUpdater` composes the release source, asset selection, download,
/// checksum verification, extraction, version archive and binary replacement
/// into the "apply update now" operation. Steps run strictly in order; anything
/// that fails before the replace step leaves the installed binary untouched.
///
/// # Update Sequence
///
/// ```text
/// fetch release ─▶ newer? (or --force) ─▶ select asset ─▶ download
///       ─▶ verify SHA-256 ─▶ extract ─▶ archive current (best-effort)
///       ─▶ replace ─▶ prune archive (best-effort)
/// ```
///
/// # Examples
///
/// ## Check for Updates
/// ```rust,no_run
/// use firecommit::upgrade::{Channel, ReleaseSource, SelfUpdater, UpdatePaths};
///
/// # async fn example() -> anyhow::Result<()> {
/// let paths = UpdatePaths::from_env()?;
/// let updater = SelfUpdater::new(ReleaseSource::github()?, paths.archive())?;
///
/// match updater.check("v0.3.1", Channel::Stable).await? {
///     Some(latest) => println!("Update available: v0.3.1 -> {latest}"),
///     None => println!("Already on latest version"),
/// }
/// # Ok(())
/// # }
/// ```
///
/// ## Force Update
/// ```rust,no_run
/// use firecommit::upgrade::{Channel, ReleaseSource, SelfUpdater, UpdatePaths};
///
/// # async fn example() -> anyhow::Result<()> {
/// let paths = UpdatePaths::from_env()?;
/// let updater = SelfUpdater::new(ReleaseSource::github()?, paths.archive())?.force(true);
///
/// // Reinstalls even if already on the newest release
/// let outcome = updater.apply("v0.3.1", Channel::Latest).await?;
/// println!("{outcome}");
/// # Ok(())
/// # }
/// ```
pub struct SelfUpdater {
    source: ReleaseSource,
    downloader: Downloader,
    archive: VersionArchive,
    platform: Platform,
    /// Executable to archive and replace; the running binary when unset.
    executable: Option<PathBuf>,
    replacer: Option<Box<dyn BinaryReplacer>>,
    keep_versions: usize,
    force: bool,
    show_progress: bool,
}

impl SelfUpdater {
    /// Create an updater for the running binary on the current platform.
    pub fn new(source: ReleaseSource, archive: VersionArchive) -> Result<Self> {
        Ok(Self {
            source,
            downloader: Downloader::new()?,
            archive,
            platform: Platform::current(),
            executable: None,
            replacer: None,
            keep_versions: DEFAULT_KEEP_VERSIONS,
            force: false,
            show_progress: true,
        })
    }

    /// Install even when the channel has nothing newer.
    #[must_use]
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Operate on `executable` instead of the running binary.
    #[must_use]
    pub fn with_executable(mut self, executable: PathBuf) -> Self {
        self.executable = Some(executable);
        self
    }

    /// Use a specific replacement strategy; its target becomes the executable.
    #[must_use]
    pub fn with_replacer(mut self, replacer: Box<dyn BinaryReplacer>) -> Self {
        self.executable = Some(replacer.target().to_path_buf());
        self.replacer = Some(replacer);
        self
    }

    #[must_use]
    pub fn keep_versions(mut self, keep: usize) -> Self {
        self.keep_versions = keep;
        self
    }

    #[must_use]
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    #[must_use]
    pub fn archive(&self) -> &VersionArchive {
        &self.archive
    }

    /// Newest version on `channel` if it is newer than `current`.
    pub async fn check(&self, current: &str, channel: Channel) -> Result<Option<String>> {
        let release = self
            .source
            .fetch_latest(channel)
            .await
            .context("Failed to check for updates")?;
        let latest = release.effective_version();
        Ok(has_newer_version(current, latest, channel).then(|| latest.to_string()))
    }

    /// Install the newest release on `channel` over the executable.
    pub async fn apply(&self, current: &str, channel: Channel) -> Result<UpdateOutcome> {
        let executable = self.resolve_executable()?;

        let release = self
            .source
            .fetch_latest(channel)
            .await
            .context("Failed to check for updates")?;
        let latest = release.effective_version().to_string();

        if !self.force && !has_newer_version(current, &latest, channel) {
            info!("{} is up to date on the {} channel", current, channel);
            return Ok(UpdateOutcome::UpToDate { version: current.to_string() });
        }
        info!("Updating {} → {} ({})", current, latest, self.platform);

        let asset = select_asset(&release.assets, &self.platform)?;
        debug!("Selected asset {}", asset.name);

        let work = tempfile::Builder::new()
            .prefix("firecommit-update-")
            .tempdir()
            .context("Failed to create temporary update directory")?;

        let progress = self.download_bar();
        let download = self
            .downloader
            .download_to_temp(&asset.browser_download_url, work.path(), Some(&progress))
            .await
            .with_context(|| format!("Failed to download {}", asset.name))?;

        ChecksumVerifier::verify_downloaded_asset(&self.downloader, &release, asset, download.path())
            .await
            .context("Checksum verification failed")?;

        let extract_dir = work.path().join("extract");
        tokio::fs::create_dir_all(&extract_dir)
            .await
            .context("Failed to create extraction directory")?;
        let binary = extract_binary(
            download.path(),
            &asset.name,
            &extract_dir,
            &self.platform.binary_name(),
        )
        .await
        .context("Failed to extract the new binary")?;

        match self.archive.archive(current, &executable).await {
            Ok(true) => debug!("Archived {}", current),
            Ok(false) => {}
            Err(e) => warn!("Failed to archive {}: {:#}", current, e),
        }

        let applied = match &self.replacer {
            Some(replacer) => replacer.replace(&binary),
            None => platform_replacer(executable).replace(&binary),
        }
        .context("Failed to install updated binary")?;

        if let Err(e) = self.archive.prune(self.keep_versions).await {
            warn!("Failed to prune version archive: {:#}", e);
        }

        let from = current.to_string();
        Ok(if applied {
            UpdateOutcome::Updated { from, to: latest }
        } else {
            UpdateOutcome::Staged { from, to: latest }
        })
    }

    /// Archived versions, oldest first.
    pub async fn list_archived(&self) -> Vec<VersionEntry> {
        self.archive.list().await
    }

    /// Reinstall an archived version. Returns whether it is in place already.
    pub async fn restore(&self, version: &str) -> Result<bool> {
        match &self.replacer {
            Some(replacer) => self.archive.restore(version, replacer.as_ref()).await,
            None => {
                let replacer = platform_replacer(self.resolve_executable()?);
                self.archive.restore(version, replacer.as_ref()).await
            }
        }
    }

    fn resolve_executable(&self) -> Result<PathBuf> {
        match &self.executable {
            Some(path) => Ok(path.clone()),
            None => current_executable(),
        }
    }

    fn download_bar(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{prefix:.bold.cyan} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        {
            bar.set_style(style.progress_chars("━╸━"));
        }
        bar.set_prefix("Downloading");
        bar
    }
}
