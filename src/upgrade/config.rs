use anyhow::Result;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use tracing::warn;

use super::archive::VersionArchive;
use super::channel::Channel;
use super::schedule::CheckSchedule;
use crate::constants::DEFAULT_KEEP_VERSIONS;
use crate::utils::platform::{get_cache_dir, get_data_dir};

/// Configuration for firecommit's self-update behavior.
///
/// Lives in the `[upgrade]` table of the global configuration file.
///
/// # Default Behavior
///
/// - Follow the `latest` channel (stable releases and dev builds)
/// - Check in the background and print a notice when an update exists
/// - Report the result after the command has run
/// - Use the adaptive schedule and conditional requests
/// - Keep the five most recently replaced binaries for rollback
///
/// ## TOML Example
/// ```toml
/// [upgrade]
/// channel = "stable"
/// auto_update = "always"
/// timing = "before"
/// check_cache = true
/// keep_versions = 5
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeConfig {
    /// Release stream to follow.
    #[serde(default)]
    pub channel: Channel,

    /// What to do when the background check finds an update.
    ///
    /// Builds from the dev stream always apply updates regardless of this
    /// setting. Unrecognised values fall back to `notify`.
    #[serde(default, deserialize_with = "lenient_auto_update")]
    pub auto_update: AutoUpdateMode,

    /// Whether the check result is awaited before or after the command runs.
    /// Anything other than `before` means `after`.
    #[serde(default, deserialize_with = "lenient_timing")]
    pub timing: UpdateTiming,

    /// Use the persisted schedule and ETags. When `false`, every invocation
    /// fetches release metadata and nothing is written to disk.
    #[serde(default = "default_check_cache")]
    pub check_cache: bool,

    /// Number of archived binaries kept after an update.
    #[serde(default = "default_keep_versions")]
    pub keep_versions: usize,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            channel: Channel::default(),
            auto_update: AutoUpdateMode::default(),
            timing: UpdateTiming::default(),
            check_cache: default_check_cache(),
            keep_versions: default_keep_versions(),
        }
    }
}

const fn default_check_cache() -> bool {
    true
}

const fn default_keep_versions() -> usize {
    DEFAULT_KEEP_VERSIONS
}

/// Reaction to an available update found by the background check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoUpdateMode {
    /// Install it right away.
    #[serde(alias = "a")]
    Always,
    /// Print a notice suggesting `firecommit update`.
    #[default]
    #[serde(alias = "y", alias = "yes")]
    Notify,
    /// Say nothing.
    #[serde(alias = "n", alias = "no")]
    Never,
}

impl AutoUpdateMode {
    /// Parse a configuration value, accepting the short forms `a`, `y`, `n`.
    #[must_use]
    pub fn from_config_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "always" | "a" => Some(Self::Always),
            "notify" | "y" | "yes" => Some(Self::Notify),
            "never" | "n" | "no" => Some(Self::Never),
            _ => None,
        }
    }
}

fn lenient_auto_update<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AutoUpdateMode, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(AutoUpdateMode::from_config_value(&raw).unwrap_or_else(|| {
        warn!("Unknown upgrade.auto_update value '{}', using 'notify'", raw);
        AutoUpdateMode::Notify
    }))
}

fn lenient_timing<'de, D: Deserializer<'de>>(deserializer: D) -> Result<UpdateTiming, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(match raw.trim().to_ascii_lowercase().as_str() {
        "before" => UpdateTiming::Before,
        "after" => UpdateTiming::After,
        _ => {
            warn!("Unknown upgrade.timing value '{}', using 'after'", raw);
            UpdateTiming::After
        }
    })
}

/// When the host waits for the background check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateTiming {
    /// Before running the requested command.
    Before,
    /// After the requested command finished.
    #[default]
    After,
}

/// Locations of the updater's persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePaths {
    /// Check schedule document (`update-check.json`).
    pub state_file: PathBuf,
    /// Version archive directory holding `versions.json` and the binaries.
    pub archive_dir: PathBuf,
}

impl UpdatePaths {
    /// Default locations under the user's cache and data directories.
    ///
    /// `FIRECOMMIT_CACHE_DIR` and `FIRECOMMIT_DATA_DIR` replace
    /// `<cache_dir>/firecommit` and `<data_dir>/firecommit` respectively.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            state_file: get_cache_dir()?.join("update-check.json"),
            archive_dir: get_data_dir()?.join("versions"),
        })
    }

    #[must_use]
    pub fn schedule(&self) -> CheckSchedule {
        CheckSchedule::new(self.state_file.clone())
    }

    #[must_use]
    pub fn archive(&self) -> VersionArchive {
        VersionArchive::new(self.archive_dir.clone())
    }
}
