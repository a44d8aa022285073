//! Global configuration management for firecommit.
//!
//! The global configuration file stores user-wide settings. The update
//! subsystem only consumes its `[upgrade]` table ([`UpgradeConfig`]); unknown
//! tables written by other parts of firecommit are accepted and ignored.
//!
//! # Configuration File Location
//!
//! - **Override**: `FIRECOMMIT_CONFIG` environment variable, or `--config`
//! - **Default**: `<config_dir>/firecommit/config.toml`
//!
//! # Examples
//!
//! ```rust,no_run
//! use firecommit::config::GlobalConfig;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = GlobalConfig::load().await?;
//! println!("Following the {} channel", config.upgrade.channel);
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::core::UpdateError;
use crate::upgrade::config::UpgradeConfig;
use crate::utils::platform::get_config_dir;

/// Environment variable overriding the configuration file path.
pub const CONFIG_PATH_ENV: &str = "FIRECOMMIT_CONFIG";

/// User-wide firecommit configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Self-update settings.
    #[serde(default, skip_serializing_if = "is_default_upgrade_config")]
    pub upgrade: UpgradeConfig,
}

fn is_default_upgrade_config(config: &UpgradeConfig) -> bool {
    *config == UpgradeConfig::default()
}

impl GlobalConfig {
    /// Load from [`default_path`](Self::default_path), or defaults if the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The default path cannot be determined
    /// - The file exists but cannot be read
    /// - The file is not valid configuration
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` if given, otherwise from the default location.
    ///
    /// A missing file yields the default configuration.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => Self::default_path()?,
        };
        if fs::try_exists(&path).await.unwrap_or(false) {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load global configuration from a specific file path.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use firecommit::config::GlobalConfig;
    /// use std::path::Path;
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let config = GlobalConfig::load_from(Path::new("/custom/config.toml")).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content).map_err(|e| {
            UpdateError::ConfigError {
                message: format!("{}: {}", path.display(), e.message()),
            }
            .into()
        })
    }

    /// Save to a specific file path, creating parent directories as needed.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize global config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write global config to {}", path.display()))
    }

    /// Get the default file path for global configuration.
    ///
    /// `FIRECOMMIT_CONFIG` wins when set; otherwise
    /// `<config_dir>/firecommit/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        Ok(get_config_dir()?.join("config.toml"))
    }
}
