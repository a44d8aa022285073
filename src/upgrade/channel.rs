use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::UpdateError;

/// Release stream the updater follows.
///
/// - `Stable` only ever considers tagged, non-prerelease releases.
/// - `Latest` considers the newest published release across the stable feed
///   and the continuously rebuilt dev pre-release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// Newest of the stable and dev streams.
    #[default]
    Latest,
    /// Tagged semantic-version releases only.
    Stable,
}

impl Channel {
    /// Key used for this channel in persisted state and in configuration.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Stable => "stable",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "latest" => Ok(Self::Latest),
            "stable" => Ok(Self::Stable),
            other => Err(UpdateError::ConfigError {
                message: format!("unknown update channel '{other}' (expected 'latest' or 'stable')"),
            }),
        }
    }
}
