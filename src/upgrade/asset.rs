use std::fmt;

use super::release::Asset;
use crate::constants::BINARY_NAME;
use crate::core::UpdateError;

/// OS/architecture pair in the provider's asset naming scheme.
///
/// Release assets are named `<project>_<version>_<os>_<arch>.<ext>`, using
/// Go-style names (`darwin`, `amd64`, `arm64`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this binary was built for.
    #[must_use]
    pub fn current() -> Self {
        let os = match std::env::consts::OS {
            "macos" => "darwin",
            other => other,
        };
        let arch = match std::env::consts::ARCH {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            other => other,
        };
        Self::new(os, arch)
    }

    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.os == "windows"
    }

    /// Archive format used for this platform's assets.
    #[must_use]
    pub fn archive_ext(&self) -> &'static str {
        if self.is_windows() { "zip" } else { "tar.gz" }
    }

    /// Suffix every matching asset name ends with, e.g. `_linux_amd64.tar.gz`.
    #[must_use]
    pub fn asset_suffix(&self) -> String {
        format!("_{}_{}.{}", self.os, self.arch, self.archive_ext())
    }

    /// File name of the executable inside the archive.
    #[must_use]
    pub fn binary_name(&self) -> String {
        if self.is_windows() {
            format!("{BINARY_NAME}.exe")
        } else {
            BINARY_NAME.to_string()
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}

/// First asset built for `platform`.
pub fn select_asset<'a>(assets: &'a [Asset], platform: &Platform) -> Result<&'a Asset, UpdateError> {
    let suffix = platform.asset_suffix();
    assets
        .iter()
        .find(|asset| asset.name.ends_with(&suffix))
        .ok_or_else(|| UpdateError::NoMatchingAsset {
            os: platform.os.clone(),
            arch: platform.arch.clone(),
        })
}
