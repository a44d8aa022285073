//! Platform helpers: well-known directories and executable naming.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Whether the crate was built for Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Executable file suffix for the build target (`".exe"` on Windows, empty elsewhere).
#[must_use]
pub const fn exe_suffix() -> &'static str {
    if is_windows() { ".exe" } else { "" }
}

/// Per-user cache directory for firecommit.
///
/// `FIRECOMMIT_CACHE_DIR` replaces the platform cache root when set.
pub fn get_cache_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("FIRECOMMIT_CACHE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::cache_dir().map(|p| p.join("firecommit")).ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the LOCALAPPDATA environment variable is set"
        } else if cfg!(target_os = "macos") {
            "On macOS: Check that the HOME environment variable is set"
        } else {
            "On Linux: Check that the XDG_CACHE_HOME or HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine cache directory.\n\n{platform_help}")
    })
}

/// Per-user data directory for firecommit.
///
/// `FIRECOMMIT_DATA_DIR` replaces the platform data root when set.
pub fn get_data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os("FIRECOMMIT_DATA_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::data_dir().map(|p| p.join("firecommit")).ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the APPDATA environment variable is set"
        } else if cfg!(target_os = "macos") {
            "On macOS: Check that the HOME environment variable is set"
        } else {
            "On Linux: Check that the XDG_DATA_HOME or HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine data directory.\n\n{platform_help}")
    })
}

/// Per-user configuration directory for firecommit.
pub fn get_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|p| p.join("firecommit"))
        .ok_or_else(|| anyhow::anyhow!("Could not determine configuration directory"))
}

/// Absolute path of the running executable with symlinks resolved.
///
/// Replacing the resolved target (rather than a symlink pointing at it) keeps
/// package-manager style `bin/` links intact.
pub fn current_executable() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to determine executable path")?;
    std::fs::canonicalize(&exe)
        .with_context(|| format!("Failed to resolve executable path {}", exe.display()))
}
