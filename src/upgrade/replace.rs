//! Installing a new executable over the running one.
//!
//! Two strategies sit behind [`BinaryReplacer`]:
//!
//! - [`ImmediateReplacer`] for platforms that allow replacing an open
//!   executable (Unix). The swap happens before `replace` returns.
//! - [`DeferredReplacer`] for platforms that lock open executables
//!   (Windows). The new binary is staged next to the old one and a detached
//!   helper script completes the swap once this process has exited.
//!
//! [`platform_replacer`] picks the strategy for the build target.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

use crate::constants::{ALIAS_NAMES, DEFERRED_POLL_SECONDS};
use crate::core::UpdateError;
use crate::utils::fs::{copy_file, make_executable};
use crate::utils::platform::exe_suffix;

/// Strategy for putting a new binary in place of the installed one.
pub trait BinaryReplacer: Send + Sync {
    /// Install `source` over the target executable.
    ///
    /// Returns `true` if the new binary is in place when this returns, and
    /// `false` if the swap completes after the current process exits.
    fn replace(&self, source: &Path) -> Result<bool>;

    /// Executable being replaced.
    fn target(&self) -> &Path;
}

/// Choose the replacement strategy for the build target.
pub fn platform_replacer(target: PathBuf) -> Box<dyn BinaryReplacer> {
    if cfg!(windows) {
        Box::new(DeferredReplacer::new(target, std::env::temp_dir()))
    } else {
        Box::new(ImmediateReplacer::new(target))
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

fn default_aliases() -> Vec<String> {
    ALIAS_NAMES.iter().map(|name| format!("{name}{}", exe_suffix())).collect()
}

/// Rename-aside replacement with rollback.
///
/// ```text
/// target ──rename──▶ target.old
/// source ──copy────▶ target        (failure: target.old ──rename──▶ target)
/// chmod 755 target
/// delete target.old
/// recreate aliases
/// ```
#[derive(Debug, Clone)]
pub struct ImmediateReplacer {
    target: PathBuf,
    aliases: Vec<String>,
}

impl ImmediateReplacer {
    pub fn new(target: PathBuf) -> Self {
        Self {
            target,
            aliases: default_aliases(),
        }
    }

    /// Override the secondary entry point file names.
    #[must_use]
    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    fn install(&self, source: &Path) -> Result<()> {
        copy_file(source, &self.target)?;
        make_executable(&self.target)
    }

    /// Point existing secondary entry points at the freshly installed binary.
    fn recreate_aliases(&self) {
        let (Some(dir), Some(base)) = (self.target.parent(), self.target.file_name()) else {
            return;
        };

        for alias in &self.aliases {
            let alias_path = dir.join(alias);
            if std::fs::symlink_metadata(&alias_path).is_err() {
                continue;
            }
            if let Err(e) = recreate_alias(&self.target, base, &alias_path) {
                warn!("Failed to recreate {}: {:#}", alias_path.display(), e);
            } else {
                debug!("Recreated {}", alias_path.display());
            }
        }
    }
}

#[cfg(unix)]
fn recreate_alias(_target: &Path, base: &std::ffi::OsStr, alias_path: &Path) -> Result<()> {
    std::fs::remove_file(alias_path)
        .with_context(|| format!("Failed to remove {}", alias_path.display()))?;
    std::os::unix::fs::symlink(base, alias_path)
        .with_context(|| format!("Failed to link {}", alias_path.display()))
}

#[cfg(not(unix))]
fn recreate_alias(target: &Path, _base: &std::ffi::OsStr, alias_path: &Path) -> Result<()> {
    copy_file(target, alias_path)
}

impl BinaryReplacer for ImmediateReplacer {
    fn replace(&self, source: &Path) -> Result<bool> {
        let old = sibling(&self.target, ".old");
        info!("Replacing {}", self.target.display());

        if old.exists() {
            std::fs::remove_file(&old).map_err(|e| UpdateError::replace_failure(&old, e))?;
        }

        std::fs::rename(&self.target, &old).map_err(|e| {
            UpdateError::replace_failure(&self.target, format!("move current binary aside: {e}"))
        })?;

        if let Err(e) = self.install(source) {
            if let Err(rollback) = std::fs::rename(&old, &self.target) {
                warn!("Rollback of {} failed: {}", self.target.display(), rollback);
            }
            return Err(UpdateError::replace_failure(
                &self.target,
                format!("install new binary: {e:#}"),
            )
            .into());
        }

        if let Err(e) = std::fs::remove_file(&old) {
            warn!("Failed to remove {}: {}", old.display(), e);
        }

        self.recreate_aliases();
        Ok(true)
    }

    fn target(&self) -> &Path {
        &self.target
    }
}

/// Staged replacement completed by a detached `cmd` script after exit.
#[derive(Debug, Clone)]
pub struct DeferredReplacer {
    target: PathBuf,
    aliases: Vec<String>,
    script_dir: PathBuf,
}

impl DeferredReplacer {
    pub fn new(target: PathBuf, script_dir: PathBuf) -> Self {
        Self {
            target,
            aliases: default_aliases(),
            script_dir,
        }
    }

    #[must_use]
    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// Path the new binary is staged at.
    #[must_use]
    pub fn staged_path(&self) -> PathBuf {
        sibling(&self.target, ".new")
    }

    /// Stage `source` and write the helper script; returns the script path.
    pub fn prepare(&self, source: &Path) -> Result<PathBuf> {
        let staged = self.staged_path();
        if staged.exists() {
            std::fs::remove_file(&staged).map_err(|e| UpdateError::replace_failure(&staged, e))?;
        }
        copy_file(source, &staged).map_err(|e| {
            UpdateError::replace_failure(&self.target, format!("prepare staged binary: {e:#}"))
        })?;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let script_path = self.script_dir.join(format!("firecommit-replace-{nanos}.cmd"));
        std::fs::write(&script_path, self.replace_script()).map_err(|e| {
            UpdateError::replace_failure(&self.target, format!("write replace script: {e}"))
        })?;

        debug!("Staged {} with helper {}", staged.display(), script_path.display());
        Ok(script_path)
    }

    /// Batch script that completes the swap once the target is unlocked.
    #[must_use]
    pub fn replace_script(&self) -> String {
        let target = escape_batch_value(&self.target.display().to_string());
        let staged = escape_batch_value(&self.staged_path().display().to_string());
        let old = escape_batch_value(&sibling(&self.target, ".old").display().to_string());
        let bin_dir = escape_batch_value(
            &self
                .target
                .parent()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        );

        let mut lines = vec![
            "@echo off".to_string(),
            "setlocal".to_string(),
            format!("set \"TARGET={target}\""),
            format!("set \"STAGED={staged}\""),
            format!("set \"OLD={old}\""),
            format!("set \"BIN_DIR={bin_dir}\""),
            String::new(),
            ":wait_target".to_string(),
            "move /Y \"%TARGET%\" \"%OLD%\" >nul 2>&1".to_string(),
            "if errorlevel 1 (".to_string(),
            format!("  timeout /T {DEFERRED_POLL_SECONDS} /NOBREAK >nul"),
            "  goto wait_target".to_string(),
            ")".to_string(),
            String::new(),
            "move /Y \"%STAGED%\" \"%TARGET%\" >nul 2>&1".to_string(),
            "if errorlevel 1 (".to_string(),
            "  move /Y \"%OLD%\" \"%TARGET%\" >nul 2>&1".to_string(),
            "  del /F /Q \"%~f0\" >nul 2>&1".to_string(),
            "  exit /b 1".to_string(),
            ")".to_string(),
            String::new(),
        ];
        for alias in &self.aliases {
            let alias = escape_batch_value(alias);
            lines.push(format!(
                "if exist \"%BIN_DIR%\\{alias}\" copy /Y \"%TARGET%\" \"%BIN_DIR%\\{alias}\" >nul 2>&1"
            ));
        }
        lines.push("del /F /Q \"%OLD%\" >nul 2>&1".to_string());
        lines.push("del /F /Q \"%~f0\" >nul 2>&1".to_string());

        let mut script = lines.join("\r\n");
        script.push_str("\r\n");
        script
    }
}

impl BinaryReplacer for DeferredReplacer {
    fn replace(&self, source: &Path) -> Result<bool> {
        let script = self.prepare(source)?;

        let status = std::process::Command::new("cmd")
            .arg("/C")
            .arg("start")
            .arg("")
            .arg("/B")
            .arg(&script)
            .status()
            .map_err(|e| {
                UpdateError::replace_failure(&self.target, format!("launch replace script: {e}"))
            })?;
        if !status.success() {
            return Err(UpdateError::replace_failure(
                &self.target,
                format!("replace script launcher exited with {status}"),
            )
            .into());
        }

        info!("Update staged; it completes after firecommit exits");
        Ok(false)
    }

    fn target(&self) -> &Path {
        &self.target
    }
}

/// Escape `%` for use inside a `set "NAME=value"` line.
fn escape_batch_value(value: &str) -> String {
    value.replace('%', "%%")
}
