//! Command-line interface for firecommit's self-management commands.
//!
//! # Commands
//!
//! - `update` - Install the newest release on the configured channel
//! - `rollback` - Restore a binary from the version archive
//! - `version` - Print the running version and the archive size
//!
//! # Global Options
//!
//! - `--verbose` / `-v` - Debug logging on stderr
//! - `--quiet` / `-q` - Errors only, no progress bars
//! - `--config` / `-c` - Alternate configuration file
//!
//! # Examples
//!
//! ```bash
//! firecommit update --check
//! firecommit update --channel stable --force
//! firecommit rollback --list
//! firecommit rollback v0.3.0
//! ```
//!
//! The [`auto_update`] module holds the background check that runs around
//! every other invocation.

pub mod auto_update;
mod rollback;
mod update;
mod version;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::GlobalConfig;
use crate::upgrade::{ReleaseSource, SelfUpdater, UpdatePaths};

/// Everything a command needs besides its own arguments.
///
/// Built once in `main` so commands never read global state themselves, and
/// tests can point every path at a temporary directory.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Version of the running binary.
    pub current_version: String,
    pub config: GlobalConfig,
    pub paths: UpdatePaths,
    /// Suppress progress bars.
    pub quiet: bool,
}

impl CommandContext {
    pub fn new(current_version: impl Into<String>, config: GlobalConfig, paths: UpdatePaths) -> Self {
        Self {
            current_version: current_version.into(),
            config,
            paths,
            quiet: false,
        }
    }

    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Release source for this invocation.
    pub fn release_source(&self) -> Result<ReleaseSource> {
        ReleaseSource::from_env()
    }

    /// Updater configured from `[upgrade]` and the archive location.
    pub fn updater(&self) -> Result<SelfUpdater> {
        Ok(SelfUpdater::new(self.release_source()?, self.paths.archive())?
            .keep_versions(self.config.upgrade.keep_versions)
            .show_progress(!self.quiet))
    }
}

/// Main CLI structure for firecommit.
#[derive(Parser, Debug)]
#[command(
    name = "firecommit",
    about = "AI-assisted git commits",
    version = crate::BUILD_VERSION,
    long_about = "firecommit writes commit messages with an LLM. These commands keep the firecommit binary itself up to date."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Update firecommit to the newest release
    Update(update::UpdateCommand),

    /// Restore a previously archived version
    Rollback(rollback::RollbackCommand),

    /// Print the version
    Version(version::VersionCommand),
}

impl Cli {
    /// `tracing` filter implied by `--verbose`/`--quiet`, if any.
    #[must_use]
    pub const fn log_filter(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }

    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        self.quiet
    }

    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config.clone()
    }

    /// Whether the command manages firecommit versions itself.
    ///
    /// The background check is skipped for these so `update` does not update
    /// twice and `rollback` is not immediately undone.
    #[must_use]
    pub const fn manages_versions(&self) -> bool {
        matches!(self.command, Commands::Update(_) | Commands::Rollback(_))
    }

    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        match self.command {
            Commands::Update(cmd) => cmd.execute(ctx).await,
            Commands::Rollback(cmd) => cmd.execute(ctx).await,
            Commands::Version(cmd) => cmd.execute(ctx).await,
        }
    }
}
