//! `firecommit rollback`: restore a binary from the version archive.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Args;
use colored::Colorize;

use super::CommandContext;
use crate::upgrade::VersionEntry;

/// Command to restore an archived version.
///
/// Without arguments (or with `--list`) the archive is shown newest first.
#[derive(Args, Debug)]
pub struct RollbackCommand {
    /// Version to restore, as printed by `--list`
    #[arg(value_name = "VERSION", conflicts_with = "list")]
    version: Option<String>,

    /// List archived versions
    #[arg(short, long)]
    list: bool,
}

impl RollbackCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let updater = ctx.updater()?;

        let Some(version) = self.version else {
            let entries = updater.list_archived().await;
            if entries.is_empty() {
                println!("No archived versions available.");
                println!("Versions are archived automatically when you run `firecommit update`.");
                return Ok(());
            }

            println!("Archived versions (newest first):");
            for entry in entries.iter().rev() {
                println!("  {}", format_entry(entry));
            }
            if !self.list {
                println!("\nRun `firecommit rollback <VERSION>` to restore one.");
            }
            return Ok(());
        };

        println!("{}", format!("Restoring {version}...").cyan());
        let applied = updater
            .restore(&version)
            .await
            .with_context(|| format!("Failed to roll back to {version}"))?;

        if applied {
            println!("{}", format!("Successfully restored {version}").green());
        } else {
            println!(
                "{}",
                format!("Restore of {version} is staged and completes when firecommit exits")
                    .yellow()
            );
        }
        Ok(())
    }
}

fn format_entry(entry: &VersionEntry) -> String {
    format!(
        "{}  (archived {})",
        entry.version,
        entry.archived_at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    )
}
