//! `firecommit update`: install the newest release.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::CommandContext;
use crate::upgrade::{Channel, UpdateOutcome};

/// Command to update firecommit itself.
///
/// # Examples
///
/// ```bash
/// firecommit update                  # install the newest release on the configured channel
/// firecommit update --check          # only report whether one exists
/// firecommit update --channel stable # follow tagged releases for this run
/// firecommit update --force          # reinstall even when up to date
/// ```
#[derive(Args, Debug)]
pub struct UpdateCommand {
    /// Reinstall even if already on the newest release
    #[arg(short, long)]
    force: bool,

    /// Check for an update without installing it
    #[arg(long, conflicts_with = "force")]
    check: bool,

    /// Release channel to use instead of the configured one (latest, stable)
    #[arg(long, value_name = "CHANNEL")]
    channel: Option<Channel>,
}

impl UpdateCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let channel = self.channel.unwrap_or(ctx.config.upgrade.channel);
        let current = ctx.current_version.as_str();
        let updater = ctx.updater()?.force(self.force);

        println!("Current version: {current}");
        println!("{}", format!("Checking for updates on the {channel} channel...").cyan());

        if self.check {
            match updater.check(current, channel).await? {
                Some(latest) => {
                    println!("{}", format!("Update available: {current} → {latest}").green());
                    println!("Run `firecommit update` to install it");
                }
                None => println!("{}", format!("You are on the latest version ({current})").green()),
            }
            return Ok(());
        }

        let outcome = updater.apply(current, channel).await?;
        let line = outcome.to_string();
        if matches!(outcome, UpdateOutcome::Staged { .. }) {
            println!("{}", line.yellow());
        } else {
            println!("{}", line.green());
        }
        Ok(())
    }
}
