use anyhow::Result;
use clap::Args;

use super::CommandContext;
use crate::constants::BINARY_NAME;

/// Print the running version and how many archived versions can be restored.
#[derive(Args, Debug)]
pub struct VersionCommand {}

impl VersionCommand {
    pub async fn execute(self, ctx: &CommandContext) -> Result<()> {
        let archived = ctx.paths.archive().list().await.len();
        println!("{}", version_line(&ctx.current_version, archived));
        Ok(())
    }
}

fn version_line(version: &str, archived: usize) -> String {
    match archived {
        0 => format!("{BINARY_NAME} {version}"),
        1 => format!(
            "{BINARY_NAME} {version} (1 archived version available, use `firecommit rollback` to restore)"
        ),
        n => format!(
            "{BINARY_NAME} {version} ({n} archived versions available, use `firecommit rollback` to restore)"
        ),
    }
}
