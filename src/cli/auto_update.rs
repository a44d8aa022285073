//! Background update check around ordinary invocations.
//!
//! `main` starts a check before running the requested command and handles the
//! result either before the command (`timing = "before"`) or after it. When an
//! update exists, `always` installs it on the spot and `notify` prints a
//! notice; errors from either are reported but never change the exit status.

use colored::Colorize;
use tracing::debug;

use super::CommandContext;
use crate::core::user_friendly_error;
use crate::upgrade::version::is_dev_build;
use crate::upgrade::{AutoUpdateMode, BackgroundChecker, CheckHandle, CheckResult, UpgradeConfig};

/// Effective auto-update mode for `current_version`.
///
/// Dev builds always update themselves; other builds follow `auto_update`.
#[must_use]
pub fn auto_update_mode(current_version: &str, config: &UpgradeConfig) -> AutoUpdateMode {
    if is_dev_build(current_version) {
        AutoUpdateMode::Always
    } else {
        config.auto_update
    }
}

/// Start the background check, or `None` when `mode` is [`AutoUpdateMode::Never`].
///
/// Must be called from within a tokio runtime.
pub fn start_background_check(ctx: &CommandContext, mode: AutoUpdateMode) -> Option<CheckHandle> {
    if mode == AutoUpdateMode::Never {
        return None;
    }

    let source = match ctx.release_source() {
        Ok(source) => source,
        Err(e) => {
            debug!("Skipping update check: {:#}", e);
            return None;
        }
    };

    let upgrade = &ctx.config.upgrade;
    let checker = if upgrade.check_cache {
        BackgroundChecker::new(source, ctx.paths.schedule())
    } else {
        BackgroundChecker::uncached(source)
    };
    Some(checker.start(&ctx.current_version, upgrade.channel))
}

/// Wait for the check and act on its result.
pub async fn finish_background_check(handle: CheckHandle, mode: AutoUpdateMode, ctx: &CommandContext) {
    let result = handle.wait().await;
    handle_check_result(&result, mode, ctx).await;
}

async fn handle_check_result(result: &CheckResult, mode: AutoUpdateMode, ctx: &CommandContext) {
    if let Some(e) = &result.error {
        debug!("Background update check failed: {:#}", e);
        return;
    }
    if !result.has_update {
        return;
    }

    match mode {
        AutoUpdateMode::Always => {
            eprintln!(
                "\n{}",
                format!(
                    "Auto-updating firecommit: {} → {}",
                    result.current_version, result.latest_version
                )
                .cyan()
            );
            let applied = match ctx.updater() {
                Ok(updater) => updater.apply(&ctx.current_version, ctx.config.upgrade.channel).await,
                Err(e) => Err(e),
            };
            match applied {
                Ok(outcome) => eprintln!("{}", outcome.to_string().green()),
                Err(e) => user_friendly_error(e.context("Auto-update failed")).display(),
            }
        }
        AutoUpdateMode::Notify => {
            if let Some(notice) = result.notice() {
                eprint!("{notice}");
            }
        }
        AutoUpdateMode::Never => {}
    }
}
