//! firecommit binary entry point.

use anyhow::Result;
use clap::Parser;
use firecommit::cli::auto_update::{auto_update_mode, finish_background_check, start_background_check};
use firecommit::cli::{Cli, CommandContext};
use firecommit::config::GlobalConfig;
use firecommit::core::user_friendly_error;
use firecommit::upgrade::{UpdatePaths, UpdateTiming};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    if let Err(e) = run(cli).await {
        user_friendly_error(e).display();
        std::process::exit(1);
    }
}

fn init_logging(cli: &Cli) {
    let filter = match cli.log_filter() {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = match GlobalConfig::load_with_optional(cli.config_path()).await {
        Ok(config) => config,
        Err(e) => {
            warn!("Using default configuration: {:#}", e);
            GlobalConfig::default()
        }
    };
    let ctx = CommandContext::new(firecommit::BUILD_VERSION, config, UpdatePaths::from_env()?)
        .quiet(cli.is_quiet());

    let mode = auto_update_mode(&ctx.current_version, &ctx.config.upgrade);
    let mut pending = if cli.manages_versions() {
        None
    } else {
        start_background_check(&ctx, mode)
    };

    if ctx.config.upgrade.timing == UpdateTiming::Before {
        if let Some(handle) = pending.take() {
            finish_background_check(handle, mode, &ctx).await;
        }
    }

    let result = cli.execute(&ctx).await;

    if let Some(handle) = pending {
        finish_background_check(handle, mode, &ctx).await;
    }
    result
}
