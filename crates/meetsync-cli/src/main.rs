//! meetsync CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use meetsync_core::init_tracing;

use meetsync_cli::cli::{Cli, Command, ConfigAction};
use meetsync_cli::commands;
use meetsync_cli::config::SyncConfig;
use meetsync_cli::error::SyncResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> SyncResult<()> {
    let mut config = match cli.config {
        Some(ref path) => SyncConfig::load_from(path)?,
        None => SyncConfig::load()?,
    };
    config.apply_overrides(&cli.overrides());

    match cli.command {
        Some(Command::Config { action }) => match action {
            ConfigAction::Dump => commands::config::dump(&config),
            ConfigAction::Validate => commands::config::validate(&config),
            ConfigAction::Path => commands::config::path(),
        },
        Some(Command::Sync) | None => {
            init_tracing(config.tracing_config()?)?;
            commands::sync::run(&config, cli.dry_run).await.map(|_| ())
        }
    }
}
