//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Overrides;

/// meetsync - Mirror upcoming meetings into ClickUp tasks
#[derive(Debug, Parser)]
#[command(name = "meetsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "MEETSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    pub debug: bool,

    /// Days ahead of now to sync
    #[arg(long, short = 'd')]
    pub days: Option<u32>,

    /// User whose calendar is read (can be repeated; replaces the configured list)
    #[arg(long = "user", short = 'u', action = clap::ArgAction::Append)]
    pub users: Vec<String>,

    /// Target ClickUp list id
    #[arg(long)]
    pub list_id: Option<String>,

    /// Also append logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Run the whole pipeline but print tasks instead of pushing them
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Returns the values that override the configuration file.
    pub fn overrides(&self) -> Overrides {
        Overrides {
            days: self.days,
            users: self.users.clone(),
            list_id: self.list_id.clone(),
            debug: self.debug,
            log_file: self.log_file.clone(),
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one sync (the default)
    Sync,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration
    Dump,

    /// Validate configuration
    Validate,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sync_flags() {
        let cli = Cli::try_parse_from([
            "meetsync",
            "--days",
            "7",
            "-u",
            "angela@mycompany.com",
            "--user",
            "chris@mycompany.com",
            "--list-id",
            "901234",
            "--dry-run",
        ])
        .unwrap();

        assert!(cli.dry_run);
        assert!(cli.command.is_none());
        let overrides = cli.overrides();
        assert_eq!(overrides.days, Some(7));
        assert_eq!(overrides.users, vec!["angela@mycompany.com", "chris@mycompany.com"]);
        assert_eq!(overrides.list_id.as_deref(), Some("901234"));
    }

    #[test]
    fn config_subcommand() {
        let cli = Cli::try_parse_from(["meetsync", "config", "validate"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Validate
            })
        ));
    }

    #[test]
    fn rejects_bad_days() {
        assert!(Cli::try_parse_from(["meetsync", "--days", "soon"]).is_err());
    }
}
