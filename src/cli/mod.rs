//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;

/// Back up and restore identity, group and application state
#[derive(Parser, Debug)]
#[command(name = "idsnap")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Machine-readable output: JSON logs on stderr, JSON results and errors on stdout
    #[arg(long, global = true)]
    pub robot: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all logging
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/idsnap/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a full snapshot of the database as a JSON artifact
    Backup(commands::backup::BackupArgs),

    /// Replay a JSON artifact into an empty database in one transaction
    Restore(commands::restore::RestoreArgs),
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_restore_with_globals_after_subcommand() {
        let cli = Cli::try_parse_from([
            "idsnap",
            "restore",
            "--driver",
            "postgres",
            "--input",
            "snap.json",
            "--migrate",
            "-vv",
            "--robot",
        ])
        .unwrap();
        assert!(cli.robot);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Restore(args) => {
                assert_eq!(args.driver.as_deref(), Some("postgres"));
                assert_eq!(args.input, PathBuf::from("snap.json"));
                assert!(args.migrate);
            }
            Commands::Backup(_) => panic!("expected restore"),
        }
    }

    #[test]
    fn backup_defaults_to_stdout() {
        let cli = Cli::try_parse_from(["idsnap", "backup", "--driver=crdb"]).unwrap();
        match cli.command {
            Commands::Backup(args) => {
                assert_eq!(args.output, PathBuf::from("-"));
                assert!(!args.no_consistent_read);
            }
            Commands::Restore(_) => panic!("expected backup"),
        }
    }
}
