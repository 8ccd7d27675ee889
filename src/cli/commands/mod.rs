//! CLI command implementations
//!
//! Each subcommand has its own module with:
//! - Args struct for command-line arguments
//! - `run()` function to execute the command

use std::path::Path;

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub mod backup;
pub mod restore;

/// Dispatch a command to its handler
pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Backup(args) => backup::run(ctx, args),
        Commands::Restore(args) => restore::run(ctx, args),
    }
}

/// `-` names stdin or stdout.
fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}
