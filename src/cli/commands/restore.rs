//! idsnap restore - Replay a snapshot artifact

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use clap::Args;
use tracing::{debug, info};

use crate::app::AppContext;
use crate::backup::{DefaultNotificationPreferences, RestoreReport, codec, restore_snapshot};
use crate::error::{Result, SnapError};
use crate::models::{Dialect, ModelSet};
use crate::storage::{Access, Store, schema};
use crate::with_models;

use super::is_stdio;

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Database dialect: crdb or postgres
    #[arg(long)]
    pub driver: Option<String>,

    /// Database URL (postgres://…, sqlite://…, or a SQLite file path)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Artifact path, `-` for stdin
    #[arg(long, short, default_value = "-")]
    pub input: PathBuf,

    /// Create any missing tables before restoring
    #[arg(long)]
    pub migrate: bool,
}

pub fn run(ctx: &AppContext, args: &RestoreArgs) -> Result<()> {
    let driver = ctx.driver(args.driver.as_deref())?;
    let dialect = Dialect::resolve(&driver)?;
    let url = ctx.database_url(args.database_url.as_deref())?;

    let report = with_models!(dialect, M => restore_into::<M>(ctx, args, &url))?;

    if ctx.robot_mode {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!(
            "Restored {} rows ({}) across {} collections; {} rows added by repair",
            report.total_rows(),
            report.dialect,
            report.groups.len(),
            report.repaired
        );
    }
    Ok(())
}

/// Decode the artifact, then open, optionally migrate and restore. A bad
/// artifact never reaches the database.
fn restore_into<M: ModelSet>(
    ctx: &AppContext,
    args: &RestoreArgs,
    url: &str,
) -> Result<RestoreReport> {
    let snapshot = if is_stdio(&args.input) {
        codec::read::<M>(io::stdin().lock())?
    } else {
        codec::read::<M>(BufReader::new(File::open(&args.input)?))?
    };
    debug!(rows = snapshot.total_rows(), "artifact decoded");

    let mut store = ctx.open_store(url, Access::ReadWrite)?;

    if args.migrate {
        let statements = schema::statements::<M>(store.backend());
        store
            .apply_schema(&ctx.ctx, &statements)
            .map_err(SnapError::Migration)?;
        info!(tables = statements.len(), "schema applied");
    }

    restore_snapshot(
        &ctx.ctx,
        &mut store,
        &snapshot,
        &DefaultNotificationPreferences::<M>::new(),
    )
}
