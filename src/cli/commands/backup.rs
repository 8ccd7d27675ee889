//! idsnap backup - Write a snapshot artifact

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use tracing::{info, warn};

use crate::app::AppContext;
use crate::backup::{BackupOptions, BackupReport, backup};
use crate::error::Result;
use crate::models::Dialect;
use crate::storage::Access;

use super::is_stdio;

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Database dialect: crdb or postgres
    #[arg(long)]
    pub driver: Option<String>,

    /// Database URL (postgres://…, sqlite://…, or a SQLite file path)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Artifact path, `-` for stdout
    #[arg(long, short, default_value = "-")]
    pub output: PathBuf,

    /// Read each collection separately instead of in one read-only transaction
    #[arg(long)]
    pub no_consistent_read: bool,
}

pub fn run(ctx: &AppContext, args: &BackupArgs) -> Result<()> {
    let driver = ctx.driver(args.driver.as_deref())?;
    Dialect::resolve(&driver)?;
    let url = ctx.database_url(args.database_url.as_deref())?;
    let options = BackupOptions {
        consistent_read: ctx.config.backup.consistent_read && !args.no_consistent_read,
    };

    let mut store = ctx.open_store(&url, Access::ReadOnly)?;

    if is_stdio(&args.output) {
        let stdout = io::stdout();
        let report = backup(&ctx.ctx, &driver, &mut store, stdout.lock(), options)?;
        info!(rows = report.total_rows(), "backup written to stdout");
        return Ok(());
    }

    let report = write_file(&args.output, |writer| {
        backup(&ctx.ctx, &driver, &mut store, writer, options)
    })?;

    if ctx.robot_mode {
        println!("{}", serde_json::to_string(&report)?);
    } else {
        println!(
            "Backed up {} rows ({}) to {}",
            report.total_rows(),
            report.dialect,
            args.output.display()
        );
    }
    Ok(())
}

/// Write through a sibling `.partial` file and rename on success, so a failed
/// backup never leaves a truncated artifact at `path`.
fn write_file(
    path: &Path,
    write: impl FnOnce(&mut BufWriter<File>) -> Result<BackupReport>,
) -> Result<BackupReport> {
    let mut partial = path.as_os_str().to_owned();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let mut writer = BufWriter::new(File::create(&partial)?);
    let result = write(&mut writer).and_then(|report| {
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(report)
    });
    drop(writer);

    match result {
        Ok(report) => {
            std::fs::rename(&partial, path)?;
            Ok(report)
        }
        Err(err) => {
            if let Err(cleanup) = std::fs::remove_file(&partial) {
                warn!(path = %partial.display(), error = %cleanup, "could not remove partial artifact");
            }
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SnapError;

    fn report() -> BackupReport {
        BackupReport {
            dialect: "crdb",
            collections: Vec::new(),
        }
    }

    #[test]
    fn successful_write_lands_at_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        write_file(&path, |w| {
            w.write_all(b"{}\n")?;
            Ok(report())
        })
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n");
        assert!(!dir.path().join("snap.json.partial").exists());
    }

    #[test]
    fn failed_write_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snap.json");
        let err = write_file(&path, |w| {
            w.write_all(b"{\"applicat")?;
            Err(SnapError::Cancelled("cancelled".into()))
        })
        .unwrap_err();
        assert!(matches!(err, SnapError::Cancelled(_)));
        assert!(!path.exists());
        assert!(!dir.path().join("snap.json.partial").exists());
    }
}
