//! Backup and restore engine.
//!
//! [`backup`] extracts a [`Snapshot`] and writes it as a JSON artifact;
//! [`restore`] reads an artifact and replays it into an empty database in one
//! transaction. Both resolve the driver identifier first and touch nothing
//! when it is not a supported dialect.

pub mod codec;
pub mod extract;
pub mod repair;
pub mod restore;
pub mod snapshot;
pub mod sort;

use std::io::{Read, Write};

use serde::Serialize;
use tracing::info;

use crate::context::Context;
use crate::error::Result;
use crate::models::Dialect;
use crate::storage::Store;
use crate::with_models;

pub use extract::extract;
pub use repair::{ConsistencyRepair, DefaultNotificationPreferences};
pub use restore::{GroupCount, RestorationGroup, RestoreReport, restoration_groups, restore_snapshot};
pub use snapshot::Snapshot;
pub use sort::{SortableNode, sort, sort_groups};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupOptions {
    /// Read all collections inside one read-only transaction.
    pub consistent_read: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            consistent_read: true,
        }
    }
}

/// What a successful backup wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupReport {
    pub dialect: &'static str,
    pub collections: Vec<GroupCount>,
}

impl BackupReport {
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.collections.iter().map(|c| c.rows).sum()
    }
}

/// Extract every collection for `driver` from `store` and write the artifact.
pub fn backup<S: Store>(
    ctx: &Context,
    driver: &str,
    store: &mut S,
    writer: impl Write,
    options: BackupOptions,
) -> Result<BackupReport> {
    let dialect = Dialect::resolve(driver)?;
    with_models!(dialect, M => {
        let snapshot = extract::<M, S>(ctx, store, options.consistent_read)?;
        codec::encode(&snapshot, writer)?;
        let report = BackupReport {
            dialect: dialect.as_str(),
            collections: snapshot
                .counts()
                .into_iter()
                .map(|(name, rows)| GroupCount { name, rows })
                .collect(),
        };
        info!(dialect = %dialect, rows = report.total_rows(), "backup written");
        Ok(report)
    })
}

/// Read an artifact for `driver` and restore it into `store`, repairing
/// default notification preferences before commit.
pub fn restore<S: Store>(
    ctx: &Context,
    driver: &str,
    store: &mut S,
    reader: impl Read,
) -> Result<RestoreReport> {
    let dialect = Dialect::resolve(driver)?;
    with_models!(dialect, M => {
        let snapshot = codec::read::<M>(reader)?;
        restore_snapshot(ctx, store, &snapshot, &DefaultNotificationPreferences::<M>::new())
    })
}
