//! Snapshot extraction.

use tracing::{debug, info};

use crate::context::Context;
use crate::error::{Result, SnapError};
use crate::models::{Entity, ModelSet};
use crate::storage::{RowSource, Store, StoreError, Transaction, fetch_all};

use super::Snapshot;
use super::sort::sort_groups;

/// Read every collection of `M` from `store`.
///
/// With `consistent_read` the reads share one read-only transaction and see a
/// single point in time; otherwise each collection is read on its own.
pub fn extract<M: ModelSet, S: Store>(
    ctx: &Context,
    store: &mut S,
    consistent_read: bool,
) -> Result<Snapshot<M>> {
    if !consistent_read {
        return read_all(ctx, store);
    }
    let mut tx = store.begin_read(ctx).map_err(store_failure)?;
    let snapshot = read_all(ctx, &mut tx)?;
    // Nothing was written; ending the read transaction releases its snapshot.
    tx.rollback().map_err(SnapError::Transaction)?;
    Ok(snapshot)
}

fn read_all<M: ModelSet>(ctx: &Context, source: &mut impl RowSource) -> Result<Snapshot<M>> {
    let mut snapshot = Snapshot::<M> {
        application_types: collect(ctx, source)?,
        applications: collect(ctx, source)?,
        audit_events: collect(ctx, source)?,
        groups: collect(ctx, source)?,
        group_applications: collect(ctx, source)?,
        group_application_requests: collect(ctx, source)?,
        group_hierarchies: collect(ctx, source)?,
        group_memberships: collect(ctx, source)?,
        group_membership_requests: collect(ctx, source)?,
        group_organizations: collect(ctx, source)?,
        notification_preferences: collect(ctx, source)?,
        notification_targets: collect(ctx, source)?,
        notification_types: collect(ctx, source)?,
        organizations: collect(ctx, source)?,
        users: collect(ctx, source)?,
        extensions: collect(ctx, source)?,
        extension_resource_definitions: collect(ctx, source)?,
        system_extension_resources: collect(ctx, source)?,
        user_extension_resources: collect(ctx, source)?,
    };
    snapshot.groups = sort_groups(snapshot.groups)?;
    debug!(rows = snapshot.total_rows(), "snapshot extracted");
    Ok(snapshot)
}

fn collect<E: Entity>(ctx: &Context, source: &mut impl RowSource) -> Result<Vec<E>> {
    ctx.check()?;
    let rows = fetch_all::<E>(source, ctx).map_err(|source| match source {
        StoreError::Cancelled(reason) => SnapError::Cancelled(reason),
        source => SnapError::Extraction {
            kind: E::TABLE,
            source,
        },
    })?;
    info!(kind = E::TABLE, rows = rows.len(), "extracted");
    Ok(rows)
}

fn store_failure(err: StoreError) -> SnapError {
    match err {
        StoreError::Cancelled(reason) => SnapError::Cancelled(reason),
        err => SnapError::Transaction(err),
    }
}
