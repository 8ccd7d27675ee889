//! Restore orchestration: one transaction, a fixed insert sequence, then the
//! consistency repair, then commit.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::error::{Result, SnapError};
use crate::models::{Entity, ModelSet, TableDef, Value};
use crate::storage::{Store, StoreError, Transaction};

use super::Snapshot;
use super::repair::ConsistencyRepair;
use super::sort::sort_groups;

/// One step of the restore sequence: every row of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct RestorationGroup {
    pub name: &'static str,
    pub table: TableDef,
    pub rows: Vec<Vec<Value>>,
}

impl RestorationGroup {
    fn of<E: Entity>(rows: &[E]) -> Self {
        Self {
            name: E::TABLE,
            table: E::table(),
            rows: rows.iter().map(Entity::to_values).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCount {
    pub name: &'static str,
    pub rows: usize,
}

/// What a successful restore wrote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub dialect: &'static str,
    pub groups: Vec<GroupCount>,
    /// Rows added by the consistency repair.
    pub repaired: usize,
}

impl RestoreReport {
    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.groups.iter().map(|g| g.rows).sum()
    }
}

/// The restore sequence for `snapshot`. Parents precede children in every
/// step; groups are re-sorted whatever order they arrived in.
pub fn restoration_groups<M: ModelSet>(snapshot: &Snapshot<M>) -> Result<Vec<RestorationGroup>> {
    let groups = sort_groups(snapshot.groups.clone())?;
    Ok(vec![
        RestorationGroup::of(&snapshot.application_types),
        RestorationGroup::of(&groups),
        RestorationGroup::of(&snapshot.users),
        RestorationGroup::of(&snapshot.extensions),
        RestorationGroup::of(&snapshot.notification_targets),
        RestorationGroup::of(&snapshot.notification_types),
        RestorationGroup::of(&snapshot.organizations),
        RestorationGroup::of(&snapshot.applications),
        RestorationGroup::of(&snapshot.audit_events),
        RestorationGroup::of(&snapshot.extension_resource_definitions),
        RestorationGroup::of(&snapshot.group_application_requests),
        RestorationGroup::of(&snapshot.group_applications),
        RestorationGroup::of(&snapshot.group_hierarchies),
        RestorationGroup::of(&snapshot.group_membership_requests),
        RestorationGroup::of(&snapshot.group_memberships),
        RestorationGroup::of(&snapshot.group_organizations),
        RestorationGroup::of(&snapshot.notification_preferences),
        RestorationGroup::of(&snapshot.system_extension_resources),
        RestorationGroup::of(&snapshot.user_extension_resources),
    ])
}

/// Write `snapshot` into `store` inside one transaction.
///
/// Rows keep their ids and tombstones and are plainly inserted, so the target
/// tables should be empty. Any failure rolls everything back.
pub fn restore_snapshot<M, S, R>(
    ctx: &Context,
    store: &mut S,
    snapshot: &Snapshot<M>,
    repair: &R,
) -> Result<RestoreReport>
where
    M: ModelSet,
    S: Store,
    R: ConsistencyRepair<M> + ?Sized,
{
    let groups = restoration_groups(snapshot)?;
    ctx.check()?;

    let mut tx = store.begin(ctx).map_err(|err| match err {
        StoreError::Cancelled(reason) => SnapError::Cancelled(reason),
        err => SnapError::Transaction(err),
    })?;

    let report = match write_all(ctx, &mut tx, &groups, repair).and_then(|report| {
        ctx.check()?;
        Ok(report)
    }) {
        Ok(report) => report,
        Err(err) => {
            warn!(error = %err, "restore failed, rolling back");
            if let Err(rollback) = tx.rollback() {
                warn!(error = %rollback, "rollback failed");
            }
            return Err(err);
        }
    };

    tx.commit().map_err(SnapError::Transaction)?;
    info!(
        dialect = M::DIALECT.as_str(),
        rows = report.total_rows(),
        repaired = report.repaired,
        "restore committed"
    );
    Ok(report)
}

fn write_all<M, T, R>(
    ctx: &Context,
    tx: &mut T,
    groups: &[RestorationGroup],
    repair: &R,
) -> Result<RestoreReport>
where
    M: ModelSet,
    T: Transaction,
    R: ConsistencyRepair<M> + ?Sized,
{
    let mut counts = Vec::with_capacity(groups.len());
    for group in groups {
        ctx.check()?;
        for row in &group.rows {
            tx.insert_row(ctx, &group.table, row)
                .map_err(|source| match source {
                    StoreError::Cancelled(reason) => SnapError::Cancelled(reason),
                    source => SnapError::RestoreRow {
                        group: group.name,
                        source,
                    },
                })?;
        }
        info!(group = group.name, rows = group.rows.len(), "restored");
        counts.push(GroupCount {
            name: group.name,
            rows: group.rows.len(),
        });
    }

    ctx.check()?;
    let repaired = repair.repair(ctx, tx).map_err(|err| match err {
        SnapError::Cancelled(reason) => SnapError::Cancelled(reason),
        err => SnapError::ConsistencyRepair(Box::new(err)),
    })?;
    debug!(repaired, "consistency repair finished");

    Ok(RestoreReport {
        dialect: M::DIALECT.as_str(),
        groups: counts,
        repaired,
    })
}
