//! Post-restore consistency repair.

use std::collections::HashSet;
use std::marker::PhantomData;

use chrono::Utc;
use tracing::debug;

use crate::context::Context;
use crate::error::{Result, SnapError};
use crate::models::{
    Entity, EntityId, ModelSet, NotificationPreference, NotificationType, User,
};
use crate::storage::{StoreError, Transaction, fetch_all, insert};

/// A fix-up run inside the restore transaction after every row is inserted.
/// An error rolls the whole restore back.
pub trait ConsistencyRepair<M: ModelSet> {
    /// Returns the number of rows added or changed.
    fn repair(&self, ctx: &Context, tx: &mut dyn Transaction) -> Result<usize>;
}

/// Gives every live user a preference row for every live notification type
/// that is enabled by default. Existing rows for the pair, tombstoned or not,
/// are left alone. Running it twice adds nothing the second time.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultNotificationPreferences<M> {
    _models: PhantomData<M>,
}

impl<M> DefaultNotificationPreferences<M> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            _models: PhantomData,
        }
    }
}

impl<M: ModelSet> ConsistencyRepair<M> for DefaultNotificationPreferences<M> {
    fn repair(&self, ctx: &Context, tx: &mut dyn Transaction) -> Result<usize> {
        let users: Vec<User<M::Id>> = fetch_all(tx, ctx).map_err(failed)?;
        let types: Vec<NotificationType<M::Id>> = fetch_all(tx, ctx).map_err(failed)?;
        let preferences: Vec<NotificationPreference<M::Id>> =
            fetch_all(tx, ctx).map_err(failed)?;

        let existing: HashSet<(&M::Id, &M::Id)> = preferences
            .iter()
            .map(|p| (&p.user_id, &p.notification_type_id))
            .collect();
        let defaults: Vec<&NotificationType<M::Id>> = types
            .iter()
            .filter(|t| t.deleted_at.is_none() && t.default_enabled)
            .collect();

        let now = Utc::now();
        let mut added = 0;
        for user in users.iter().filter(|u| u.deleted_at.is_none()) {
            for kind in &defaults {
                if existing.contains(&(&user.id, &kind.id)) {
                    continue;
                }
                let preference = NotificationPreference {
                    id: M::Id::generate(),
                    user_id: user.id.clone(),
                    notification_type_id: kind.id.clone(),
                    notification_target_id: None,
                    enabled: true,
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                };
                insert(tx, ctx, &preference).map_err(failed)?;
                added += 1;
            }
        }
        debug!(added, "default notification preferences repaired");
        Ok(added)
    }
}

fn failed(source: StoreError) -> SnapError {
    match source {
        StoreError::Cancelled(reason) => SnapError::Cancelled(reason),
        source => SnapError::RestoreRow {
            group: NotificationPreference::<i64>::TABLE,
            source,
        },
    }
}
