use idsnap::SnapError;
use idsnap::backup::{
    BackupOptions, ConsistencyRepair, DefaultNotificationPreferences, backup, codec, restore,
    restore_snapshot,
};
use idsnap::context::Context;
use idsnap::models::{CrdbModels, ModelSet, NotificationPreference, PostgresModels};
use idsnap::storage::{Transaction, insert};
use idsnap::test_utils::fixtures::{self, FixtureId, ts};

use crate::fixture::{TestFixture, UntouchableStore, assert_empty};

fn round_trip<M>(driver: &str)
where
    M: ModelSet,
    M::Id: FixtureId,
{
    let snapshot = fixtures::snapshot::<M>();
    let fixture = TestFixture::new(driver, &snapshot);
    let ctx = Context::new();

    let mut artifact = Vec::new();
    backup(
        &ctx,
        driver,
        &mut fixture.source(),
        &mut artifact,
        BackupOptions::default(),
    )
    .unwrap();

    let report = restore(&ctx, driver, &mut fixture.target(), artifact.as_slice()).unwrap();
    assert_eq!(report.dialect, M::DIALECT.as_str());
    assert_eq!(report.groups.len(), 19);
    assert_eq!(report.total_rows(), snapshot.total_rows());
    assert_eq!(report.repaired, 0);

    let mut second = Vec::new();
    backup(
        &ctx,
        driver,
        &mut fixture.target(),
        &mut second,
        BackupOptions::default(),
    )
    .unwrap();
    assert_eq!(codec::decode::<M>(&second).unwrap(), snapshot);
    assert_eq!(second, artifact);
}

#[test]
fn backup_then_restore_reproduces_every_row_crdb() {
    round_trip::<CrdbModels>("crdb");
}

#[test]
fn backup_then_restore_reproduces_every_row_postgres() {
    round_trip::<PostgresModels>("postgres");
}

#[test]
fn failing_row_rolls_back_the_whole_restore() {
    let mut snapshot = fixtures::snapshot::<CrdbModels>();
    // Applications are restored after application types, groups and users
    // have already been written in the same transaction.
    snapshot.applications[0].application_type_id = 9999;
    let fixture = TestFixture::new("fault", &fixtures::snapshot::<CrdbModels>());
    let mut target = fixture.target();

    let artifact = codec::to_bytes(&snapshot).unwrap();
    let err = restore(&Context::new(), "crdb", &mut target, artifact.as_slice()).unwrap_err();

    assert!(
        matches!(err, SnapError::RestoreRow { group: "applications", .. }),
        "got {err:?}"
    );
    assert_empty::<CrdbModels>(&mut target);
}

#[test]
fn restore_into_populated_database_conflicts_and_changes_nothing() {
    let snapshot = fixtures::snapshot::<PostgresModels>();
    let fixture = TestFixture::new("populated", &snapshot);
    let mut source = fixture.source();
    let before = fixtures::row_counts::<PostgresModels>(&mut source);

    let artifact = codec::to_bytes(&snapshot).unwrap();
    let err = restore(&Context::new(), "postgres", &mut source, artifact.as_slice()).unwrap_err();

    assert!(matches!(err, SnapError::RestoreRow { group: "application_types", .. }));
    assert_eq!(fixtures::row_counts::<PostgresModels>(&mut source), before);
}

#[test]
fn missing_default_preferences_are_added_on_restore() {
    let mut snapshot = fixtures::snapshot::<CrdbModels>();
    // Drop Ada's access_request preference; Grace keeps her tombstoned one.
    snapshot.notification_preferences.remove(0);
    let fixture = TestFixture::new("repair", &fixtures::snapshot::<CrdbModels>());
    let mut target = fixture.target();

    let artifact = codec::to_bytes(&snapshot).unwrap();
    let report = restore(&Context::new(), "crdb", &mut target, artifact.as_slice()).unwrap();
    assert_eq!(report.repaired, 1);

    let restored = idsnap::backup::extract::<CrdbModels, _>(&Context::new(), &mut target, true)
        .unwrap()
        .notification_preferences;
    assert_eq!(restored.len(), snapshot.notification_preferences.len() + 1);
    let added = restored
        .iter()
        .find(|p| p.user_id == 201 && p.notification_type_id == 501)
        .unwrap();
    assert!(added.enabled);
    assert!(added.deleted_at.is_none());
    assert!(added.notification_target_id.is_none());
}

/// Inserts a preference pointing at a user that does not exist.
struct BrokenRepair;

impl<M: ModelSet> ConsistencyRepair<M> for BrokenRepair
where
    M::Id: FixtureId,
{
    fn repair(&self, ctx: &Context, tx: &mut dyn Transaction) -> idsnap::Result<usize> {
        let row = NotificationPreference::<M::Id> {
            id: M::Id::nth(9001),
            user_id: M::Id::nth(9999),
            notification_type_id: M::Id::nth(501),
            notification_target_id: None,
            enabled: true,
            created_at: ts(0),
            updated_at: ts(0),
            deleted_at: None,
        };
        insert(tx, ctx, &row).map_err(|source| SnapError::RestoreRow {
            group: "notification_preferences",
            source,
        })?;
        Ok(1)
    }
}

#[test]
fn failing_repair_rolls_back_every_inserted_row() {
    let snapshot = fixtures::snapshot::<CrdbModels>();
    let fixture = TestFixture::new("broken-repair", &snapshot);
    let mut target = fixture.target();

    let err = restore_snapshot(&Context::new(), &mut target, &snapshot, &BrokenRepair).unwrap_err();

    let SnapError::ConsistencyRepair(inner) = err else {
        panic!("expected a repair failure, got {err:?}");
    };
    assert!(matches!(*inner, SnapError::RestoreRow { group: "notification_preferences", .. }));
    assert_empty::<CrdbModels>(&mut target);
}

/// Cancels the restore from inside the transaction.
struct CancellingRepair;

impl<M: ModelSet> ConsistencyRepair<M> for CancellingRepair {
    fn repair(&self, ctx: &Context, _tx: &mut dyn Transaction) -> idsnap::Result<usize> {
        ctx.cancel();
        Ok(0)
    }
}

#[test]
fn cancellation_before_commit_leaves_nothing_behind() {
    let snapshot = fixtures::snapshot::<PostgresModels>();
    let fixture = TestFixture::new("cancel", &snapshot);
    let mut target = fixture.target();

    let err = restore_snapshot(&Context::new(), &mut target, &snapshot, &CancellingRepair)
        .unwrap_err();
    assert!(matches!(err, SnapError::Cancelled(_)), "got {err:?}");
    assert_empty::<PostgresModels>(&mut target);

    let ctx = Context::new();
    ctx.cancel();
    let repair = DefaultNotificationPreferences::<PostgresModels>::new();
    let err = restore_snapshot(&ctx, &mut target, &snapshot, &repair).unwrap_err();
    assert!(matches!(err, SnapError::Cancelled(_)));
    assert_empty::<PostgresModels>(&mut target);
}

#[test]
fn unsupported_driver_never_touches_the_store() {
    let artifact = codec::to_bytes(&fixtures::snapshot::<CrdbModels>()).unwrap();
    let err = restore(&Context::new(), "mysql", &mut UntouchableStore, artifact.as_slice())
        .unwrap_err();
    assert!(matches!(err, SnapError::UnsupportedDialect(d) if d == "mysql"));
}

#[test]
fn crdb_artifact_is_rejected_by_postgres_restore() {
    let artifact = codec::to_bytes(&fixtures::snapshot::<CrdbModels>()).unwrap();
    let fixture = TestFixture::new("mismatch", &fixtures::snapshot::<PostgresModels>());
    let mut target = fixture.target();

    let err = restore(&Context::new(), "postgres", &mut target, artifact.as_slice()).unwrap_err();
    assert!(matches!(err, SnapError::Serialization(_)), "got {err:?}");
    assert_empty::<PostgresModels>(&mut target);
}
