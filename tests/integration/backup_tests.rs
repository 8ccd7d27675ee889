use idsnap::SnapError;
use idsnap::backup::{BackupOptions, Snapshot, backup, codec};
use idsnap::context::Context;
use idsnap::models::{CrdbModels, PostgresModels};
use idsnap::test_utils::fixtures;

use crate::fixture::{TestFixture, UntouchableStore};

#[test]
fn backup_file_store_matches_seed_for_both_dialects() {
    let crdb = fixtures::snapshot::<CrdbModels>();
    let fixture = TestFixture::new("backup-crdb", &crdb);
    let mut out = Vec::new();
    let report = backup(
        &Context::new(),
        "crdb",
        &mut fixture.source(),
        &mut out,
        BackupOptions::default(),
    )
    .unwrap();
    assert_eq!(report.dialect, "crdb");
    assert_eq!(report.total_rows(), crdb.total_rows());
    assert_eq!(codec::decode::<CrdbModels>(&out).unwrap(), crdb);

    let pg = fixtures::snapshot::<PostgresModels>();
    let fixture = TestFixture::new("backup-pg", &pg);
    let mut out = Vec::new();
    backup(
        &Context::new(),
        "postgres",
        &mut fixture.source(),
        &mut out,
        BackupOptions {
            consistent_read: false,
        },
    )
    .unwrap();
    assert_eq!(codec::decode::<PostgresModels>(&out).unwrap(), pg);
}

#[test]
fn artifact_lists_collections_in_order_with_tombstones() {
    let fixture = TestFixture::new("backup-shape", &fixtures::snapshot::<CrdbModels>());
    let mut out = Vec::new();
    backup(
        &Context::new(),
        "crdb",
        &mut fixture.source(),
        &mut out,
        BackupOptions::default(),
    )
    .unwrap();

    let text = String::from_utf8(out.clone()).unwrap();
    let positions: Vec<usize> = Snapshot::<CrdbModels>::default()
        .counts()
        .into_iter()
        .map(|(name, _)| text.find(&format!("\n  \"{name}\": ")).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json.as_object().unwrap().len(), 19);
    assert_eq!(json["application_types"][1]["id"], 2);
    assert!(json["application_types"][1]["deleted_at"].is_string());
    assert!(json["application_types"][0]["deleted_at"].is_null());
}

#[test]
fn unsupported_driver_never_touches_the_store() {
    let mut out = Vec::new();
    let err = backup(
        &Context::new(),
        "mysql",
        &mut UntouchableStore,
        &mut out,
        BackupOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, SnapError::UnsupportedDialect(d) if d == "mysql"));
    assert!(out.is_empty());
}
