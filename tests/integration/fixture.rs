use std::path::PathBuf;

use idsnap::backup::Snapshot;
use idsnap::context::Context;
use idsnap::models::{ModelSet, TableDef, Value};
use idsnap::storage::{Backend, RowSource, SqliteStore, SqliteTx, Store, StoreError};
use idsnap::test_utils::fixtures;
use tempfile::TempDir;

/// Two SQLite files in a private directory: a populated source and an empty
/// target with the schema applied.
pub struct TestFixture {
    pub temp_dir: TempDir,
    pub source_path: PathBuf,
    pub target_path: PathBuf,
}

impl TestFixture {
    pub fn new<M: ModelSet>(name: &str, snapshot: &Snapshot<M>) -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let source_path = temp_dir.path().join(format!("{name}-source.db"));
        let target_path = temp_dir.path().join(format!("{name}-target.db"));
        println!("[FIXTURE] {name}: {}", temp_dir.path().display());

        let mut source = SqliteStore::open(&source_path).expect("open source");
        fixtures::migrate::<M>(&mut source);
        fixtures::seed(&mut source, snapshot);

        let mut target = SqliteStore::open(&target_path).expect("open target");
        fixtures::migrate::<M>(&mut target);

        Self {
            temp_dir,
            source_path,
            target_path,
        }
    }

    pub fn source(&self) -> SqliteStore {
        SqliteStore::open(&self.source_path).expect("reopen source")
    }

    pub fn target(&self) -> SqliteStore {
        SqliteStore::open(&self.target_path).expect("reopen target")
    }
}

/// Store that panics if anything touches it.
pub struct UntouchableStore;

impl RowSource for UntouchableStore {
    fn fetch_rows(
        &mut self,
        _ctx: &Context,
        table: &TableDef,
    ) -> Result<Vec<Vec<Value>>, StoreError> {
        panic!("unexpected read of {}", table.name)
    }
}

impl Store for UntouchableStore {
    type Tx<'a> = SqliteTx<'a>;

    fn backend(&self) -> Backend {
        panic!("unexpected backend()")
    }

    fn begin(&mut self, _ctx: &Context) -> Result<SqliteTx<'_>, StoreError> {
        panic!("unexpected begin()")
    }

    fn begin_read(&mut self, _ctx: &Context) -> Result<SqliteTx<'_>, StoreError> {
        panic!("unexpected begin_read()")
    }

    fn apply_schema(&mut self, _ctx: &Context, _statements: &[String]) -> Result<(), StoreError> {
        panic!("unexpected apply_schema()")
    }
}

/// Every collection of `M` is empty in `store`.
pub fn assert_empty<M: ModelSet>(store: &mut impl Store) {
    for (name, rows) in fixtures::row_counts::<M>(store) {
        assert_eq!(rows, 0, "{name} should be empty");
    }
}
