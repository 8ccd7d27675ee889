//! Storage layer for idsnap
//!
//! The backup engine talks to the database only through [`Store`] and
//! [`Transaction`]. Two backends implement them: [`PgStore`] for the
//! PostgreSQL wire protocol (CockroachDB and PostgreSQL) and [`SqliteStore`]
//! for local files.

pub mod postgres;
pub mod schema;
pub mod sqlite;

use thiserror::Error;

use crate::context::Context;
use crate::models::{Entity, TableDef, Value};

pub use postgres::{PgStore, PgTx};
pub use sqlite::{SqliteStore, SqliteTx};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("Decoding {table}.{column}: {reason}")]
    Decode {
        table: &'static str,
        column: String,
        reason: String,
    },

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Unsupported database URL: {0}")]
    UnsupportedUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// SQL flavour a store speaks, for DDL rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// PostgreSQL wire protocol, CockroachDB or PostgreSQL.
    Postgres,
    Sqlite,
}

/// Anything rows can be read from: a store or an open transaction.
pub trait RowSource {
    /// All rows of `table`, every column of `table.columns` in order, sorted
    /// by primary key. Soft-deleted rows are included.
    fn fetch_rows(&mut self, ctx: &Context, table: &TableDef)
    -> Result<Vec<Vec<Value>>, StoreError>;
}

pub trait Transaction: RowSource {
    /// Plain INSERT of one row. Conflicts are errors.
    fn insert_row(
        &mut self,
        ctx: &Context,
        table: &TableDef,
        values: &[Value],
    ) -> Result<(), StoreError>;

    fn commit(self) -> Result<(), StoreError>
    where
        Self: Sized;

    fn rollback(self) -> Result<(), StoreError>
    where
        Self: Sized;
}

/// A database handle.
///
/// Dropping an uncommitted transaction rolls it back.
pub trait Store: RowSource {
    type Tx<'a>: Transaction
    where
        Self: 'a;

    fn backend(&self) -> Backend;

    /// Begin a read-write transaction.
    fn begin(&mut self, ctx: &Context) -> Result<Self::Tx<'_>, StoreError>;

    /// Begin a read-only transaction with a stable view across tables.
    fn begin_read(&mut self, ctx: &Context) -> Result<Self::Tx<'_>, StoreError>;

    /// Execute DDL statements in order.
    fn apply_schema(&mut self, ctx: &Context, statements: &[String]) -> Result<(), StoreError>;
}

/// Read every row of entity `E`.
pub fn fetch_all<E: Entity>(
    source: &mut (impl RowSource + ?Sized),
    ctx: &Context,
) -> Result<Vec<E>, StoreError> {
    let table = E::table();
    source
        .fetch_rows(ctx, &table)?
        .into_iter()
        .map(|values| {
            E::from_values(values).map_err(|err| StoreError::Decode {
                table: E::TABLE,
                column: "*".to_string(),
                reason: err.to_string(),
            })
        })
        .collect()
}

/// Insert one entity row.
pub fn insert<E: Entity>(
    tx: &mut (impl Transaction + ?Sized),
    ctx: &Context,
    row: &E,
) -> Result<(), StoreError> {
    tx.insert_row(ctx, &E::table(), &row.to_values())
}

/// Placeholder list `$1, $2, ...` or `?1, ?2, ...`.
pub(crate) fn placeholders(prefix: char, count: usize) -> String {
    (1..=count)
        .map(|i| format!("{prefix}{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn select_sql(table: &TableDef) -> String {
    format!(
        "SELECT {} FROM {} ORDER BY id",
        table.column_list(),
        table.name
    )
}

pub(crate) fn insert_sql(table: &TableDef, prefix: char) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name,
        table.column_list(),
        placeholders(prefix, table.columns.len())
    )
}

/// Either backend, chosen from a database URL.
pub enum AnyStore {
    Postgres(PgStore),
    Sqlite(SqliteStore),
}

pub enum AnyTx<'a> {
    Postgres(PgTx<'a>),
    Sqlite(SqliteTx<'a>),
}

impl std::fmt::Debug for AnyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres(_) => f.write_str("AnyStore::Postgres"),
            Self::Sqlite(_) => f.write_str("AnyStore::Sqlite"),
        }
    }
}

/// How a store will be used. Read-only SQLite opens never create files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

/// Open a store from a URL.
///
/// - `postgres://…` / `postgresql://…`: PostgreSQL wire protocol
/// - `sqlite::memory:`: in-memory SQLite
/// - `sqlite://<path>`, `sqlite:<path>` or a bare path: SQLite file
pub fn open_store(ctx: &Context, url: &str, access: Access) -> Result<AnyStore, StoreError> {
    if url.starts_with("postgres://") || url.starts_with("postgresql://") {
        return Ok(AnyStore::Postgres(PgStore::connect(ctx, url)?));
    }
    if url == "sqlite::memory:" {
        return Ok(AnyStore::Sqlite(SqliteStore::open_in_memory()?));
    }
    if url.contains("://") && !url.starts_with("sqlite://") {
        return Err(StoreError::UnsupportedUrl(url.to_string()));
    }
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let store = match access {
        Access::ReadOnly => SqliteStore::open_read_only(path)?,
        Access::ReadWrite => SqliteStore::open(path)?,
    };
    Ok(AnyStore::Sqlite(store))
}

impl RowSource for AnyStore {
    fn fetch_rows(
        &mut self,
        ctx: &Context,
        table: &TableDef,
    ) -> Result<Vec<Vec<Value>>, StoreError> {
        match self {
            Self::Postgres(store) => store.fetch_rows(ctx, table),
            Self::Sqlite(store) => store.fetch_rows(ctx, table),
        }
    }
}

impl Store for AnyStore {
    type Tx<'a> = AnyTx<'a>;

    fn backend(&self) -> Backend {
        match self {
            Self::Postgres(store) => store.backend(),
            Self::Sqlite(store) => store.backend(),
        }
    }

    fn begin(&mut self, ctx: &Context) -> Result<AnyTx<'_>, StoreError> {
        match self {
            Self::Postgres(store) => store.begin(ctx).map(AnyTx::Postgres),
            Self::Sqlite(store) => store.begin(ctx).map(AnyTx::Sqlite),
        }
    }

    fn begin_read(&mut self, ctx: &Context) -> Result<AnyTx<'_>, StoreError> {
        match self {
            Self::Postgres(store) => store.begin_read(ctx).map(AnyTx::Postgres),
            Self::Sqlite(store) => store.begin_read(ctx).map(AnyTx::Sqlite),
        }
    }

    fn apply_schema(&mut self, ctx: &Context, statements: &[String]) -> Result<(), StoreError> {
        match self {
            Self::Postgres(store) => store.apply_schema(ctx, statements),
            Self::Sqlite(store) => store.apply_schema(ctx, statements),
        }
    }
}

impl RowSource for AnyTx<'_> {
    fn fetch_rows(
        &mut self,
        ctx: &Context,
        table: &TableDef,
    ) -> Result<Vec<Vec<Value>>, StoreError> {
        match self {
            Self::Postgres(tx) => tx.fetch_rows(ctx, table),
            Self::Sqlite(tx) => tx.fetch_rows(ctx, table),
        }
    }
}

impl Transaction for AnyTx<'_> {
    fn insert_row(
        &mut self,
        ctx: &Context,
        table: &TableDef,
        values: &[Value],
    ) -> Result<(), StoreError> {
        match self {
            Self::Postgres(tx) => tx.insert_row(ctx, table, values),
            Self::Sqlite(tx) => tx.insert_row(ctx, table, values),
        }
    }

    fn commit(self) -> Result<(), StoreError> {
        match self {
            Self::Postgres(tx) => tx.commit(),
            Self::Sqlite(tx) => tx.commit(),
        }
    }

    fn rollback(self) -> Result<(), StoreError> {
        match self {
            Self::Postgres(tx) => tx.rollback(),
            Self::Sqlite(tx) => tx.rollback(),
        }
    }
}
