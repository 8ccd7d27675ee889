//! SQLite backend

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{Connection, OpenFlags, ToSql, TransactionBehavior, params_from_iter};
use tracing::debug;
use uuid::Uuid;

use crate::context::Context;
use crate::models::{Column, ColumnType, TableDef, Value};

use super::{Backend, RowSource, Store, StoreError, Transaction, insert_sql, select_sql};

/// VM instructions between cancellation checks.
const PROGRESS_INTERVAL: i32 = 1_000;

/// SQLite database handle. Foreign keys are enforced.
pub struct SqliteStore {
    conn: Connection,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.conn.path())
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;
        Self::configure(conn)
    }

    /// Open an existing database file read-only. Nothing is created when the
    /// file is missing.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::configure(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::configure(Connection::open_in_memory()?)
    }

    fn configure(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Ok(Self { conn })
    }

    /// Get a reference to the connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl RowSource for SqliteStore {
    fn fetch_rows(
        &mut self,
        ctx: &Context,
        table: &TableDef,
    ) -> Result<Vec<Vec<Value>>, StoreError> {
        fetch_rows(&self.conn, ctx, table)
    }
}

impl Store for SqliteStore {
    type Tx<'a> = SqliteTx<'a>;

    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn begin(&mut self, ctx: &Context) -> Result<SqliteTx<'_>, StoreError> {
        begin(&mut self.conn, ctx, TransactionBehavior::Immediate)
    }

    fn begin_read(&mut self, ctx: &Context) -> Result<SqliteTx<'_>, StoreError> {
        begin(&mut self.conn, ctx, TransactionBehavior::Deferred)
    }

    fn apply_schema(&mut self, ctx: &Context, statements: &[String]) -> Result<(), StoreError> {
        guard(&self.conn, ctx);
        for sql in statements {
            self.conn
                .execute_batch(sql)
                .map_err(|err| interrupted(ctx, err))?;
        }
        clear_guard(&self.conn);
        Ok(())
    }
}

/// An open SQLite transaction. Rolls back on drop.
pub struct SqliteTx<'c> {
    tx: rusqlite::Transaction<'c>,
}

impl RowSource for SqliteTx<'_> {
    fn fetch_rows(
        &mut self,
        ctx: &Context,
        table: &TableDef,
    ) -> Result<Vec<Vec<Value>>, StoreError> {
        fetch_rows(&self.tx, ctx, table)
    }
}

impl Transaction for SqliteTx<'_> {
    fn insert_row(
        &mut self,
        ctx: &Context,
        table: &TableDef,
        values: &[Value],
    ) -> Result<(), StoreError> {
        guard(&self.tx, ctx);
        let mut stmt = self.tx.prepare_cached(&insert_sql(table, '?'))?;
        stmt.execute(params_from_iter(values.iter()))
            .map_err(|err| interrupted(ctx, err))?;
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        clear_guard(&self.tx);
        self.tx.commit()?;
        debug!("sqlite transaction committed");
        Ok(())
    }

    fn rollback(self) -> Result<(), StoreError> {
        clear_guard(&self.tx);
        // An interrupted write has already rolled the transaction back.
        if self.tx.is_autocommit() {
            debug!("sqlite transaction already rolled back");
            return Ok(());
        }
        self.tx.rollback()?;
        debug!("sqlite transaction rolled back");
        Ok(())
    }
}

fn begin<'c>(
    conn: &'c mut Connection,
    ctx: &Context,
    behavior: TransactionBehavior,
) -> Result<SqliteTx<'c>, StoreError> {
    if let Some(reason) = ctx.done_reason() {
        return Err(StoreError::Cancelled(reason.to_string()));
    }
    let tx = conn.transaction_with_behavior(behavior)?;
    // rusqlite 0.32 (pinned for sqlx's libsqlite3-sys) lacks Debug here.
    let behavior = match behavior {
        TransactionBehavior::Deferred => "Deferred",
        TransactionBehavior::Immediate => "Immediate",
        TransactionBehavior::Exclusive => "Exclusive",
        _ => "Other",
    };
    debug!(behavior, "sqlite transaction started");
    Ok(SqliteTx { tx })
}

/// Interrupt in-flight statements on `conn` once `ctx` is done.
fn guard(conn: &Connection, ctx: &Context) {
    let probe = ctx.probe();
    conn.progress_handler(PROGRESS_INTERVAL, Some(move || probe.is_done()));
}

fn clear_guard(conn: &Connection) {
    conn.progress_handler(0, None::<fn() -> bool>);
}

/// An error raised while `ctx` is done is reported as a cancellation.
fn interrupted(ctx: &Context, err: rusqlite::Error) -> StoreError {
    match ctx.done_reason() {
        Some(reason) => StoreError::Cancelled(reason.to_string()),
        None => StoreError::Sqlite(err),
    }
}

fn fetch_rows(
    conn: &Connection,
    ctx: &Context,
    table: &TableDef,
) -> Result<Vec<Vec<Value>>, StoreError> {
    if let Some(reason) = ctx.done_reason() {
        return Err(StoreError::Cancelled(reason.to_string()));
    }
    guard(conn, ctx);
    let mut stmt = conn.prepare_cached(&select_sql(table))?;
    let mut rows = stmt.query([]).map_err(|err| interrupted(ctx, err))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|err| interrupted(ctx, err))? {
        let mut values = Vec::with_capacity(table.columns.len());
        for (idx, column) in table.columns.iter().enumerate() {
            values.push(decode(table, column, row.get_ref(idx)?)?);
        }
        out.push(values);
    }
    Ok(out)
}

fn decode(table: &TableDef, column: &Column, raw: ValueRef<'_>) -> Result<Value, StoreError> {
    let fail = |reason: String| StoreError::Decode {
        table: table.name,
        column: column.name.to_string(),
        reason,
    };
    let text = |raw: ValueRef<'_>| -> Result<String, StoreError> {
        raw.as_str()
            .map(str::to_string)
            .map_err(|err| fail(err.to_string()))
    };

    if matches!(raw, ValueRef::Null) {
        return Ok(Value::Null(column.ty));
    }
    let value = match column.ty {
        ColumnType::Bool => Value::Bool(raw.as_i64().map_err(|err| fail(err.to_string()))? != 0),
        ColumnType::Int => Value::Int(raw.as_i64().map_err(|err| fail(err.to_string()))?),
        ColumnType::Text => Value::Text(text(raw)?),
        ColumnType::Uuid => Value::Uuid(
            Uuid::parse_str(&text(raw)?).map_err(|err| fail(err.to_string()))?,
        ),
        ColumnType::Timestamp => Value::Timestamp(
            DateTime::parse_from_rfc3339(&text(raw)?)
                .map_err(|err| fail(err.to_string()))?
                .with_timezone(&Utc),
        ),
        ColumnType::Json => Value::Json(
            serde_json::from_str(&text(raw)?).map_err(|err| fail(err.to_string()))?,
        ),
    };
    Ok(value)
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Self::Null(_) => SqlValue::Null,
            Self::Bool(b) => SqlValue::Integer(i64::from(*b)),
            Self::Int(n) => SqlValue::Integer(*n),
            Self::Text(s) => return Ok(ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes()))),
            Self::Uuid(id) => SqlValue::Text(id.hyphenated().to_string()),
            // Full precision so timestamps survive a round trip unchanged.
            Self::Timestamp(ts) => SqlValue::Text(ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Json(json) => SqlValue::Text(json.to_string()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}
