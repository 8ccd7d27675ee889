//! PostgreSQL wire backend (CockroachDB and PostgreSQL)
//!
//! sqlx is async; the engine is not. Each [`PgStore`] owns a current-thread
//! runtime and blocks on it, racing every database future against
//! [`Context::done`]. Dropping the losing future abandons the statement and
//! the open transaction rolls back when it is dropped.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Connection, PgConnection, Postgres, Row};
use tokio::runtime::Runtime;
use tracing::debug;
use uuid::Uuid;

use crate::context::Context;
use crate::models::{ColumnType, TableDef, Value};

use super::{Backend, RowSource, Store, StoreError, Transaction, insert_sql, select_sql};

/// Budget for COMMIT/ROLLBACK, which must not be cut short by a cancelled
/// caller context.
const FINISH_TIMEOUT: Duration = Duration::from_secs(30);

const READ_ONLY_SNAPSHOT: &str = "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY";

pub struct PgStore {
    rt: Runtime,
    conn: PgConnection,
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore").finish_non_exhaustive()
    }
}

impl PgStore {
    /// Connect to `url` (`postgres://` or `postgresql://`).
    pub fn connect(ctx: &Context, url: &str) -> Result<Self, StoreError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let conn = block_on(&rt, ctx, PgConnection::connect(url))?;
        debug!("postgres connection established");
        Ok(Self { rt, conn })
    }
}

impl RowSource for PgStore {
    fn fetch_rows(
        &mut self,
        ctx: &Context,
        table: &TableDef,
    ) -> Result<Vec<Vec<Value>>, StoreError> {
        fetch_rows(&self.rt, &mut self.conn, ctx, table)
    }
}

impl Store for PgStore {
    type Tx<'a> = PgTx<'a>;

    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    fn begin(&mut self, ctx: &Context) -> Result<PgTx<'_>, StoreError> {
        let Self { rt, conn } = self;
        let tx = block_on(rt, ctx, conn.begin())?;
        debug!("postgres transaction started");
        Ok(PgTx { rt, tx })
    }

    fn begin_read(&mut self, ctx: &Context) -> Result<PgTx<'_>, StoreError> {
        let Self { rt, conn } = self;
        let mut tx = block_on(rt, ctx, conn.begin())?;
        block_on(rt, ctx, sqlx::query(READ_ONLY_SNAPSHOT).execute(&mut *tx))?;
        debug!("postgres read-only transaction started");
        Ok(PgTx { rt, tx })
    }

    fn apply_schema(&mut self, ctx: &Context, statements: &[String]) -> Result<(), StoreError> {
        for sql in statements {
            block_on(
                &self.rt,
                ctx,
                sqlx::query(sql.as_str()).execute(&mut self.conn),
            )?;
        }
        Ok(())
    }
}

/// An open PostgreSQL transaction. Rolls back on drop.
pub struct PgTx<'a> {
    rt: &'a Runtime,
    tx: sqlx::Transaction<'a, Postgres>,
}

impl RowSource for PgTx<'_> {
    fn fetch_rows(
        &mut self,
        ctx: &Context,
        table: &TableDef,
    ) -> Result<Vec<Vec<Value>>, StoreError> {
        fetch_rows(self.rt, &mut self.tx, ctx, table)
    }
}

impl Transaction for PgTx<'_> {
    fn insert_row(
        &mut self,
        ctx: &Context,
        table: &TableDef,
        values: &[Value],
    ) -> Result<(), StoreError> {
        let sql = insert_sql(table, '$');
        let query = values.iter().fold(sqlx::query(&sql), bind);
        block_on(self.rt, ctx, query.execute(&mut *self.tx))?;
        Ok(())
    }

    fn commit(self) -> Result<(), StoreError> {
        let ctx = Context::new().with_timeout(FINISH_TIMEOUT);
        block_on(self.rt, &ctx, self.tx.commit())?;
        debug!("postgres transaction committed");
        Ok(())
    }

    fn rollback(self) -> Result<(), StoreError> {
        let ctx = Context::new().with_timeout(FINISH_TIMEOUT);
        block_on(self.rt, &ctx, self.tx.rollback())?;
        debug!("postgres transaction rolled back");
        Ok(())
    }
}

/// Drive `fut` to completion unless `ctx` finishes first.
fn block_on<T, F>(rt: &Runtime, ctx: &Context, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    if let Some(reason) = ctx.done_reason() {
        return Err(StoreError::Cancelled(reason.to_string()));
    }
    rt.block_on(async {
        tokio::select! {
            biased;
            () = ctx.done() => Err(StoreError::Cancelled(
                ctx.done_reason().unwrap_or("cancelled").to_string(),
            )),
            result = fut => result.map_err(StoreError::from),
        }
    })
}

fn fetch_rows(
    rt: &Runtime,
    conn: &mut PgConnection,
    ctx: &Context,
    table: &TableDef,
) -> Result<Vec<Vec<Value>>, StoreError> {
    let sql = select_sql(table);
    let rows = block_on(rt, ctx, sqlx::query(&sql).fetch_all(conn))?;
    rows.iter().map(|row| decode_row(table, row)).collect()
}

fn decode_row(table: &TableDef, row: &PgRow) -> Result<Vec<Value>, StoreError> {
    table
        .columns
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            decode(row, idx, column.ty).map_err(|err| StoreError::Decode {
                table: table.name,
                column: column.name.to_string(),
                reason: err.to_string(),
            })
        })
        .collect()
}

fn decode(row: &PgRow, idx: usize, ty: ColumnType) -> Result<Value, sqlx::Error> {
    let value = match ty {
        ColumnType::Bool => row.try_get::<Option<bool>, _>(idx)?.map(Value::Bool),
        ColumnType::Int => row.try_get::<Option<i64>, _>(idx)?.map(Value::Int),
        ColumnType::Text => row.try_get::<Option<String>, _>(idx)?.map(Value::Text),
        ColumnType::Uuid => row.try_get::<Option<Uuid>, _>(idx)?.map(Value::Uuid),
        ColumnType::Timestamp => row
            .try_get::<Option<DateTime<Utc>>, _>(idx)?
            .map(Value::Timestamp),
        ColumnType::Json => row.try_get::<Option<JsonValue>, _>(idx)?.map(Value::Json),
    };
    Ok(value.unwrap_or(Value::Null(ty)))
}

/// Nulls are bound with their column type so the server can infer the
/// parameter type.
fn bind<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &'q Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null(ColumnType::Bool) => query.bind(None::<bool>),
        Value::Null(ColumnType::Int) => query.bind(None::<i64>),
        Value::Null(ColumnType::Text) => query.bind(None::<String>),
        Value::Null(ColumnType::Uuid) => query.bind(None::<Uuid>),
        Value::Null(ColumnType::Timestamp) => query.bind(None::<DateTime<Utc>>),
        Value::Null(ColumnType::Json) => query.bind(None::<JsonValue>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(n) => query.bind(*n),
        Value::Text(s) => query.bind(s.as_str()),
        Value::Uuid(id) => query.bind(*id),
        Value::Timestamp(ts) => query.bind(*ts),
        Value::Json(json) => query.bind(sqlx::types::Json(json)),
    }
}
