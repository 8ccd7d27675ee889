//! Dialect resolution and the per-dialect model sets.

use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::{Result, SnapError};

use super::value::SqlType;

/// Supported database dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// CockroachDB.
    Crdb,
    Postgres,
}

impl Dialect {
    pub const ALL: [Self; 2] = [Self::Crdb, Self::Postgres];

    /// Resolve a driver identifier. Only the exact lowercase names are accepted.
    pub fn resolve(driver: &str) -> Result<Self> {
        match driver {
            "crdb" => Ok(Self::Crdb),
            "postgres" => Ok(Self::Postgres),
            other => Err(SnapError::UnsupportedDialect(other.to_string())),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Crdb => "crdb",
            Self::Postgres => "postgres",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = SnapError;

    fn from_str(s: &str) -> Result<Self> {
        Self::resolve(s)
    }
}

/// Primary key type of a model set.
pub trait EntityId:
    SqlType
    + Clone
    + Eq
    + Hash
    + Ord
    + fmt::Debug
    + fmt::Display
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Mint a fresh identifier for rows created during restore.
    fn generate() -> Self;
}

impl EntityId for i64 {
    /// Same layout as CockroachDB's `unique_rowid()`: a 10µs timestamp in the
    /// high bits and 15 low bits of entropy.
    fn generate() -> Self {
        let ticks = Utc::now().timestamp_micros() / 10;
        let low = i64::from(rand::random::<u16>() & 0x7fff);
        (ticks << 15) | low
    }
}

impl EntityId for Uuid {
    fn generate() -> Self {
        Uuid::new_v4()
    }
}

/// The entity row family for one dialect.
pub trait ModelSet: Clone + fmt::Debug + PartialEq + Default + Send + Sync + 'static {
    type Id: EntityId;

    const DIALECT: Dialect;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrdbModels;

impl ModelSet for CrdbModels {
    type Id = i64;

    const DIALECT: Dialect = Dialect::Crdb;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PostgresModels;

impl ModelSet for PostgresModels {
    type Id = Uuid;

    const DIALECT: Dialect = Dialect::Postgres;
}

/// Runs `$body` with `$models` bound to the model set type of `$dialect`.
#[macro_export]
macro_rules! with_models {
    ($dialect:expr, $models:ident => $body:expr) => {
        match $dialect {
            $crate::models::Dialect::Crdb => {
                type $models = $crate::models::CrdbModels;
                $body
            }
            $crate::models::Dialect::Postgres => {
                type $models = $crate::models::PostgresModels;
                $body
            }
        }
    };
}
