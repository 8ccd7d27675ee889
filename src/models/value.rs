//! Dialect-neutral SQL values.
//!
//! Every entity column is carried through the storage backends as a [`Value`].
//! Nulls keep their column type so that backends with strict parameter typing
//! (the PostgreSQL wire protocol) can bind them correctly.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Bool,
    Int,
    Text,
    Uuid,
    Timestamp,
    Json,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "int"),
            Self::Text => write!(f, "text"),
            Self::Uuid => write!(f, "uuid"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null(ColumnType),
    Bool(bool),
    Int(i64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Json(JsonValue),
}

impl Value {
    /// The column type this value belongs to.
    #[must_use]
    pub const fn column_type(&self) -> ColumnType {
        match self {
            Self::Null(ty) => *ty,
            Self::Bool(_) => ColumnType::Bool,
            Self::Int(_) => ColumnType::Int,
            Self::Text(_) => ColumnType::Text,
            Self::Uuid(_) => ColumnType::Uuid,
            Self::Timestamp(_) => ColumnType::Timestamp,
            Self::Json(_) => ColumnType::Json,
        }
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: ColumnType,
        found: ColumnType,
    },

    #[error("unexpected NULL in non-nullable {0} column")]
    UnexpectedNull(ColumnType),

    #[error("expected {expected} columns, found {found}")]
    Arity { expected: usize, found: usize },
}

/// Maps a Rust field type onto a column type.
pub trait SqlType: Sized {
    const TYPE: ColumnType;
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, ValueError>;
}

fn mismatch<T>(expected: ColumnType, found: &Value) -> Result<T, ValueError> {
    match found {
        Value::Null(_) => Err(ValueError::UnexpectedNull(expected)),
        other => Err(ValueError::TypeMismatch {
            expected,
            found: other.column_type(),
        }),
    }
}

macro_rules! sql_type {
    ($ty:ty, $column:ident, $variant:ident) => {
        impl SqlType for $ty {
            const TYPE: ColumnType = ColumnType::$column;

            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }

            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => mismatch(Self::TYPE, &other),
                }
            }
        }
    };
}

sql_type!(bool, Bool, Bool);
sql_type!(i64, Int, Int);
sql_type!(String, Text, Text);
sql_type!(Uuid, Uuid, Uuid);
sql_type!(DateTime<Utc>, Timestamp, Timestamp);
sql_type!(JsonValue, Json, Json);

impl<T: SqlType> SqlType for Option<T> {
    const TYPE: ColumnType = T::TYPE;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null(T::TYPE), T::to_value)
    }

    fn from_value(value: Value) -> Result<Self, ValueError> {
        match value {
            Value::Null(_) => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
