//! Error handling for idsnap.
//!
//! - [`SnapError`]: the error for every backup/restore operation
//! - [`ErrorCode`]: stable codes for machine parsing (`--robot` output)
//! - [`StructuredError`]: serializable error report built from a [`SnapError`]

mod codes;

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use codes::ErrorCode;

use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum SnapError {
    #[error("Unsupported dialect: {0:?} (expected \"crdb\" or \"postgres\")")]
    UnsupportedDialect(String),

    #[error("Extracting {kind} failed: {source}")]
    Extraction {
        kind: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Cyclic approver chain detected: {}", .cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Restoring {group} failed: {source}")]
    RestoreRow {
        group: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("Consistency repair failed: {0}")]
    ConsistencyRepair(#[source] Box<SnapError>),

    #[error("Transaction failed: {0}")]
    Transaction(#[source] StoreError),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Schema migration failed: {0}")]
    Migration(#[source] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Database error: {0}")]
    Database(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing required config: {0}")]
    MissingConfig(String),
}

impl SnapError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnsupportedDialect(_) => ErrorCode::UnsupportedDialect,
            Self::Extraction { .. } => ErrorCode::ExtractionFailed,
            Self::CycleDetected { .. } => ErrorCode::CycleDetected,
            Self::Serialization(_) => ErrorCode::SerializationError,
            Self::RestoreRow { .. } => ErrorCode::RestoreRowFailed,
            Self::ConsistencyRepair(_) => ErrorCode::ConsistencyRepairFailed,
            Self::Transaction(_) => ErrorCode::TransactionFailed,
            Self::Cancelled(_) => ErrorCode::Cancelled,
            Self::Migration(_) => ErrorCode::MigrationFailed,
            Self::Io(_) => ErrorCode::IoError,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Config(_) => ErrorCode::ConfigInvalid,
            Self::MissingConfig(_) => ErrorCode::ConfigMissingRequired,
        }
    }

    /// Context for this error as JSON.
    #[must_use]
    pub fn context(&self) -> Option<Value> {
        match self {
            Self::UnsupportedDialect(driver) => Some(serde_json::json!({ "driver": driver })),
            Self::Extraction { kind, .. } => Some(serde_json::json!({ "kind": kind })),
            Self::CycleDetected { cycle } => Some(serde_json::json!({ "cycle": cycle })),
            Self::RestoreRow { group, .. } => Some(serde_json::json!({ "group": group })),
            Self::MissingConfig(key) => Some(serde_json::json!({ "config_key": key })),
            _ => None,
        }
    }

    #[must_use]
    pub fn to_structured(&self) -> StructuredError {
        StructuredError::from_snap_error(self)
    }
}

/// A structured error with machine-readable code and context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    pub error: bool,

    /// The error code (e.g., "RESTORE_ROW_FAILED")
    pub code: ErrorCode,

    /// The numeric error code (e.g., 401)
    pub numeric_code: u16,

    pub message: String,

    pub suggestion: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,

    /// Error category (e.g., "restore", "config")
    pub category: String,
}

impl StructuredError {
    #[must_use]
    pub fn from_snap_error(err: &SnapError) -> Self {
        let code = err.code();
        Self {
            error: true,
            code,
            numeric_code: code.numeric(),
            message: err.to_string(),
            suggestion: code.suggestion().to_string(),
            context: err.context(),
            category: code.category().to_string(),
        }
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl From<&SnapError> for StructuredError {
    fn from(err: &SnapError) -> Self {
        Self::from_snap_error(err)
    }
}

pub type Result<T> = std::result::Result<T, SnapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_path() {
        let err = SnapError::CycleDetected {
            cycle: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Cyclic approver chain detected: a -> b -> a");
        assert_eq!(err.code(), ErrorCode::CycleDetected);
    }

    #[test]
    fn restore_row_error_names_the_group() {
        let err = SnapError::RestoreRow {
            group: "applications",
            source: StoreError::Cancelled("deadline exceeded".into()),
        };
        assert!(err.to_string().starts_with("Restoring applications failed"));
        let structured = err.to_structured();
        assert_eq!(structured.code, ErrorCode::RestoreRowFailed);
        assert_eq!(structured.numeric_code, 401);
        assert_eq!(structured.context.unwrap()["group"], "applications");
        assert_eq!(structured.category, "restore");
    }

    #[test]
    fn structured_error_serializes_screaming_snake_case() {
        let err = SnapError::UnsupportedDialect("mysql".into());
        let json = serde_json::to_value(err.to_structured()).unwrap();
        assert_eq!(json["error"], true);
        assert_eq!(json["code"], "UNSUPPORTED_DIALECT");
        assert_eq!(json["numeric_code"], 101);
        assert_eq!(json["context"]["driver"], "mysql");
    }
}
