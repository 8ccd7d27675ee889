//! Standardized error codes for machine-parseable output.
//!
//! Error codes follow a numeric taxonomy:
//! - 1xx: Dialect errors
//! - 2xx: Backup errors
//! - 3xx: Config errors
//! - 4xx: Restore errors
//! - 6xx: Storage errors
//! - 9xx: Internal errors

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// E101: Driver identifier is not `crdb` or `postgres`
    UnsupportedDialect,

    /// E201: Reading an entity collection failed
    ExtractionFailed,
    /// E202: Group approver links form a cycle
    CycleDetected,

    /// E301: Config file has invalid syntax or values
    ConfigInvalid,
    /// E302: Required config value is missing
    ConfigMissingRequired,

    /// E401: Inserting a restoration group failed
    RestoreRowFailed,
    /// E402: Post-restore consistency repair failed
    ConsistencyRepairFailed,

    /// E601: Artifact could not be encoded or decoded
    SerializationError,
    /// E602: Begin/commit of a transaction failed
    TransactionFailed,
    /// E603: Schema migration failed
    MigrationFailed,
    /// E604: IO operation failed
    IoError,
    /// E605: Opening or querying the database failed
    DatabaseError,

    /// E901: Cancelled or deadline exceeded
    Cancelled,
}

impl ErrorCode {
    #[must_use]
    pub const fn numeric(&self) -> u16 {
        match self {
            Self::UnsupportedDialect => 101,
            Self::ExtractionFailed => 201,
            Self::CycleDetected => 202,
            Self::ConfigInvalid => 301,
            Self::ConfigMissingRequired => 302,
            Self::RestoreRowFailed => 401,
            Self::ConsistencyRepairFailed => 402,
            Self::SerializationError => 601,
            Self::TransactionFailed => 602,
            Self::MigrationFailed => 603,
            Self::IoError => 604,
            Self::DatabaseError => 605,
            Self::Cancelled => 901,
        }
    }

    /// Formatted code (e.g., "E401").
    #[must_use]
    pub fn code_string(&self) -> String {
        format!("E{}", self.numeric())
    }

    #[must_use]
    pub const fn suggestion(&self) -> &'static str {
        match self {
            Self::UnsupportedDialect => "Pass --driver=crdb or --driver=postgres",
            Self::ExtractionFailed => "Check connectivity and that the schema is migrated, then retry the backup",
            Self::CycleDetected => "Break the cycle by clearing approver_group_id on one of the listed groups",
            Self::ConfigInvalid => "Check TOML syntax in the config file",
            Self::ConfigMissingRequired => "Set the value in the config file, the environment, or on the command line",
            Self::RestoreRowFailed => "Nothing was committed. Restore into an empty database, or run with --migrate on a fresh one",
            Self::ConsistencyRepairFailed => "Nothing was committed. Check the notification tables and retry",
            Self::SerializationError => "The artifact is malformed or was taken with a different --driver",
            Self::TransactionFailed => "The operation was rolled back. Check database health and retry",
            Self::MigrationFailed => "Check the database user can create tables",
            Self::IoError => "Check the input/output path exists and permissions are correct",
            Self::DatabaseError => "Check --database-url and that the database is reachable",
            Self::Cancelled => "The operation was interrupted and rolled back. Retry with a longer timeout",
        }
    }

    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self.numeric() / 100 {
            1 => "dialect",
            2 => "backup",
            3 => "config",
            4 => "restore",
            6 => "storage",
            _ => "internal",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code_string())
    }
}
