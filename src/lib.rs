pub mod app;
pub mod backup;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod storage;
pub mod test_utils;

pub use error::{Result, SnapError};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
