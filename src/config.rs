use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SnapError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub backup: BackupConfig,
}

impl Config {
    /// Defaults, then the explicit file (`--config` or `IDSNAP_CONFIG`) or the
    /// global file, then `IDSNAP_*` environment overrides. Command-line flags
    /// are applied by the caller on top.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("IDSNAP_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            match Self::load_patch(&path)? {
                Some(patch) => config.merge_patch(patch),
                None => {
                    return Err(SnapError::Config(format!(
                        "config file {} not found",
                        path.display()
                    )));
                }
            }
        } else if let Some(global) = Self::load_global()? {
            config.merge_patch(global);
        }

        config.apply_overrides(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    /// `<config dir>/idsnap/config.toml`, if the platform has a config dir.
    #[must_use]
    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("idsnap/config.toml"))
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        match Self::global_path() {
            Some(path) => Self::load_patch(&path),
            None => Ok(None),
        }
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| SnapError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| SnapError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.database {
            self.database.merge(patch);
        }
        if let Some(patch) = patch.backup {
            self.backup.merge(patch);
        }
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup("IDSNAP_DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(driver) = lookup("IDSNAP_DRIVER") {
            self.database.driver = Some(driver);
        }
        if let Some(value) = lookup("IDSNAP_TIMEOUT_SECS") {
            let secs = value.parse::<u64>().map_err(|err| {
                SnapError::Config(format!("invalid IDSNAP_TIMEOUT_SECS value {value}: {err}"))
            })?;
            self.database.timeout_secs = Some(secs);
        }
        if let Some(value) = lookup("IDSNAP_CONSISTENT_READ") {
            self.backup.consistent_read = parse_bool(&value).ok_or_else(|| {
                SnapError::Config(format!(
                    "invalid IDSNAP_CONSISTENT_READ value {value}: expected true or false"
                ))
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `postgres://…`, `sqlite://…`, `sqlite::memory:` or a file path.
    pub url: Option<String>,
    /// `crdb` or `postgres`.
    pub driver: Option<String>,
    /// Whole-operation deadline. Unset means no deadline.
    pub timeout_secs: Option<u64>,
}

impl DatabaseConfig {
    fn merge(&mut self, patch: DatabasePatch) {
        if let Some(value) = patch.url {
            self.url = Some(value);
        }
        if let Some(value) = patch.driver {
            self.driver = Some(value);
        }
        if let Some(value) = patch.timeout_secs {
            self.timeout_secs = Some(value);
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Read every collection inside one read-only transaction.
    pub consistent_read: bool,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            consistent_read: true,
        }
    }
}

impl BackupConfig {
    fn merge(&mut self, patch: BackupPatch) {
        if let Some(value) = patch.consistent_read {
            self.consistent_read = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    pub database: Option<DatabasePatch>,
    pub backup: Option<BackupPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DatabasePatch {
    pub url: Option<String>,
    pub driver: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct BackupPatch {
    pub consistent_read: Option<bool>,
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
