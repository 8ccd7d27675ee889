//! Per-invocation state shared by the command handlers.

use crate::cli::Cli;
use crate::config::Config;
use crate::context::Context;
use crate::error::{Result, SnapError};
use crate::storage::{Access, AnyStore, open_store};

#[derive(Debug)]
pub struct AppContext {
    pub config: Config,
    pub robot_mode: bool,
    /// Carries the configured deadline; cancelled on interrupt.
    pub ctx: Context,
}

impl AppContext {
    pub fn from_cli(cli: &Cli, ctx: Context) -> Result<Self> {
        let config = Config::load(cli.config.as_deref())?;
        Ok(Self::new(config, cli.robot, ctx))
    }

    #[must_use]
    pub fn new(config: Config, robot_mode: bool, ctx: Context) -> Self {
        let ctx = match config.database.timeout() {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx,
        };
        Self {
            config,
            robot_mode,
            ctx,
        }
    }

    /// The `--driver` flag, else `database.driver`.
    pub fn driver(&self, flag: Option<&str>) -> Result<String> {
        flag.map(str::to_string)
            .or_else(|| self.config.database.driver.clone())
            .ok_or_else(|| SnapError::MissingConfig("database.driver (or --driver)".to_string()))
    }

    /// The `--database-url` flag, else `database.url`.
    pub fn database_url(&self, flag: Option<&str>) -> Result<String> {
        flag.map(str::to_string)
            .or_else(|| self.config.database.url.clone())
            .ok_or_else(|| {
                SnapError::MissingConfig("database.url (or --database-url)".to_string())
            })
    }

    pub fn open_store(&self, url: &str, access: Access) -> Result<AnyStore> {
        Ok(open_store(&self.ctx, url, access)?)
    }
}
