//! Runtime configuration for sessions and logging.
//!
//! # Responsibility
//! - Collect the database URL, busy timeout and logging options.
//! - Load them from environment variables or a JSON document.
//!
//! # Invariants
//! - Missing values fall back to defaults; malformed values are errors.

use crate::db::{DbResult, DbTarget, DEFAULT_BUSY_TIMEOUT};
use crate::logging::{default_log_level, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const DATABASE_BUSY_TIMEOUT_ENV: &str = "DATABASE_BUSY_TIMEOUT_MS";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "LOG_DIR";

const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => {
                write!(f, "invalid value `{value}` for `{key}`")
            }
            Self::Parse(err) => write!(f, "invalid configuration document: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidValue { .. } => None,
            Self::Parse(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Settings shared by the session layer and the logging bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// `sqlite::memory:`, `sqlite://<path>` or a bare file path.
    pub database_url: String,
    pub busy_timeout_ms: u64,
    pub log_level: String,
    /// Absolute directory for rolling log files; stderr when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT.as_millis() as u64,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl RepositoryConfig {
    /// Reads `DATABASE_URL`, `DATABASE_BUSY_TIMEOUT_MS`, `LOG_LEVEL` and `LOG_DIR`.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RepositoryConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = non_empty(DATABASE_URL_ENV) {
            config.database_url = url.trim().to_string();
        }
        if let Some(raw) = non_empty(DATABASE_BUSY_TIMEOUT_ENV) {
            config.busy_timeout_ms =
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: DATABASE_BUSY_TIMEOUT_ENV,
                        value: raw.clone(),
                    })?;
        }
        if let Some(level) = non_empty(LOG_LEVEL_ENV) {
            config.log_level = level.trim().to_string();
        }
        if let Some(dir) = non_empty(LOG_DIR_ENV) {
            config.log_dir = Some(PathBuf::from(dir.trim()));
        }

        Ok(config)
    }

    pub fn from_json_str(document: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(document)?)
    }

    pub fn database_target(&self) -> DbResult<DbTarget> {
        DbTarget::parse(&self.database_url)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn logging(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
        }
    }
}
