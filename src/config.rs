//! Environment-driven configuration for the demo binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::logging::LogFormat;
use crate::schema::SchemaVariant;
use crate::store::StoreOptions;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const SCHEMA_VAR: &str = "USER_STORE_SCHEMA";
pub const TIMEOUT_VAR: &str = "USER_STORE_TIMEOUT_MS";
pub const LOG_SQL_VAR: &str = "USER_STORE_LOG_SQL";
pub const LOG_FORMAT_VAR: &str = "USER_STORE_LOG_FORMAT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value `{value}`: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Where the SQLite database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseTarget {
    InMemory,
    File(PathBuf),
}

impl DatabaseTarget {
    /// Accepts `sqlite::memory:`, `:memory:`, `sqlite://path`, `sqlite:path`,
    /// `file:path` or a bare path. Any other `scheme://` is rejected.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let url = url.trim();
        let path = match url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .or_else(|| url.strip_prefix("file:"))
        {
            Some(path) => path,
            None if url.contains("://") => {
                return Err(ConfigError::Invalid {
                    name: DATABASE_URL,
                    value: url.to_string(),
                    reason: "unsupported scheme, expected a sqlite URL or a file path",
                })
            }
            None => url,
        };

        match path {
            "" => Err(ConfigError::Invalid {
                name: DATABASE_URL,
                value: url.to_string(),
                reason: "empty database path",
            }),
            ":memory:" => Ok(DatabaseTarget::InMemory),
            path => Ok(DatabaseTarget::File(PathBuf::from(path))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database: DatabaseTarget,
    pub schema: SchemaVariant,
    pub timeout: Option<Duration>,
    pub log_statements: bool,
    pub log_format: LogFormat,
}

impl StoreConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup(DATABASE_URL).ok_or(ConfigError::Missing(DATABASE_URL))?;
        let database = DatabaseTarget::parse(&url)?;

        let schema = match lookup(SCHEMA_VAR) {
            Some(raw) => SchemaVariant::parse(&raw).ok_or(ConfigError::Invalid {
                name: SCHEMA_VAR,
                value: raw,
                reason: "expected `strict` or `relaxed`",
            })?,
            None => SchemaVariant::default(),
        };

        let timeout = match lookup(TIMEOUT_VAR) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) | Err(_) => {
                    return Err(ConfigError::Invalid {
                        name: TIMEOUT_VAR,
                        value: raw,
                        reason: "expected a positive number of milliseconds",
                    })
                }
                Ok(ms) => Some(Duration::from_millis(ms)),
            },
            None => None,
        };

        let log_statements = match lookup(LOG_SQL_VAR) {
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                name: LOG_SQL_VAR,
                value: raw,
                reason: "expected `true` or `false`",
            })?,
            None => true,
        };

        let log_format = match lookup(LOG_FORMAT_VAR) {
            Some(raw) => LogFormat::parse(&raw).ok_or(ConfigError::Invalid {
                name: LOG_FORMAT_VAR,
                value: raw,
                reason: "expected `pretty` or `json`",
            })?,
            None => LogFormat::default(),
        };

        Ok(Self {
            database,
            schema,
            timeout,
            log_statements,
            log_format,
        })
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            timeout: self.timeout,
            log_statements: self.log_statements,
        }
    }
}

/// Load `.env` from the working directory or a parent. A missing file is not
/// an error; a malformed one is.
pub fn load_env_file() -> Result<Option<PathBuf>, dotenvy::Error> {
    missing_is_none(dotenvy::dotenv())
}

pub fn load_env_file_from(path: &Path) -> Result<Option<PathBuf>, dotenvy::Error> {
    missing_is_none(dotenvy::from_path(path).map(|()| path.to_path_buf()))
}

fn missing_is_none(
    loaded: Result<PathBuf, dotenvy::Error>,
) -> Result<Option<PathBuf>, dotenvy::Error> {
    match loaded {
        Ok(path) => Ok(Some(path)),
        Err(err) if err.not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
