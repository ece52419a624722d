//! Runtime configuration resolved from environment variables.
//!
//! # Invariants
//! - Unset or blank variables fall back to defaults.
//! - A set but unparsable variable is an error naming the variable; it is
//!   never silently replaced by the default.

use crate::db::DbOptions;
use crate::logging::default_log_level;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "GROUPCAL_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "GROUPCAL_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "GROUPCAL_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "GROUPCAL_BUSY_TIMEOUT_MS";
pub const ENV_ROSTER_LIMIT: &str = "GROUPCAL_ROSTER_LIMIT";

const DEFAULT_DB_FILE_NAME: &str = "groupcal.sqlite3";
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_ROSTER_LIMIT: usize = 5;

/// Resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupcalConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Logging stays disabled when unset.
    pub log_dir: Option<PathBuf>,
    pub busy_timeout: Duration,
    /// Users shown per roster bucket before "+N more".
    pub roster_limit: usize,
}

impl Default for GroupcalConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            roster_limit: DEFAULT_ROSTER_LIMIT,
        }
    }
}

impl GroupcalConfig {
    /// Resolves configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through `lookup`, which maps a variable name
    /// to its raw value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let busy_timeout = match read(ENV_BUSY_TIMEOUT_MS) {
            Some(raw) => Duration::from_millis(parse_number(ENV_BUSY_TIMEOUT_MS, &raw)?),
            None => defaults.busy_timeout,
        };
        let roster_limit = match read(ENV_ROSTER_LIMIT) {
            Some(raw) => parse_number(ENV_ROSTER_LIMIT, &raw)?,
            None => defaults.roster_limit,
        };

        Ok(Self {
            db_path: read(ENV_DB_PATH).map_or(defaults.db_path, PathBuf::from),
            log_level: read(ENV_LOG_LEVEL).unwrap_or(defaults.log_level),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
            busy_timeout,
            roster_limit,
        })
    }

    /// Connection options derived from this configuration.
    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            busy_timeout: self.busy_timeout,
        }
    }
}

fn parse_number<T: std::str::FromStr>(variable: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.parse().map_err(|_| ConfigError::InvalidValue {
        variable,
        value: raw.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue {
        variable: &'static str,
        value: String,
    },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { variable, value } => {
                write!(f, "{variable} has invalid value `{value}`")
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::{ConfigError, GroupcalConfig, ENV_BUSY_TIMEOUT_MS, ENV_DB_PATH, ENV_LOG_DIR};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = GroupcalConfig::from_lookup(lookup(&[])).expect("defaults");
        assert_eq!(config, GroupcalConfig::default());
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
        assert_eq!(config.roster_limit, 5);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = GroupcalConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, " /var/lib/groupcal/db.sqlite3 "),
            (ENV_LOG_DIR, "/var/log/groupcal"),
            (ENV_BUSY_TIMEOUT_MS, "250"),
        ]))
        .expect("valid config");
        assert_eq!(
            config.db_path,
            PathBuf::from("/var/lib/groupcal/db.sqlite3")
        );
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/groupcal")));
        assert_eq!(config.db_options().busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn blank_value_falls_back_but_garbage_is_rejected() {
        let blank = GroupcalConfig::from_lookup(lookup(&[(ENV_BUSY_TIMEOUT_MS, "  ")]))
            .expect("blank is unset");
        assert_eq!(blank.busy_timeout, Duration::from_secs(5));

        let err = GroupcalConfig::from_lookup(lookup(&[(ENV_BUSY_TIMEOUT_MS, "soon")]))
            .expect_err("non-numeric timeout");
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                variable: ENV_BUSY_TIMEOUT_MS,
                value: "soon".to_string()
            }
        );
    }
}
