//! Configuration loading and representation.
//!
//! The ledger connection is described entirely by environment variables:
//!
//! | variable | meaning | default |
//! |---|---|---|
//! | `SALES_DATABASE_URL` | full Postgres URL | falls back to `DATABASE_URL` |
//! | `SALES_DB_HOST` | host, when no URL is set | `localhost` |
//! | `SALES_DB_PORT` | port, when no URL is set | `5432` |
//! | `SALES_DB_USER` | user name, when no URL is set | driver default |
//! | `SALES_DB_PASSWORD` | password, when no URL is set | none |
//! | `SALES_DB_NAME` | database name, required when no URL is set | |
//! | `SALES_DB_CONNECT_TIMEOUT_SECS` | connect timeout | `30` |

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

pub const ENV_DATABASE_URL: &str = "SALES_DATABASE_URL";
pub const ENV_FALLBACK_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_HOST: &str = "SALES_DB_HOST";
pub const ENV_PORT: &str = "SALES_DB_PORT";
pub const ENV_USER: &str = "SALES_DB_USER";
pub const ENV_PASSWORD: &str = "SALES_DB_PASSWORD";
pub const ENV_DATABASE: &str = "SALES_DB_NAME";
pub const ENV_CONNECT_TIMEOUT: &str = "SALES_DB_CONNECT_TIMEOUT_SECS";

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting {0} (or set {ENV_DATABASE_URL})")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("invalid database URL: {0}")]
    InvalidUrl(String),
}

/// Connection settings for the transaction ledger.
#[derive(Clone)]
pub struct LedgerConfig {
    options: PgConnectOptions,
    connect_timeout: Duration,
}

impl LedgerConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let connect_timeout = match get(ENV_CONNECT_TIMEOUT) {
            Some(raw) => parse_timeout(&raw)?,
            None => DEFAULT_CONNECT_TIMEOUT,
        };

        let url = get(ENV_DATABASE_URL).or_else(|| get(ENV_FALLBACK_DATABASE_URL));
        let options = match url {
            Some(url) => PgConnectOptions::from_str(&url)
                .map_err(|e| ConfigError::InvalidUrl(e.to_string()))?,
            None => {
                let database = get(ENV_DATABASE).ok_or(ConfigError::Missing(ENV_DATABASE))?;
                let host = get(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string());
                let port = match get(ENV_PORT) {
                    Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                        key: ENV_PORT,
                        reason: format!("{raw:?}: {e}"),
                    })?,
                    None => DEFAULT_PORT,
                };

                let mut options = PgConnectOptions::new()
                    .host(&host)
                    .port(port)
                    .database(&database);
                if let Some(user) = get(ENV_USER) {
                    options = options.username(&user);
                }
                if let Some(password) = get(ENV_PASSWORD) {
                    options = options.password(&password);
                }
                options
            }
        };

        Ok(Self {
            options,
            connect_timeout,
        })
    }

    pub fn connect_options(&self) -> &PgConnectOptions {
        &self.options
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// `host:port/database`, safe to log (no credentials).
    pub fn target(&self) -> String {
        format!(
            "{}:{}/{}",
            self.options.get_host(),
            self.options.get_port(),
            self.options.get_database().unwrap_or("")
        )
    }
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("target", &self.target())
            .field("connect_timeout", &self.connect_timeout)
            .finish_non_exhaustive()
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    let secs = raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
        key: ENV_CONNECT_TIMEOUT,
        reason: format!("{raw:?}: {e}"),
    })?;
    if secs == 0 {
        return Err(ConfigError::Invalid {
            key: ENV_CONNECT_TIMEOUT,
            reason: "must be at least 1 second".to_string(),
        });
    }
    Ok(Duration::from_secs(secs))
}
