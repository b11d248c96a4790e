//! Pool configuration.
//!
//! Settings can be built programmatically with the builder methods or
//! loaded from a plain-text settings file with one `key=value` pair per
//! line:
//!
//! ```text
//! ip=127.0.0.1
//! port=3306
//! username=root
//! password=secret
//! dbname=orders
//! initSize=4
//! maxSize=16
//! maxIdleTime=60
//! connectionTimeOut=100
//! ```
//!
//! Lines without an `=` and unrecognized keys are ignored, so the file can
//! carry comments and settings for other tools. `maxIdleTime` is in
//! seconds, `connectionTimeOut` in milliseconds.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::error::PoolError;

/// Default settings file name, resolved relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "mysql.ini";

/// Configuration for the connection pool.
///
/// Immutable once the pool is constructed; there is no runtime
/// reconfiguration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Server hostname or IP address.
    pub host: String,

    /// Server port.
    pub port: u16,

    /// Login username.
    pub username: String,

    /// Login password.
    pub password: String,

    /// Database (schema) to select after login.
    pub database: String,

    /// Number of connections opened at startup. Also the floor below which
    /// the reaper never shrinks the pool.
    pub init_size: u32,

    /// Maximum number of connections, idle and borrowed combined.
    pub max_size: u32,

    /// Idle duration after which a surplus connection is closed. The
    /// reaper also wakes at this interval.
    pub max_idle_time: Duration,

    /// Time a caller waits in [`Pool::get`](crate::Pool::get) for an idle
    /// connection before giving up.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 3306,
            username: "root".into(),
            password: String::new(),
            database: "mysql".into(),
            init_size: 2,
            max_size: 10,
            max_idle_time: Duration::from_secs(600),
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the login username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the login password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the database to select after login.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the number of initial connections.
    #[must_use]
    pub fn init_size(mut self, count: u32) -> Self {
        self.init_size = count;
        self
    }

    /// Set the maximum number of connections.
    #[must_use]
    pub fn max_size(mut self, count: u32) -> Self {
        self.max_size = count;
        self
    }

    /// Set the idle duration after which surplus connections are closed.
    #[must_use]
    pub fn max_idle_time(mut self, duration: Duration) -> Self {
        self.max_idle_time = duration;
        self
    }

    /// Set the connection acquisition timeout.
    #[must_use]
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.init_size == 0 {
            return Err(PoolError::Configuration(
                "init_size must be at least 1".into(),
            ));
        }
        if self.max_size < self.init_size {
            return Err(PoolError::Configuration(
                "max_size cannot be less than init_size".into(),
            ));
        }
        if self.max_idle_time.is_zero() {
            return Err(PoolError::Configuration(
                "max_idle_time must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Load settings from a `key=value` file, conventionally
    /// [`DEFAULT_CONFIG_FILE`] in the working directory.
    ///
    /// A missing or unreadable file is an error; a pool that silently
    /// starts without configuration can never serve a connection.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PoolError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse settings from `key=value` text.
    ///
    /// Keys not present in the text keep their default values. The result
    /// is validated before being returned.
    pub fn parse(text: &str) -> Result<Self, PoolError> {
        let mut config = Self::default();

        for line in text.lines() {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "ip" => config.host = value.into(),
                "port" => config.port = parse_setting(key, value)?,
                "username" => config.username = value.into(),
                "password" => config.password = value.into(),
                "dbname" => config.database = value.into(),
                "initSize" => config.init_size = parse_setting(key, value)?,
                "maxSize" => config.max_size = parse_setting(key, value)?,
                "maxIdleTime" => {
                    config.max_idle_time = Duration::from_secs(parse_setting(key, value)?);
                }
                "connectionTimeOut" => {
                    config.acquire_timeout = Duration::from_millis(parse_setting(key, value)?);
                }
                _ => {
                    tracing::debug!(key, "ignoring unrecognized setting");
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_setting<T: FromStr>(key: &str, value: &str) -> Result<T, PoolError> {
    value
        .parse()
        .map_err(|_| PoolError::Configuration(format!("invalid value for {key}: {value:?}")))
}
