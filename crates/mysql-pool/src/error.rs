//! Pool error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during pool operations.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Failed to acquire a connection within the timeout.
    #[error("connection acquisition timeout after {0:?}")]
    AcquisitionTimeout(Duration),

    /// Connection creation failed.
    #[error("failed to create connection: {0}")]
    ConnectionCreation(String),

    /// Pool configuration error.
    #[error("pool configuration error: {0}")]
    Configuration(String),

    /// Configuration file could not be read.
    #[error("failed to read configuration file: {0}")]
    ConfigIo(#[from] std::io::Error),
}

impl PoolError {
    /// Check if this error is transient and may succeed on retry.
    ///
    /// An acquisition timeout clears once a connection is returned, and a
    /// failed connect may succeed on a later attempt. Configuration errors
    /// are permanent until the settings change.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::AcquisitionTimeout(_) | Self::ConnectionCreation(_)
        )
    }
}
