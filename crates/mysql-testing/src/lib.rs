//! # mysql-testing
//!
//! Test infrastructure for the connection pool: an in-memory stand-in for
//! the MySQL session layer, so the full pool protocol can be exercised
//! with no server and no network.
//!
//! [`MockConnector`] hands out [`MockConnection`]s with sequential ids and
//! can be scripted to refuse connection attempts, either always or once a
//! given number of sessions exist. Connectors are cheap to clone; clones
//! share their counters, so a test can keep one handle for observation
//! while the pool owns the other.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mysql_conn_pool::{Pool, PoolConfig};
//! use mysql_testing::MockConnector;
//!
//! let connector = MockConnector::new();
//! let pool = Pool::new(PoolConfig::new(), connector.clone()).await?;
//!
//! let conn = pool.get().await?;
//! assert_eq!(connector.connections_opened(), 2);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use mysql_conn_pool::{Connection, Connector, PoolError};

/// When a [`MockConnector`] refuses connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureMode {
    /// Every attempt succeeds.
    Never,
    /// Every attempt fails.
    Always,
    /// Attempts succeed until `n` sessions have been opened, then fail.
    AfterFirst(u32),
}

#[derive(Default)]
struct MockState {
    attempts: AtomicU32,
    opened: AtomicU32,
    closed: AtomicU32,
}

/// Scriptable in-memory connection factory.
#[derive(Clone)]
pub struct MockConnector {
    state: Arc<MockState>,
    mode: FailureMode,
}

impl MockConnector {
    /// A connector whose every attempt succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::with_mode(FailureMode::Never)
    }

    /// A connector whose every attempt fails.
    #[must_use]
    pub fn failing() -> Self {
        Self::with_mode(FailureMode::Always)
    }

    /// A connector that succeeds until `n` sessions have been opened,
    /// then refuses further attempts.
    #[must_use]
    pub fn failing_after(n: u32) -> Self {
        Self::with_mode(FailureMode::AfterFirst(n))
    }

    fn with_mode(mode: FailureMode) -> Self {
        Self {
            state: Arc::new(MockState::default()),
            mode,
        }
    }

    /// Total connect attempts, including refused ones.
    #[must_use]
    pub fn connect_attempts(&self) -> u32 {
        self.state.attempts.load(Ordering::SeqCst)
    }

    /// Sessions successfully opened.
    #[must_use]
    pub fn connections_opened(&self) -> u32 {
        self.state.opened.load(Ordering::SeqCst)
    }

    /// Sessions that have been closed.
    #[must_use]
    pub fn connections_closed(&self) -> u32 {
        self.state.closed.load(Ordering::SeqCst)
    }
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, PoolError> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);

        let refused = match self.mode {
            FailureMode::Never => false,
            FailureMode::Always => true,
            FailureMode::AfterFirst(n) => self.state.opened.load(Ordering::SeqCst) >= n,
        };
        if refused {
            return Err(PoolError::ConnectionCreation(
                "mock connector refused the attempt".into(),
            ));
        }

        let id = u64::from(self.state.opened.fetch_add(1, Ordering::SeqCst));
        Ok(Box::new(MockConnection {
            id,
            state: Arc::clone(&self.state),
        }))
    }
}

/// An in-memory session handed out by [`MockConnector`].
pub struct MockConnection {
    id: u64,
    state: Arc<MockState>,
}

impl MockConnection {
    /// Sequential id assigned at open time.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn close(&mut self) {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }
}
