//! The seam between the pool and the MySQL session layer.
//!
//! The pool does not know how a session is dialed, authenticated, or used;
//! all of that lives behind the object-safe traits here. The pool only
//! needs to open sessions, hand them out, and close the ones it evicts.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::PoolError;

/// A live database session managed by the pool.
///
/// Borrowers reach the session through the
/// [`PooledConnection`](crate::PooledConnection) guard; the only operation
/// the pool itself ever invokes is [`close`](Connection::close), and only
/// when the reaper evicts the session.
#[async_trait]
pub trait Connection: Send + 'static {
    /// Close the underlying session, releasing its server-side resources.
    async fn close(&mut self);
}

/// Opens new sessions on behalf of the pool.
///
/// Implementations own the endpoint and credential handling, typically
/// taken from [`PoolConfig`](crate::PoolConfig). The pool calls this
/// during the initial fill and from the replenish loop; a failure is
/// logged and the slot is left unfilled.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Open a new session.
    async fn connect(&self) -> Result<Box<dyn Connection>, PoolError>;
}

/// An idle-queue entry: the session plus the bookkeeping the pool needs.
pub(crate) struct PooledEntry {
    pub(crate) conn: Box<dyn Connection>,
    /// Stable identifier, assigned at creation, for logs and tests.
    pub(crate) id: u64,
    /// When the entry last entered the idle queue.
    returned_at: Instant,
}

impl PooledEntry {
    pub(crate) fn new(conn: Box<dyn Connection>, id: u64) -> Self {
        Self {
            conn,
            id,
            returned_at: Instant::now(),
        }
    }

    /// Record that the entry just re-entered the idle queue.
    pub(crate) fn touch(&mut self) {
        self.returned_at = Instant::now();
    }

    /// How long the entry has been sitting in the idle queue.
    pub(crate) fn idle_for(&self) -> Duration {
        self.returned_at.elapsed()
    }
}
