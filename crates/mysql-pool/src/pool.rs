//! Connection pool implementation.

use std::collections::VecDeque;
use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{Notify, OnceCell};
use tokio::time::Instant;

use crate::config::PoolConfig;
use crate::conn::{Connection, Connector, PooledEntry};
use crate::error::PoolError;
use crate::tasks;

/// Process-wide pool instance, see [`Pool::global`].
static GLOBAL: OnceCell<Pool> = OnceCell::const_new();

/// A bounded pool of reusable MySQL connections.
///
/// The pool opens `init_size` connections up front and grows on demand up
/// to `max_size`, one connection per depletion of the idle queue. Borrowed
/// connections return automatically when the [`PooledConnection`] guard is
/// dropped; surplus connections idle longer than `max_idle_time` are
/// closed by a background reaper, which never shrinks the pool below
/// `init_size`.
///
/// Cloning is cheap; all clones share the same state. The background loops
/// run detached for the life of the process.
#[derive(Clone)]
pub struct Pool {
    shared: Arc<Shared>,
}

/// State shared between pool handles, guards, and the background loops.
pub(crate) struct Shared {
    pub(crate) config: PoolConfig,
    pub(crate) connector: Arc<dyn Connector>,
    /// Queue and counter guarded as a single unit; every read or mutation
    /// of either takes this mutex. The queue is FIFO by return time:
    /// release pushes to the back, checkout pops the front, so the front
    /// is always the oldest-idle entry.
    pub(crate) state: Mutex<PoolState>,
    /// The single broadcast channel all parties share: checkout signals
    /// after draining the queue (waking the replenisher), release and
    /// replenish signal after pushing (waking blocked callers).
    pub(crate) wakeup: Notify,
    pub(crate) metrics: MetricCounters,
    next_id: AtomicU64,
}

pub(crate) struct PoolState {
    pub(crate) idle: VecDeque<PooledEntry>,
    /// Connections currently allocated: idle plus borrowed.
    pub(crate) live: u32,
}

impl Shared {
    pub(crate) fn next_conn_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Return a borrowed entry to the back of the idle queue and wake
    /// anyone blocked in [`Pool::get`].
    fn release(&self, mut entry: PooledEntry) {
        entry.touch();
        tracing::trace!(id = entry.id, "connection returned to pool");
        let mut state = self.state.lock();
        state.idle.push_back(entry);
        drop(state);
        self.wakeup.notify_waiters();
    }
}

impl Pool {
    /// Create a pool, opening the initial connections and starting the
    /// background replenish and reap loops.
    ///
    /// Invalid settings are rejected up front. Individual connect failures
    /// during the initial fill are logged and absorbed: the pool starts
    /// with however many connections succeeded, and the replenisher tries
    /// again the next time the queue drains.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn new(config: PoolConfig, connector: impl Connector) -> Result<Self, PoolError> {
        config.validate()?;

        let shared = Arc::new(Shared {
            connector: Arc::new(connector),
            state: Mutex::new(PoolState {
                idle: VecDeque::with_capacity(config.max_size as usize),
                live: 0,
            }),
            wakeup: Notify::new(),
            metrics: MetricCounters::default(),
            next_id: AtomicU64::new(0),
            config,
        });

        for _ in 0..shared.config.init_size {
            match shared.connector.connect().await {
                Ok(conn) => {
                    let entry = PooledEntry::new(conn, shared.next_conn_id());
                    let mut state = shared.state.lock();
                    state.idle.push_back(entry);
                    state.live += 1;
                    drop(state);
                    shared
                        .metrics
                        .connections_created
                        .fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    tracing::warn!(error = %err, "failed to open initial connection");
                }
            }
        }

        let opened = shared.state.lock().live;
        tracing::info!(
            initial = opened,
            requested = shared.config.init_size,
            max = shared.config.max_size,
            "connection pool started"
        );

        tokio::spawn(tasks::replenish(Arc::clone(&shared)));
        tokio::spawn(tasks::reap(Arc::clone(&shared)));

        Ok(Self { shared })
    }

    /// Create a pool from a `key=value` settings file.
    ///
    /// See [`PoolConfig::from_file`] for the file format.
    pub async fn from_file(
        path: impl AsRef<Path>,
        connector: impl Connector,
    ) -> Result<Self, PoolError> {
        let config = PoolConfig::from_file(path)?;
        Self::new(config, connector).await
    }

    /// The process-wide pool, created on first use.
    ///
    /// Every caller passes an initializer; exactly one runs, even under
    /// concurrent first access, and all callers observe the same pool. A
    /// failed initialization is not cached, so a later call may retry.
    ///
    /// ```rust,ignore
    /// use mysql_conn_pool::{DEFAULT_CONFIG_FILE, Pool};
    ///
    /// let pool = Pool::global(|| Pool::from_file(DEFAULT_CONFIG_FILE, MyConnector)).await?;
    /// ```
    pub async fn global<F, Fut>(init: F) -> Result<&'static Pool, PoolError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Pool, PoolError>>,
    {
        GLOBAL.get_or_try_init(init).await
    }

    /// Borrow a connection, waiting up to `acquire_timeout` for one to
    /// become idle.
    ///
    /// Connections are handed out oldest-returned first. When the pool is
    /// saturated (`max_size` connections all borrowed), the call blocks
    /// until a connection is returned or the timeout elapses; there is no
    /// ordering among concurrent waiters.
    pub async fn get(&self) -> Result<PooledConnection, PoolError> {
        let deadline = Instant::now() + self.shared.config.acquire_timeout;

        loop {
            // Register interest before checking the queue so a broadcast
            // landing between the check and the wait is not lost.
            let notified = self.shared.wakeup.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(guard) = self.checkout() {
                return Ok(guard);
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                // The deadline can race a wakeup; look at the queue one
                // last time before reporting failure.
                if let Some(guard) = self.checkout() {
                    return Ok(guard);
                }
                let timeout = self.shared.config.acquire_timeout;
                self.shared
                    .metrics
                    .checkouts_failed
                    .fetch_add(1, Ordering::Relaxed);
                tracing::warn!(?timeout, "connection acquisition timed out");
                return Err(PoolError::AcquisitionTimeout(timeout));
            }
        }
    }

    /// Borrow a connection only if one is idle right now.
    ///
    /// Never waits and never creates a connection.
    #[must_use]
    pub fn try_get(&self) -> Option<PooledConnection> {
        self.checkout()
    }

    /// Pop the front of the idle queue, signalling the replenisher when
    /// the pop drains it.
    fn checkout(&self) -> Option<PooledConnection> {
        let (entry, drained) = {
            let mut state = self.shared.state.lock();
            let entry = state.idle.pop_front()?;
            (entry, state.idle.is_empty())
        };
        if drained {
            // The replenisher only acts on a drained queue.
            self.shared.wakeup.notify_waiters();
        }

        self.shared
            .metrics
            .checkouts_successful
            .fetch_add(1, Ordering::Relaxed);
        tracing::trace!(id = entry.id, "connection checked out");

        Some(PooledConnection {
            entry: Some(entry),
            shared: Arc::clone(&self.shared),
        })
    }

    /// Current pool occupancy.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let state = self.shared.state.lock();
        let available = state.idle.len() as u32;
        PoolStatus {
            available,
            in_use: state.live - available,
            total: state.live,
            max: self.shared.config.max_size,
        }
    }

    /// Lifetime counters for pool activity.
    #[must_use]
    pub fn metrics(&self) -> PoolMetrics {
        self.shared.metrics.snapshot()
    }

    /// The pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy)]
pub struct PoolStatus {
    /// Number of idle connections available.
    pub available: u32,
    /// Number of connections currently borrowed.
    pub in_use: u32,
    /// Total number of live connections.
    pub total: u32,
    /// Maximum allowed connections.
    pub max: u32,
}

impl PoolStatus {
    /// Borrowed connections as a percentage of the maximum.
    #[must_use]
    pub fn utilization(&self) -> f64 {
        if self.max == 0 {
            return 0.0;
        }
        f64::from(self.in_use) / f64::from(self.max) * 100.0
    }
}

/// Lifetime pool activity counters.
#[derive(Debug, Clone, Copy)]
pub struct PoolMetrics {
    /// Connections opened, initial fill and growth combined.
    pub connections_created: u64,
    /// Connections closed by the reaper.
    pub connections_closed: u64,
    /// Checkouts that handed out a connection.
    pub checkouts_successful: u64,
    /// Checkouts that timed out.
    pub checkouts_failed: u64,
}

impl PoolMetrics {
    /// Fraction of checkouts that succeeded, in `0.0..=1.0`.
    #[must_use]
    pub fn checkout_success_rate(&self) -> f64 {
        let total = self.checkouts_successful + self.checkouts_failed;
        if total == 0 {
            return 1.0;
        }
        self.checkouts_successful as f64 / total as f64
    }
}

#[derive(Default)]
pub(crate) struct MetricCounters {
    pub(crate) connections_created: AtomicU64,
    pub(crate) connections_closed: AtomicU64,
    pub(crate) checkouts_successful: AtomicU64,
    pub(crate) checkouts_failed: AtomicU64,
}

impl MetricCounters {
    fn snapshot(&self) -> PoolMetrics {
        PoolMetrics {
            connections_created: self.connections_created.load(Ordering::Relaxed),
            connections_closed: self.connections_closed.load(Ordering::Relaxed),
            checkouts_successful: self.checkouts_successful.load(Ordering::Relaxed),
            checkouts_failed: self.checkouts_failed.load(Ordering::Relaxed),
        }
    }
}

/// A connection borrowed from the pool.
///
/// Dereferences to the underlying [`Connection`]. When the guard is
/// dropped, on any exit path, the connection goes back to the idle queue;
/// the borrower never closes it.
pub struct PooledConnection {
    /// `Some` until `Drop` hands the entry back.
    entry: Option<PooledEntry>,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.entry.as_ref().map(|e| e.id))
            .finish()
    }
}

impl PooledConnection {
    /// Identifier of the borrowed connection, stable across reuses.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.entry().id
    }

    /// The entry is only taken in `Drop`, so it is present for the
    /// guard's entire lifetime.
    #[allow(clippy::expect_used)]
    fn entry(&self) -> &PooledEntry {
        self.entry.as_ref().expect("guard already released")
    }

    #[allow(clippy::expect_used)]
    fn entry_mut(&mut self) -> &mut PooledEntry {
        self.entry.as_mut().expect("guard already released")
    }
}

impl Deref for PooledConnection {
    type Target = dyn Connection;

    fn deref(&self) -> &Self::Target {
        self.entry().conn.as_ref()
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.entry_mut().conn.as_mut()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            self.shared.release(entry);
        }
    }
}
