//! Background maintenance loops: demand-driven growth and idle reaping.
//!
//! Both loops are spawned at pool construction, run detached for the life
//! of the process, and coordinate with checkout and release purely through
//! the shared queue, counter, and broadcast channel. Errors inside a loop
//! are logged and absorbed; nothing propagates across the task boundary.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crate::conn::PooledEntry;
use crate::pool::Shared;

/// Growth loop: refill the idle queue when it drains.
///
/// Growth is triggered by depletion, not by mere borrowing. Each drain of
/// the queue produces at most one new connection before the next checkout
/// can drain it again, so a sustained burst of demand walks the pool up to
/// `max_size` one connection at a time instead of stampeding the server.
pub(crate) async fn replenish(shared: Arc<Shared>) {
    loop {
        let notified = shared.wakeup.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let depleted = {
            let state = shared.state.lock();
            state.idle.is_empty() && state.live < shared.config.max_size
        };
        if !depleted {
            notified.await;
            continue;
        }

        // Reserve the slot before connecting so `live` never overshoots
        // `max_size`; the mutex must not be held across the connect.
        shared.state.lock().live += 1;

        match shared.connector.connect().await {
            Ok(conn) => {
                let entry = PooledEntry::new(conn, shared.next_conn_id());
                let id = entry.id;
                shared.state.lock().idle.push_back(entry);
                shared
                    .metrics
                    .connections_created
                    .fetch_add(1, Ordering::Relaxed);
                tracing::debug!(id, "pool grown by one connection");
                shared.wakeup.notify_waiters();
            }
            Err(err) => {
                shared.state.lock().live -= 1;
                tracing::warn!(error = %err, "replenish connect failed");
                // Hold off until the next depletion signal rather than
                // hammering a refusing server.
                notified.await;
            }
        }
    }
}

/// Reaper loop: close surplus connections that have idled too long.
///
/// Wakes every `max_idle_time` and scans from the front of the queue. The
/// queue is FIFO by return time, so the scan stops at the first entry
/// under the threshold: everything behind it is younger. Only idle
/// entries are candidates; a borrowed connection is not in the queue and
/// can never be reaped. The pool never shrinks below `init_size`.
pub(crate) async fn reap(shared: Arc<Shared>) {
    let interval = shared.config.max_idle_time;
    loop {
        tokio::time::sleep(interval).await;

        let mut evicted = Vec::new();
        {
            let mut state = shared.state.lock();
            while state.live > shared.config.init_size {
                let expired = state
                    .idle
                    .front()
                    .is_some_and(|entry| entry.idle_for() >= shared.config.max_idle_time);
                if !expired {
                    break;
                }
                if let Some(entry) = state.idle.pop_front() {
                    state.live -= 1;
                    evicted.push(entry);
                }
            }
        }

        // Close outside the lock; a slow close must not stall checkouts.
        for mut entry in evicted {
            tracing::debug!(id = entry.id, "closing idle connection");
            entry.conn.close().await;
            shared
                .metrics
                .connections_closed
                .fetch_add(1, Ordering::Relaxed);
        }
    }
}
