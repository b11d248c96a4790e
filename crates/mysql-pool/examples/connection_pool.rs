//! Connection pool walkthrough.
//!
//! Demonstrates pool configuration, checkout/return, demand-driven growth,
//! and status/metrics monitoring. The MySQL session layer is pluggable, so
//! this example runs against a small in-process connector that simulates
//! dial latency; swap `DemoConnector` for a connector backed by a real
//! client library to talk to an actual server.
//!
//! # Running
//!
//! ```bash
//! cargo run --example connection_pool
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mysql_conn_pool::{Connection, Connector, Pool, PoolConfig, PoolError};

/// Stand-in for a real MySQL session.
struct DemoConnection {
    id: u64,
}

#[async_trait]
impl Connection for DemoConnection {
    async fn close(&mut self) {
        println!("  [session {}] closed", self.id);
    }
}

/// Stand-in for a connector backed by a real client library.
struct DemoConnector {
    next_id: AtomicU64,
}

#[async_trait]
impl Connector for DemoConnector {
    async fn connect(&self) -> Result<Box<dyn Connection>, PoolError> {
        // Simulate the cost of dialing and authenticating.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(DemoConnection { id }))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== Connection Pool Example ===\n");

    let config = PoolConfig::new()
        .host("localhost")
        .database("demo")
        .init_size(2)
        .max_size(5)
        .max_idle_time(Duration::from_secs(30))
        .acquire_timeout(Duration::from_millis(500));

    println!("Pool configuration:");
    println!("  Initial connections: {}", config.init_size);
    println!("  Max connections: {}", config.max_size);
    println!("  Acquire timeout: {:?}", config.acquire_timeout);
    println!();

    let connector = DemoConnector {
        next_id: AtomicU64::new(0),
    };
    let pool = Arc::new(Pool::new(config, connector).await?);

    print_status(&pool);

    // Example 1: checkout and automatic return
    println!("\n1. Basic checkout:");
    {
        let conn = pool.get().await?;
        println!("  Borrowed connection {}", conn.id());
        print_status(&pool);
        // Returned to the pool when `conn` drops
    }
    print_status(&pool);

    // Example 2: concurrent borrowers drive the pool past its initial size
    println!("\n2. Concurrent checkouts (8 tasks, 2 initial connections):");
    let mut handles = vec![];
    for i in 0..8 {
        let pool = Arc::clone(&pool);
        handles.push(tokio::spawn(async move {
            let conn = pool.get().await?;
            // Simulate some work
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, PoolError>((i, conn.id()))
        }));
    }
    for handle in handles {
        if let Ok((task, conn)) = handle.await? {
            println!("  task {task} used connection {conn}");
        }
    }
    print_status(&pool);

    // Example 3: saturation produces a timeout, not unbounded growth
    println!("\n3. Saturation:");
    let mut held = vec![];
    while held.len() < pool.config().max_size as usize {
        match pool.get().await {
            Ok(conn) => held.push(conn),
            Err(err) => {
                println!("  Stopped at {} connections: {err}", held.len());
                break;
            }
        }
    }
    println!("  Holding all {} connections", held.len());
    match pool.get().await {
        Err(PoolError::AcquisitionTimeout(t)) => {
            println!("  Next checkout timed out after {t:?} (expected)");
        }
        other => println!("  Unexpected result: {:?}", other.map(|c| c.id())),
    }
    drop(held);

    // Final metrics
    println!("\n4. Metrics:");
    let metrics = pool.metrics();
    println!("  Connections created: {}", metrics.connections_created);
    println!("  Connections closed: {}", metrics.connections_closed);
    println!(
        "  Checkout success rate: {:.1}%",
        metrics.checkout_success_rate() * 100.0
    );

    Ok(())
}

fn print_status(pool: &Pool) {
    let status = pool.status();
    println!(
        "  Status: {} idle, {} in use, {}/{} total ({:.0}% utilization)",
        status.available,
        status.in_use,
        status.total,
        status.max,
        status.utilization()
    );
}
