//! # mysql-conn-pool
//!
//! Bounded, reusable connection pool for MySQL.
//!
//! Establishing a MySQL session per request is expensive and an unbounded
//! number of them can overwhelm the server. This pool opens a configured
//! number of connections up front, lends them out FIFO, and bounds the
//! total at a hard maximum, refusing with a timeout rather than growing
//! without limit.
//!
//! ## Features
//!
//! - Blocking checkout with a configurable acquisition timeout
//! - Demand-driven growth up to `max_size`, one connection per depletion
//!   of the idle queue
//! - Background reaping of connections idle past `max_idle_time`, never
//!   below `init_size`
//! - Automatic return on drop; borrowers never close connections
//! - Settings loadable from a `key=value` file
//! - Process-wide singleton via [`Pool::global`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use mysql_conn_pool::{Pool, PoolConfig};
//!
//! let config = PoolConfig::new()
//!     .host("db.internal")
//!     .username("app")
//!     .password("secret")
//!     .init_size(4)
//!     .max_size(16)
//!     .acquire_timeout(Duration::from_millis(500));
//!
//! let pool = Pool::new(config, MyConnector).await?;
//!
//! let conn = pool.get().await?;
//! // Use the connection...
//! // Returned to the idle queue when `conn` drops, on any exit path.
//! ```
//!
//! The session layer is pluggable: implement [`Connector`] and
//! [`Connection`] for whatever client library dials the server.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod conn;
pub mod error;
pub mod pool;

mod tasks;

pub use config::{DEFAULT_CONFIG_FILE, PoolConfig};
pub use conn::{Connection, Connector};
pub use error::PoolError;
pub use pool::{Pool, PoolMetrics, PoolStatus, PooledConnection};
