//! Database layer for the casedesk backend.
//!
//! Wraps an `r2d2` connection pool in an [`Engine`] that fans connection
//! lifecycle events out to [`PoolObserver`]s, and provides the
//! [`PoolMonitor`] used by the debug endpoints.
//!
//! # Design decisions
//!
//! - **The driver owns pooling.** Sizing, overflow, recycling, pre-ping and
//!   acquisition timeouts are all delegated to `r2d2`; this crate only
//!   reads its counters.
//! - **Observers are registered against the engine, not the pool.** The
//!   pool accepts a single event handler fixed at build time, so the engine
//!   installs a dispatcher there and observers attach to it by name.
//! - **Scoped helpers release on every path.** [`Engine::with_connection`]
//!   and [`Engine::with_session`] hand out a borrowed connection; the pooled
//!   handle is returned on drop, and any transaction still open is rolled
//!   back first.

mod connection;
mod engine;
mod error;
mod events;
mod monitor;
mod pool;

pub use connection::DriverConnection;
pub use engine::{Engine, PoolSettings, PoolStatus};
pub use error::{BoxError, DbError};
pub use events::{CheckinInfo, CheckoutInfo, ConnectInfo, PoolObserver};
pub use monitor::{
    BenchmarkResult, HealthCheckResult, MonitorOptions, PoolMonitor, MONITOR_OBSERVER,
};
pub use pool::{create_postgres_engine, create_sqlite_engine, PostgresEngine, SqliteEngine};
