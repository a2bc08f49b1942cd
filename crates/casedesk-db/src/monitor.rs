//! Pool introspection, health probing and acquisition benchmarking.
//!
//! The monitor owns no pool state. Every operation is a synchronous read
//! or check against the engine it was attached to.

use crate::connection::DriverConnection;
use crate::engine::{Engine, PoolStatus};
use crate::error::DbError;
use crate::events::{CheckinInfo, CheckoutInfo, ConnectInfo, PoolObserver};
use r2d2::ManageConnection;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Registration key of the monitor's lifecycle observer.
pub const MONITOR_OBSERVER: &str = "pool_monitor";

/// Controls how chatty the lifecycle logging is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Log checkouts and checkins (debug mode).
    pub debug: bool,
    /// Log checkouts and checkins even outside debug mode.
    pub echo_pool: bool,
}

/// Outcome of [`PoolMonitor::health_check`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HealthCheckResult {
    Healthy { message: String },
    Unhealthy { message: String, error: String },
}

impl HealthCheckResult {
    fn healthy() -> Self {
        Self::Healthy {
            message: "Database connection is working".to_string(),
        }
    }

    fn unhealthy(error: &DbError) -> Self {
        Self::Unhealthy {
            message: format!("Database connection failed: {error}"),
            error: error.to_string(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Healthy { message } | Self::Unhealthy { message, .. } => message,
        }
    }
}

/// Timings collected by [`PoolMonitor::benchmark`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkResult {
    /// One acquire-query-release duration per iteration.
    pub samples: Vec<Duration>,
    /// Sum of all samples.
    pub total_time: Duration,
    pub avg_time: Duration,
    pub min_time: Duration,
    pub max_time: Duration,
    /// Pool counters read after the last iteration.
    pub pool_status: PoolStatus,
}

impl BenchmarkResult {
    fn from_samples(samples: Vec<Duration>, pool_status: PoolStatus) -> Self {
        let total_time: Duration = samples.iter().sum();
        let avg_time = if samples.is_empty() {
            Duration::ZERO
        } else {
            total_time.div_f64(samples.len() as f64)
        };
        Self {
            min_time: samples.iter().min().copied().unwrap_or_default(),
            max_time: samples.iter().max().copied().unwrap_or_default(),
            samples,
            total_time,
            avg_time,
            pool_status,
        }
    }
}

/// Logs connection lifecycle events and sets the client encoding.
struct LifecycleLogger {
    verbose: bool,
}

impl<C: DriverConnection> PoolObserver<C> for LifecycleLogger {
    fn name(&self) -> &str {
        MONITOR_OBSERVER
    }

    fn on_connect(&self, conn: &mut C, info: &ConnectInfo) {
        tracing::debug!(
            pool_size = info.pool_size,
            "new database connection established"
        );
        // Best effort: the connection stays usable with the server default.
        if let Err(e) = conn.set_client_encoding() {
            tracing::debug!(error = %e, "failed to set client encoding");
        }
    }

    fn on_checkout(&self, info: &CheckoutInfo) {
        if self.verbose {
            tracing::debug!(
                connection_id = info.connection_id,
                active = info.checked_out,
                wait_ms = info.wait.as_millis() as u64,
                "connection checked out"
            );
        }
    }

    fn on_checkin(&self, info: &CheckinInfo) {
        if self.verbose {
            tracing::debug!(
                connection_id = info.connection_id,
                available = info.checked_in,
                held_ms = info.held.as_millis() as u64,
                "connection checked in"
            );
        }
    }
}

/// Observes an engine's pool and exposes diagnostics over it.
pub struct PoolMonitor<M: ManageConnection> {
    engine: Engine<M>,
    options: MonitorOptions,
}

impl<M: ManageConnection> Clone for PoolMonitor<M> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            options: self.options,
        }
    }
}

impl<M> PoolMonitor<M>
where
    M: ManageConnection,
    M::Connection: DriverConnection,
{
    /// Attaches the lifecycle observer to `engine`.
    ///
    /// Attaching again replaces the previous observer, so each lifecycle
    /// event is logged once no matter how many times this is called.
    pub fn attach(engine: &Engine<M>, options: MonitorOptions) -> Self {
        engine.attach(Arc::new(LifecycleLogger {
            verbose: options.debug || options.echo_pool,
        }));
        Self {
            engine: engine.clone(),
            options,
        }
    }

    pub fn engine(&self) -> &Engine<M> {
        &self.engine
    }

    pub fn options(&self) -> MonitorOptions {
        self.options
    }

    /// Current pool counters. Never waits for a connection.
    pub fn snapshot(&self) -> PoolStatus {
        self.engine.status()
    }

    /// Acquires a connection and runs `SELECT 1`.
    ///
    /// Never fails: acquisition timeouts, refused connections and query
    /// errors all become [`HealthCheckResult::Unhealthy`].
    pub fn health_check(&self) -> HealthCheckResult {
        let outcome = self
            .engine
            .get()
            .and_then(|mut conn| conn.round_trip().map_err(DbError::query));

        match outcome {
            Ok(1) => HealthCheckResult::healthy(),
            Ok(actual) => HealthCheckResult::unhealthy(&DbError::UnexpectedResult {
                expected: 1,
                actual,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "database health check failed");
                HealthCheckResult::unhealthy(&e)
            }
        }
    }

    /// Acquires, queries and releases a connection `count` times, timing
    /// each round.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidArgument`] unless `count` is positive.
    /// The first failing
    /// iteration aborts the run and its error is returned; its connection
    /// is still released.
    pub fn benchmark(&self, count: i64) -> Result<BenchmarkResult, DbError> {
        if count < 1 {
            return Err(DbError::InvalidArgument(format!(
                "count must be a positive integer, got {count}"
            )));
        }

        let mut samples = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let started = Instant::now();
            let value = self
                .engine
                .with_connection(|conn| conn.round_trip().map_err(DbError::query))?;
            if value != 1 {
                return Err(DbError::UnexpectedResult {
                    expected: 1,
                    actual: value,
                });
            }
            samples.push(started.elapsed());
        }

        let result = BenchmarkResult::from_samples(samples, self.snapshot());
        tracing::debug!(
            iterations = count,
            total_ms = result.total_time.as_millis() as u64,
            "pool benchmark finished"
        );
        Ok(result)
    }
}
