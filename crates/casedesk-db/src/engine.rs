//! The process-wide database engine: a driver pool plus its observers.

use crate::connection::DriverConnection;
use crate::error::DbError;
use crate::events::{DispatchHook, EventDispatcher, PoolObserver};
use r2d2::{ManageConnection, Pool, PooledConnection};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Pool tuning applied when the engine is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    /// Connections the pool is sized for.
    pub pool_size: u32,
    /// Connections allowed beyond `pool_size` under load.
    pub max_overflow: u32,
    /// Maximum connection age. `None` keeps connections indefinitely.
    pub recycle: Option<Duration>,
    /// Validate each connection before handing it out.
    pub pre_ping: bool,
    /// Maximum wait for a free connection.
    pub timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            pool_size: 10,
            max_overflow: 20,
            recycle: Some(Duration::from_secs(3600)),
            pre_ping: true,
            timeout: Duration::from_secs(30),
        }
    }
}

impl PoolSettings {
    /// Hard upper bound on open connections.
    pub fn max_connections(&self) -> u32 {
        self.pool_size.saturating_add(self.max_overflow)
    }
}

/// A point-in-time read of pool counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatus {
    /// Configured base pool size.
    pub size: u32,
    /// Open connections idle in the pool.
    pub checked_in: u32,
    /// Open connections held by callers.
    pub checked_out: u32,
    /// Open connections beyond `size`; negative while the pool is below size.
    pub overflow: i64,
    /// Name of the driver's connection manager.
    pub pool_class: String,
}

/// A connection pool with lifecycle observers.
///
/// Cloning is cheap and every clone shares the same pool and observer
/// registry. Connections are opened lazily, so building an engine never
/// blocks on the database.
pub struct Engine<M: ManageConnection> {
    pool: Pool<M>,
    events: Arc<EventDispatcher<M::Connection>>,
    settings: PoolSettings,
}

impl<M: ManageConnection> Clone for Engine<M> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            events: Arc::clone(&self.events),
            settings: self.settings,
        }
    }
}

impl<M: ManageConnection> fmt::Debug for Engine<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("pool_class", &self.pool_class())
            .field("settings", &self.settings)
            .field("events", &self.events)
            .finish()
    }
}

impl<M: ManageConnection> Engine<M> {
    /// Builds the driver pool with the lifecycle dispatcher installed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidArgument`] for a pool that could never
    /// hand out a connection or a zero timeout, and [`DbError::Pool`] if
    /// the driver rejects the configuration.
    pub fn build(manager: M, settings: PoolSettings) -> Result<Self, DbError> {
        if settings.max_connections() == 0 {
            return Err(DbError::InvalidArgument(
                "pool must allow at least one connection".to_string(),
            ));
        }
        if settings.timeout.is_zero() {
            return Err(DbError::InvalidArgument(
                "acquisition timeout must be positive".to_string(),
            ));
        }

        let events = Arc::new(EventDispatcher::new(settings.pool_size));
        let pool = Pool::builder()
            .max_size(settings.max_connections())
            .min_idle(Some(0))
            .max_lifetime(settings.recycle.filter(|age| !age.is_zero()))
            .connection_timeout(settings.timeout)
            .test_on_check_out(settings.pre_ping)
            .event_handler(Box::new(DispatchHook(Arc::clone(&events))))
            .connection_customizer(Box::new(DispatchHook(Arc::clone(&events))))
            .build(manager)?;

        tracing::debug!(
            pool_size = settings.pool_size,
            max_overflow = settings.max_overflow,
            pre_ping = settings.pre_ping,
            timeout_ms = settings.timeout.as_millis() as u64,
            "database engine created"
        );

        Ok(Self {
            pool,
            events,
            settings,
        })
    }

    pub fn settings(&self) -> &PoolSettings {
        &self.settings
    }

    /// Registers an observer, replacing any observer with the same name.
    pub fn attach(&self, observer: Arc<dyn PoolObserver<M::Connection>>) {
        self.events.attach(observer);
    }

    /// Removes the observer registered under `name`. Returns `false` if
    /// there was none.
    pub fn detach(&self, name: &str) -> bool {
        self.events.detach(name)
    }

    /// Names of the registered observers, in registration order.
    pub fn observers(&self) -> Vec<String> {
        self.events.observer_names()
    }

    /// Reads the pool counters without acquiring a connection.
    pub fn status(&self) -> PoolStatus {
        let state = self.pool.state();
        PoolStatus {
            size: self.settings.pool_size,
            checked_in: state.idle_connections,
            checked_out: state.connections.saturating_sub(state.idle_connections),
            overflow: i64::from(state.connections) - i64::from(self.settings.pool_size),
            pool_class: self.pool_class(),
        }
    }

    /// Short name of the connection manager type, e.g. `SqliteConnectionManager`.
    pub fn pool_class(&self) -> String {
        short_type_name(std::any::type_name::<M>())
    }

    /// Acquires a connection, blocking up to the configured timeout. The
    /// connection returns to the pool when dropped.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Pool`] on timeout or connection failure.
    pub fn get(&self) -> Result<PooledConnection<M>, DbError> {
        Ok(self.pool.get()?)
    }
}

impl<M> Engine<M>
where
    M: ManageConnection,
    M::Connection: DriverConnection,
{
    /// Runs `f` with a pooled connection.
    ///
    /// The connection is released on every exit path, and any transaction
    /// `f` left open is rolled back before it returns to the pool. Errors
    /// are logged and returned unchanged.
    pub fn with_connection<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut M::Connection) -> Result<T, E>,
        E: From<DbError> + fmt::Display,
    {
        let mut conn = self.get().map_err(|e| {
            tracing::error!(error = %e, "database connection error");
            E::from(e)
        })?;
        let guard = ResetOnReturn { conn: &mut *conn };
        let result = f(&mut *guard.conn);
        if let Err(e) = &result {
            tracing::error!(error = %e, "database connection error");
        }
        result
    }

    /// Runs `f` inside a transaction on a pooled connection.
    ///
    /// Commits when `f` succeeds. When `f` fails, or the commit itself
    /// fails, the transaction is rolled back before the connection returns
    /// to the pool and the error is returned to the caller. A panic in `f`
    /// also rolls back.
    pub fn with_session<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut M::Connection) -> Result<T, E>,
        E: From<DbError> + fmt::Display,
    {
        let mut conn = self.get()?;
        conn.run_batch("BEGIN").map_err(DbError::query)?;

        let mut session = Session {
            conn: &mut *conn,
            open: true,
        };
        match f(&mut *session.conn) {
            Ok(value) => {
                session.conn.run_batch("COMMIT").map_err(|e| {
                    tracing::error!(error = %e, "database session commit failed");
                    DbError::query(e)
                })?;
                session.open = false;
                Ok(value)
            }
            Err(e) => {
                tracing::error!(error = %e, "database session error");
                Err(e)
            }
        }
    }
}

/// Rolls back whatever the caller left open when the connection is released.
struct ResetOnReturn<'a, C: DriverConnection> {
    conn: &'a mut C,
}

impl<C: DriverConnection> Drop for ResetOnReturn<'_, C> {
    fn drop(&mut self) {
        if let Err(e) = self.conn.reset() {
            tracing::warn!(error = %e, "failed to reset connection on return");
        }
    }
}

/// Rolls back on drop unless the transaction was committed.
struct Session<'a, C: DriverConnection> {
    conn: &'a mut C,
    open: bool,
}

impl<C: DriverConnection> Drop for Session<'_, C> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.run_batch("ROLLBACK") {
                tracing::warn!(error = %e, "database session rollback failed");
            }
        }
    }
}

fn short_type_name(full: &str) -> String {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}
