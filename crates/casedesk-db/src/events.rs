//! Pool lifecycle observers.
//!
//! The driver pool accepts exactly one event handler and one connection
//! customizer, both fixed at construction. [`EventDispatcher`] is installed
//! in both slots and fans events out to any number of [`PoolObserver`]s,
//! which can be attached and detached while the pool is live.

use r2d2::event::{AcquireEvent, CheckinEvent, CheckoutEvent, ReleaseEvent};
use r2d2::{CustomizeConnection, HandleEvent};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Passed to [`PoolObserver::on_connect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectInfo {
    /// The configured base pool size.
    pub pool_size: u32,
}

/// Passed to [`PoolObserver::on_checkout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutInfo {
    /// Driver-assigned connection identifier.
    pub connection_id: u64,
    /// Time the caller waited for the connection.
    pub wait: Duration,
    /// Connections held by callers, including this one.
    pub checked_out: u32,
}

/// Passed to [`PoolObserver::on_checkin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckinInfo {
    /// Driver-assigned connection identifier.
    pub connection_id: u64,
    /// Time the connection was held.
    pub held: Duration,
    /// Open connections not held by any caller, including this one.
    pub checked_in: u32,
}

/// Receives connection lifecycle callbacks from an [`Engine`](crate::Engine).
///
/// Observers are identified by [`name`](PoolObserver::name): attaching an
/// observer replaces any observer already registered under the same name.
/// Callbacks run on the thread that triggered the event and must not block.
pub trait PoolObserver<C>: Send + Sync + 'static {
    /// Registration key.
    fn name(&self) -> &str;

    /// A physical connection was established. Runs before the connection
    /// enters the pool; it cannot fail the connection.
    fn on_connect(&self, _conn: &mut C, _info: &ConnectInfo) {}

    /// A connection was handed to a caller.
    fn on_checkout(&self, _info: &CheckoutInfo) {}

    /// A connection was returned to the pool.
    fn on_checkin(&self, _info: &CheckinInfo) {}
}

pub(crate) struct EventDispatcher<C: 'static> {
    pool_size: u32,
    observers: RwLock<Vec<Arc<dyn PoolObserver<C>>>>,
    open: AtomicU32,
    checked_out: AtomicU32,
}

impl<C: 'static> EventDispatcher<C> {
    pub(crate) fn new(pool_size: u32) -> Self {
        Self {
            pool_size,
            observers: RwLock::new(Vec::new()),
            open: AtomicU32::new(0),
            checked_out: AtomicU32::new(0),
        }
    }

    /// Removes any observer with the same name, then registers `observer`.
    pub(crate) fn attach(&self, observer: Arc<dyn PoolObserver<C>>) {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        observers.retain(|existing| existing.name() != observer.name());
        observers.push(observer);
    }

    /// Returns `false` if no observer was registered under `name`.
    pub(crate) fn detach(&self, name: &str) -> bool {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|existing| existing.name() != name);
        observers.len() != before
    }

    pub(crate) fn observer_names(&self) -> Vec<String> {
        self.snapshot()
            .iter()
            .map(|observer| observer.name().to_string())
            .collect()
    }

    // Callbacks run on a copy so an observer may attach or detach without
    // deadlocking on the registry lock.
    fn snapshot(&self) -> Vec<Arc<dyn PoolObserver<C>>> {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<C: 'static> fmt::Debug for EventDispatcher<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("pool_size", &self.pool_size)
            .field("observers", &self.observer_names())
            .field("open", &self.open.load(Ordering::Relaxed))
            .field("checked_out", &self.checked_out.load(Ordering::Relaxed))
            .finish()
    }
}

/// Adapter installed as the pool's event handler and connection customizer.
pub(crate) struct DispatchHook<C: 'static>(pub(crate) Arc<EventDispatcher<C>>);

impl<C: 'static> fmt::Debug for DispatchHook<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DispatchHook").field(&self.0).finish()
    }
}

impl<C: Send + 'static> HandleEvent for DispatchHook<C> {
    fn handle_acquire(&self, _event: AcquireEvent) {
        self.0.open.fetch_add(1, Ordering::AcqRel);
    }

    fn handle_release(&self, _event: ReleaseEvent) {
        let _ = self
            .0
            .open
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    fn handle_checkout(&self, event: CheckoutEvent) {
        let checked_out = self.0.checked_out.fetch_add(1, Ordering::AcqRel) + 1;
        let info = CheckoutInfo {
            connection_id: event.connection_id(),
            wait: event.duration(),
            checked_out,
        };
        for observer in self.0.snapshot() {
            observer.on_checkout(&info);
        }
    }

    fn handle_checkin(&self, event: CheckinEvent) {
        let checked_out = self
            .0
            .checked_out
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .map(|previous| previous - 1)
            .unwrap_or(0);
        let open = self.0.open.load(Ordering::Acquire);
        let info = CheckinInfo {
            connection_id: event.connection_id(),
            held: event.duration(),
            checked_in: open.saturating_sub(checked_out),
        };
        for observer in self.0.snapshot() {
            observer.on_checkin(&info);
        }
    }
}

impl<C: Send + 'static, E: 'static> CustomizeConnection<C, E> for DispatchHook<C> {
    fn on_acquire(&self, conn: &mut C) -> Result<(), E> {
        let info = ConnectInfo {
            pool_size: self.0.pool_size,
        };
        for observer in self.0.snapshot() {
            observer.on_connect(conn, &info);
        }
        Ok(())
    }
}
