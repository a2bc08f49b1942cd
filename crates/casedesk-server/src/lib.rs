//! casedesk application bootstrapper.
//!
//! [`create_app`] turns a resolved [`Settings`] profile and a database
//! [`Engine`] into an axum [`Router`]: it attaches the pool monitor,
//! constructs the mail and CORS extensions, registers every blueprint and
//! the debug routes, and in development creates the schema and runs a
//! startup health check.

pub mod api;
pub mod api_debug;
pub mod blueprints;
pub mod config;
pub mod extensions;

use axum::{Extension, Router};
use blueprints::{register_blueprints, AppRouter, Blueprint};
use casedesk_config::{Environment, Settings};
use casedesk_db::{DbError, Engine, MonitorOptions, PoolMonitor, DriverConnection};
use extensions::{cors_layer, Mailer};
use r2d2::ManageConnection;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
pub struct AppState<M: ManageConnection> {
    /// The resolved configuration profile.
    pub settings: Arc<Settings>,
    /// The process-wide database engine.
    pub engine: Engine<M>,
    /// Pool diagnostics over `engine`.
    pub monitor: PoolMonitor<M>,
    /// Outbound mail settings.
    pub mailer: Arc<Mailer>,
}

impl<M: ManageConnection> Clone for AppState<M> {
    fn clone(&self) -> Self {
        Self {
            settings: Arc::clone(&self.settings),
            engine: self.engine.clone(),
            monitor: self.monitor.clone(),
            mailer: Arc::clone(&self.mailer),
        }
    }
}

/// Errors that abort application construction.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Two routes were registered under the same path.
    #[error("route registered twice: {0}")]
    DuplicateRoute(String),

    /// Development schema creation failed.
    #[error("failed to create database schema: {0}")]
    Schema(#[source] DbError),
}

/// Builds the application with every registered blueprint.
///
/// # Errors
///
/// See [`create_app_with`].
pub fn create_app<M>(settings: Settings, engine: Engine<M>) -> Result<Router, BootstrapError>
where
    M: ManageConnection,
    M::Connection: DriverConnection,
{
    create_app_with(settings, engine, &blueprints::registry::<M>())
}

/// Builds the application with an explicit blueprint list.
///
/// Blocks on the database in the development profile, where the schema
/// is created and the startup health check runs before this returns.
///
/// # Errors
///
/// Returns [`BootstrapError::DuplicateRoute`] if two blueprints claim the
/// same path, and [`BootstrapError::Schema`] if development schema
/// creation fails.
pub fn create_app_with<M>(
    settings: Settings,
    engine: Engine<M>,
    blueprints: &[Blueprint],
) -> Result<Router, BootstrapError>
where
    M: ManageConnection,
    M::Connection: DriverConnection,
{
    let settings = Arc::new(settings);
    tracing::info!(
        environment = %settings.environment,
        database = %settings.redacted_database_uri(),
        pool_class = %engine.pool_class(),
        "creating application"
    );

    let monitor = PoolMonitor::attach(
        &engine,
        MonitorOptions {
            debug: settings.debug(),
            echo_pool: settings.pool().echo_pool,
        },
    );

    let mailer = Arc::new(Mailer::from_options(&settings.mail));
    tracing::debug!(
        transport = %mailer.transport_url(),
        authenticated = mailer.has_credentials(),
        "mail extension initialized"
    );

    let mut router = register_blueprints(AppRouter::new(), blueprints);
    if settings.pool_monitor_enabled() {
        router = api_debug::register_pool_routes::<M>(router);
        tracing::info!("pool monitor routes enabled");
    }
    if settings.debug() {
        router = api_debug::register_route_listing(router);
    }
    let (router, routes) = router.finish()?;

    if settings.environment == Environment::Development {
        create_schema(&engine, blueprints)?;
        log_startup_health(&monitor);
    }

    let cors = cors_layer(&settings.features.cors_origins);
    let state = AppState {
        settings,
        engine,
        monitor,
        mailer,
    };

    Ok(router
        .layer(Extension(Arc::new(routes)))
        .layer(Extension(Arc::new(state)))
        .layer(cors)
        .layer(TraceLayer::new_for_http()))
}

/// Runs every blueprint's DDL in one transaction. Does nothing when no
/// blueprint declares a schema.
///
/// # Errors
///
/// Returns [`BootstrapError::Schema`] if a connection cannot be acquired or
/// any statement fails. The transaction is rolled back in that case.
pub fn create_schema<M>(engine: &Engine<M>, blueprints: &[Blueprint]) -> Result<(), BootstrapError>
where
    M: ManageConnection,
    M::Connection: DriverConnection,
{
    let statements: Vec<&str> = blueprints
        .iter()
        .flat_map(|blueprint| blueprint.schema.iter().copied())
        .collect();
    if statements.is_empty() {
        return Ok(());
    }

    engine
        .with_session(|conn| {
            for statement in &statements {
                conn.run_batch(statement).map_err(DbError::query)?;
            }
            Ok::<_, DbError>(())
        })
        .map_err(BootstrapError::Schema)?;

    tracing::info!(statements = statements.len(), "database schema created");
    Ok(())
}

fn log_startup_health<M>(monitor: &PoolMonitor<M>)
where
    M: ManageConnection,
    M::Connection: DriverConnection,
{
    let health = monitor.health_check();
    if health.is_healthy() {
        tracing::info!(pool_status = ?monitor.snapshot(), "{}", health.message());
    } else {
        tracing::warn!("{}", health.message());
    }
}
