//! casedesk server binary.
//!
//! Loads `.env`, resolves the application profile, builds the PostgreSQL
//! engine and serves the application with graceful shutdown on
//! SIGTERM/SIGINT.

use casedesk_config::{EnvMap, Settings};
use casedesk_server::{config, create_app, extensions::pool_settings};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("CASEDESK_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = match config::load_config(selected_config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match dotenv {
        Ok(path) => tracing::info!(path = %path.display(), "loaded environment file"),
        Err(e) if e.not_found() => tracing::debug!("no .env file found"),
        Err(e) => tracing::warn!(error = %e, "failed to load .env file"),
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    let settings = match Settings::resolve(None, &EnvMap::from_process()) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "invalid application configuration");
            std::process::exit(1);
        }
    };

    let engine = match casedesk_db::create_postgres_engine(
        &settings.database_uri(),
        pool_settings(settings.pool()),
    ) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "failed to create database engine");
            std::process::exit(1);
        }
    };

    // Development startup touches the database; keep it off the runtime threads.
    let app = match tokio::task::spawn_blocking(move || create_app(settings, engine)).await {
        Ok(Ok(app)) => app,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "failed to build application");
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!(error = %e, "application startup task failed");
            std::process::exit(1);
        }
    };

    let addr = SocketAddr::new(config.server.host, config.server.port);
    tracing::info!(%addr, "starting casedesk server");

    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind listener");
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!(error = %e, "server error");
        std::process::exit(1);
    }

    tracing::info!("casedesk server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
