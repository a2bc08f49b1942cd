//! Liveness and database connectivity checks.

use super::{AppRouter, Blueprint};
use crate::api::{ApiError, PoolConfig, CheckData, TestDbResponse};
use crate::AppState;
use axum::extract::Extension;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use casedesk_db::{HealthCheckResult, DriverConnection};
use r2d2::ManageConnection;
use serde_json::{json, Value};
use std::sync::Arc;

pub fn blueprint<M>() -> Blueprint
where
    M: ManageConnection,
    M::Connection: DriverConnection,
{
    Blueprint {
        name: "system",
        register: register::<M>,
        schema: &[],
    }
}

fn register<M>(router: AppRouter) -> AppRouter
where
    M: ManageConnection,
    M::Connection: DriverConnection,
{
    router
        .route("/health", get(health))
        .route("/test-db", get(test_db_handler::<M>))
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Handler for `GET /test-db`.
///
/// Runs the pool health check and reports it with the current pool
/// counters. An unreachable database yields HTTP 500 with
/// `status: "error"`.
pub async fn test_db_handler<M>(
    Extension(state): Extension<Arc<AppState<M>>>,
) -> Result<(StatusCode, Json<TestDbResponse>), ApiError>
where
    M: ManageConnection,
    M::Connection: DriverConnection,
{
    let monitor = state.monitor.clone();
    let health = tokio::task::spawn_blocking(move || monitor.health_check())
        .await
        .map_err(|e| ApiError::InternalServerError(format!("health check task failed: {e}")))?;

    let config = PoolConfig::from_settings(&state.settings);
    let pool_status = state.monitor.snapshot();

    let (status, body) = match health {
        HealthCheckResult::Healthy { .. } => (
            StatusCode::OK,
            TestDbResponse {
                status: "success",
                message: "Database connection successful".to_string(),
                data: Some(CheckData { result: 1 }),
                pool_status,
                config,
            },
        ),
        HealthCheckResult::Unhealthy { message, .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            TestDbResponse {
                status: "error",
                message,
                data: None,
                pool_status,
                config,
            },
        ),
    };

    Ok((status, Json(body)))
}
