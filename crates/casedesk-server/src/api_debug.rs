//! Debug endpoints for pool introspection and route listing.
//!
//! The pool routes are mounted when debug mode or `ENABLE_POOL_MONITOR`
//! is on. The route listing is mounted in debug mode only.

use crate::api::{
    round_secs, ApiError, PerformanceResponse, PoolConfig, PoolStatusResponse, RoutesResponse,
};
use crate::blueprints::{AppRouter, RouteTable};
use crate::AppState;
use axum::extract::{Extension, Query};
use axum::routing::get;
use axum::Json;
use casedesk_db::DriverConnection;
use r2d2::ManageConnection;
use serde::Deserialize;
use std::sync::Arc;

/// Iterations run when `count` is absent or not an integer.
pub const DEFAULT_BENCHMARK_COUNT: i64 = 10;

/// Largest `count` the endpoint will run.
pub const MAX_BENCHMARK_COUNT: i64 = 10_000;

/// Adds the pool introspection routes.
pub fn register_pool_routes<M>(router: AppRouter) -> AppRouter
where
    M: ManageConnection,
    M::Connection: DriverConnection,
{
    router
        .route("/debug/pool-status", get(pool_status_handler::<M>))
        .route(
            "/debug/test-pool-performance",
            get(pool_performance_handler::<M>),
        )
}

/// Adds the route listing.
pub fn register_route_listing(router: AppRouter) -> AppRouter {
    router.route("/debug/routes", get(routes_handler))
}

/// Handler for `GET /debug/pool-status`.
pub async fn pool_status_handler<M>(
    Extension(state): Extension<Arc<AppState<M>>>,
) -> Json<PoolStatusResponse>
where
    M: ManageConnection,
    M::Connection: DriverConnection,
{
    Json(PoolStatusResponse {
        status: "success",
        pool_status: state.monitor.snapshot(),
        config: PoolConfig::from_settings(&state.settings),
    })
}

/// Query parameters for `GET /debug/test-pool-performance`.
///
/// `count` is kept as a string so that an empty or non-numeric value falls
/// back to [`DEFAULT_BENCHMARK_COUNT`] instead of failing extraction.
#[derive(Debug, Deserialize)]
pub struct PerformanceQuery {
    pub count: Option<String>,
}

impl PerformanceQuery {
    fn iterations(&self) -> i64 {
        self.count
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(DEFAULT_BENCHMARK_COUNT)
    }
}

/// Handler for `GET /debug/test-pool-performance?count=N`.
///
/// Acquires, queries and releases a pooled connection `count` times on a
/// blocking thread. A non-positive count, a count above
/// [`MAX_BENCHMARK_COUNT`] and any driver failure all end in a 500.
pub async fn pool_performance_handler<M>(
    Extension(state): Extension<Arc<AppState<M>>>,
    Query(query): Query<PerformanceQuery>,
) -> Result<Json<PerformanceResponse>, ApiError>
where
    M: ManageConnection,
    M::Connection: DriverConnection,
{
    let count = query.iterations();
    if count > MAX_BENCHMARK_COUNT {
        return Err(ApiError::InternalServerError(format!(
            "count must be at most {MAX_BENCHMARK_COUNT}, got {count}"
        )));
    }
    let monitor = state.monitor.clone();

    let result = tokio::task::spawn_blocking(move || monitor.benchmark(count))
        .await
        .map_err(|e| ApiError::InternalServerError(format!("benchmark task failed: {e}")))?
        .map_err(|e| {
            tracing::warn!(error = %e, count, "pool benchmark failed");
            ApiError::from(e)
        })?;

    Ok(Json(PerformanceResponse {
        status: "success",
        total_queries: count,
        total_time: round_secs(result.total_time),
        avg_time: round_secs(result.avg_time),
        min_time: round_secs(result.min_time),
        max_time: round_secs(result.max_time),
        pool_status: result.pool_status,
    }))
}

/// Handler for `GET /debug/routes`.
pub async fn routes_handler(Extension(table): Extension<Arc<RouteTable>>) -> Json<RoutesResponse> {
    Json(RoutesResponse {
        routes: table.routes().to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(count: Option<&str>) -> PerformanceQuery {
        PerformanceQuery {
            count: count.map(str::to_string),
        }
    }

    #[test]
    fn count_defaults_to_ten() {
        assert_eq!(query(None).iterations(), 10);
    }

    #[test]
    fn count_is_parsed() {
        assert_eq!(query(Some("25")).iterations(), 25);
        assert_eq!(query(Some(" 7 ")).iterations(), 7);
        assert_eq!(query(Some("-3")).iterations(), -3);
    }

    #[test]
    fn empty_or_garbage_count_falls_back_to_default() {
        assert_eq!(query(Some("")).iterations(), DEFAULT_BENCHMARK_COUNT);
        assert_eq!(query(Some("ten")).iterations(), DEFAULT_BENCHMARK_COUNT);
        assert_eq!(query(Some("2.5")).iterations(), DEFAULT_BENCHMARK_COUNT);
    }
}
