//! Shared response types for the HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use casedesk_config::Settings;
use casedesk_db::{DbError, PoolStatus};
use serde::Serialize;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
///
/// Every variant renders as `{"status": "error", "message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        ApiError::InternalServerError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "status": "error",
            "message": message
        }));

        (status, body).into_response()
    }
}

/// The pool knobs echoed back by the diagnostic endpoints.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PoolConfig {
    pub pool_size: u32,
    pub max_overflow: u32,
    pub pool_recycle: u64,
    pub pool_pre_ping: bool,
    pub pool_timeout: u64,
}

impl PoolConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let pool = settings.pool();
        Self {
            pool_size: pool.pool_size,
            max_overflow: pool.max_overflow,
            pool_recycle: pool.pool_recycle,
            pool_pre_ping: pool.pool_pre_ping,
            pool_timeout: pool.pool_timeout,
        }
    }
}

/// Response body for `GET /debug/pool-status`.
#[derive(Debug, Serialize)]
pub struct PoolStatusResponse {
    pub status: &'static str,
    pub pool_status: PoolStatus,
    pub config: PoolConfig,
}

/// Response body for `GET /debug/test-pool-performance`. Times are in
/// seconds, rounded to four decimal places.
#[derive(Debug, Serialize)]
pub struct PerformanceResponse {
    pub status: &'static str,
    pub total_queries: i64,
    pub total_time: f64,
    pub avg_time: f64,
    pub min_time: f64,
    pub max_time: f64,
    pub pool_status: PoolStatus,
}

/// Result of the check query reported by `GET /test-db`.
#[derive(Debug, Serialize)]
pub struct CheckData {
    pub result: i64,
}

/// Response body for `GET /test-db`.
#[derive(Debug, Serialize)]
pub struct TestDbResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CheckData>,
    pub pool_status: PoolStatus,
    pub config: PoolConfig,
}

/// Response body for `GET /debug/routes`.
#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    pub routes: Vec<String>,
}

/// Rounds a duration in seconds to four decimal places.
pub(crate) fn round_secs(duration: std::time::Duration) -> f64 {
    (duration.as_secs_f64() * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn invalid_argument_renders_500_envelope() {
        let response = ApiError::from(DbError::InvalidArgument("count must be positive".into()))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["message"], "invalid argument: count must be positive");
    }

    #[test]
    fn driver_errors_are_internal() {
        let err = ApiError::from(DbError::UnexpectedResult {
            expected: 1,
            actual: 2,
        });
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn seconds_round_to_four_places() {
        assert_eq!(round_secs(Duration::from_micros(123_456)), 0.1235);
        assert_eq!(round_secs(Duration::ZERO), 0.0);
        assert_eq!(round_secs(Duration::from_secs(2)), 2.0);
    }
}
