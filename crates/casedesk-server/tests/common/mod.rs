#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use casedesk_config::{EnvMap, Environment, Settings};
use casedesk_db::{create_sqlite_engine, PoolSettings, SqliteEngine};
use casedesk_server::extensions::pool_settings;
use serde_json::Value;
use std::time::Duration;
use tower::ServiceExt;

/// Resolves a profile with a small pool and the given extra variables.
pub fn settings(environment: Environment, extra: &[(&str, &str)]) -> Settings {
    let mut pairs = vec![
        ("POOL_SIZE", "2"),
        ("MAX_OVERFLOW", "1"),
        ("POOL_TIMEOUT", "2"),
    ];
    pairs.extend_from_slice(extra);
    Settings::resolve(Some(environment), &pairs.into_iter().collect::<EnvMap>())
        .expect("test settings should resolve")
}

/// An in-memory SQLite engine sized from `settings`.
pub fn memory_engine(settings: &Settings) -> SqliteEngine {
    create_sqlite_engine(":memory:", pool_settings(settings.pool()))
        .expect("failed to create engine")
}

/// An engine whose every acquisition fails quickly.
pub fn unreachable_engine() -> SqliteEngine {
    let settings = PoolSettings {
        pool_size: 1,
        max_overflow: 0,
        timeout: Duration::from_millis(200),
        ..PoolSettings::default()
    };
    create_sqlite_engine("/nonexistent-casedesk-dir/missing/cases.db", settings)
        .expect("building is lazy and should succeed")
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = get(app, uri).await;
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}
