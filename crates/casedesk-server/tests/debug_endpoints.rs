mod common;

use axum::http::StatusCode;
use casedesk_config::Environment;
use casedesk_server::create_app;
use common::{get, get_json, memory_engine, settings, unreachable_engine};
use std::sync::mpsc;
use std::thread;

#[tokio::test]
async fn pool_status_tracks_held_connections() {
    let settings = settings(Environment::Development, &[]);
    let engine = memory_engine(&settings);
    let app = create_app(settings, engine.clone()).unwrap();

    let (status, json) = get_json(&app, "/debug/pool-status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["pool_status"]["size"], 2);
    assert_eq!(json["pool_status"]["checked_out"], 0);
    assert_eq!(json["pool_status"]["pool_class"], "SqliteConnectionManager");
    assert_eq!(json["config"]["pool_size"], 2);
    assert_eq!(json["config"]["max_overflow"], 1);
    assert_eq!(json["config"]["pool_recycle"], 3600);
    assert_eq!(json["config"]["pool_pre_ping"], true);
    assert_eq!(json["config"]["pool_timeout"], 2);

    let (held_tx, held_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let holder = thread::spawn(move || {
        let _conn = engine.get().expect("holder should get a connection");
        held_tx.send(()).unwrap();
        let _ = release_rx.recv();
    });
    held_rx.recv().unwrap();

    let (_, json) = get_json(&app, "/debug/pool-status").await;
    assert_eq!(json["pool_status"]["checked_out"], 1);

    release_tx.send(()).unwrap();
    holder.join().unwrap();

    let (_, json) = get_json(&app, "/debug/pool-status").await;
    assert_eq!(json["pool_status"]["checked_out"], 0);
}

#[tokio::test]
async fn performance_defaults_to_ten_queries() {
    let settings = settings(Environment::Development, &[]);
    let engine = memory_engine(&settings);
    let app = create_app(settings, engine).unwrap();

    let (status, json) = get_json(&app, "/debug/test-pool-performance").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["total_queries"], 10);

    let total = json["total_time"].as_f64().unwrap();
    let min = json["min_time"].as_f64().unwrap();
    let max = json["max_time"].as_f64().unwrap();
    assert!(min <= max);
    assert!(max <= total + 0.0001);
    assert_eq!(json["pool_status"]["checked_out"], 0);
}

#[tokio::test]
async fn performance_honours_count() {
    let settings = settings(Environment::Development, &[]);
    let engine = memory_engine(&settings);
    let app = create_app(settings, engine).unwrap();

    let (status, json) = get_json(&app, "/debug/test-pool-performance?count=3").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_queries"], 3);
}

#[tokio::test]
async fn performance_rejects_out_of_range_counts() {
    let settings = settings(Environment::Development, &[]);
    let engine = memory_engine(&settings);
    let app = create_app(settings, engine).unwrap();

    for uri in [
        "/debug/test-pool-performance?count=0",
        "/debug/test-pool-performance?count=-5",
        "/debug/test-pool-performance?count=20000",
    ] {
        let (status, json) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(json["status"], "error", "{uri}");
        assert!(json["message"].as_str().is_some_and(|m| !m.is_empty()), "{uri}");
    }
}

#[tokio::test]
async fn performance_falls_back_to_default_for_non_numeric_counts() {
    let settings = settings(Environment::Development, &[]);
    let engine = memory_engine(&settings);
    let app = create_app(settings, engine).unwrap();

    for uri in [
        "/debug/test-pool-performance?count=abc",
        "/debug/test-pool-performance?count=",
    ] {
        let (status, json) = get_json(&app, uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(json["status"], "success", "{uri}");
        assert_eq!(json["total_queries"], 10, "{uri}");
    }
}

#[tokio::test]
async fn performance_surfaces_driver_failures() {
    let settings = settings(Environment::Testing, &[("ENABLE_POOL_MONITOR", "true")]);
    let app = create_app(settings, unreachable_engine()).unwrap();

    let (status, json) = get_json(&app, "/debug/test-pool-performance?count=2").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], "error");
    assert!(json["message"].as_str().unwrap().contains("connection pool error"));
}

#[tokio::test]
async fn debug_routes_hidden_outside_debug() {
    let settings = settings(Environment::Testing, &[]);
    let engine = memory_engine(&settings);
    let app = create_app(settings, engine).unwrap();

    for uri in [
        "/debug/pool-status",
        "/debug/test-pool-performance",
        "/debug/routes",
    ] {
        assert_eq!(get(&app, uri).await.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn monitor_flag_enables_pool_routes_only() {
    let settings = settings(Environment::Testing, &[("ENABLE_POOL_MONITOR", "yes")]);
    let engine = memory_engine(&settings);
    let app = create_app(settings, engine).unwrap();

    let (status, json) = get_json(&app, "/debug/pool-status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(
        get(&app, "/debug/routes").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn route_listing_is_sorted() {
    let settings = settings(Environment::Development, &[]);
    let engine = memory_engine(&settings);
    let app = create_app(settings, engine).unwrap();

    let (status, json) = get_json(&app, "/debug/routes").await;
    assert_eq!(status, StatusCode::OK);
    let routes: Vec<&str> = json["routes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r.as_str().unwrap())
        .collect();
    assert_eq!(
        routes,
        [
            "/",
            "/debug/pool-status",
            "/debug/routes",
            "/debug/test-pool-performance",
            "/health",
            "/test-db",
        ]
    );
}
