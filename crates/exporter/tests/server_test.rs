#![cfg(feature = "server")]

use axum::http::StatusCode;
use report_exporter::{metrics, orchestrator::LastCycle, server::Server};
use std::sync::Arc;
use tokio::sync::RwLock;

#[tokio::test]
async fn test_health_before_first_cycle() {
    let last_cycle: LastCycle = Arc::new(RwLock::new(None));
    let app = Server::new("prod", last_cycle).build_router();
    let client = axum_test::TestServer::new(app).unwrap();

    let response = client.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cluster"], "prod");
    assert!(body["lastCycle"].is_null());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    metrics::register_metrics();
    metrics::CYCLES_TOTAL.inc();

    let last_cycle: LastCycle = Arc::new(RwLock::new(None));
    let app = Server::new("prod", last_cycle).build_router();
    let client = axum_test::TestServer::new(app).unwrap();

    let response = client.get("/metrics").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert!(response.text().contains("report_exporter_cycles_total"));
}
