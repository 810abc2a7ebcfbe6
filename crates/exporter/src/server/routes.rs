use std::sync::Arc;

use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde_json::{json, Value};

use super::ServerState;
use crate::metrics;

pub async fn health(State(state): State<Arc<ServerState>>) -> Json<Value> {
    let last_cycle = state.last_cycle.read().await.clone();
    Json(json!({
        "status": "healthy",
        "cluster": state.cluster_name,
        "lastCycle": last_cycle,
    }))
}

pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}
