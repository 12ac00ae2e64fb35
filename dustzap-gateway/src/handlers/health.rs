// Health check handler (ambient, spec.md §6 "Added ambient endpoints").
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let context_count = state.context_store.len().await;
    state.metrics.record_http_request("GET", "/health", 200);
    Json(json!({
        "status": "ok",
        "service": "dustzap-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().timestamp(),
        "contextStoreSize": context_count,
    }))
}
