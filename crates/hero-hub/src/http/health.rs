use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness check with connection and collection counts.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (connections, counts) = {
        let hub = state.hub();
        (hub.connection_count(), hub.store().counts())
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
        "connections": connections,
        "counts": counts,
    }))
}
