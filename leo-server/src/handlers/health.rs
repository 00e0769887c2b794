use axum::Json;
use serde_json::{json, Value};

/// Liveness only; `/api/performance` is the readiness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
