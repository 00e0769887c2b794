use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn clear_cache(State(state): State<Arc<AppState>>) -> Json<Value> {
    state.cache.clear();
    Json(json!({ "message": "Cache cleared successfully" }))
}
