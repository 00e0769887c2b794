use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use leo_llm::MODEL_CONFIGS;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn performance(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let probe = Arc::clone(&state);
    let system_stats = tokio::task::spawn_blocking(move || probe.system.snapshot())
        .await
        .map_err(ApiError::internal)?;

    let model_configs: BTreeMap<&str, Value> = MODEL_CONFIGS
        .iter()
        .map(|(name, config)| {
            (
                *name,
                json!({
                    "timeout": config.timeout.as_secs_f64(),
                    "priority": config.priority,
                }),
            )
        })
        .collect();

    Ok(Json(json!({
        "cache_stats": state.cache.stats(),
        "system_stats": system_stats,
        "status": "healthy",
        "optimizations": {
            "gzip_compression": "enabled",
            "response_caching": "enabled",
            "model_optimization": "enabled",
            "streaming_optimization": "enabled",
            "parallel_processing": "enabled",
            "concurrent_requests": "optimized",
        },
        "model_configs": model_configs,
        "monitor": state.monitor.stats(),
    })))
}
