//! System controller: health and query cache management

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::core::cache::ttl_cache::CacheStats;
use crate::errors::AppError;

pub struct SystemController;

impl SystemController {
    pub async fn cache_stats(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<CacheStats>>, AppError> {
        to_json(Ok(state.query_executor.cache_stats().await))
    }

    pub async fn clear_cache(
        State(state): State<AppState>,
    ) -> Result<Json<ApiResponse<Value>>, AppError> {
        let removed = state.query_executor.clear_cache().await;
        tracing::info!(removed, "Query cache cleared");
        to_json(Ok(json!({ "removed": removed })))
    }
}
