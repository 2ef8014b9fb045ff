//! System routes (e.g., /api/v1/system/*)

use axum::{routing::{get, post}, Router};
use crate::api::controller::system::SystemController;
use crate::app_state::AppState;

pub fn system_routes() -> Router<AppState> {
    Router::new()
        .route("/cache", get(SystemController::cache_stats))
        .route("/cache/clear", post(SystemController::clear_cache))
}
