use axum::{routing::get, Router};

use crate::api::controller::jobs_map::JobsMapController;
use crate::app_state::AppState;

pub fn jobs_map_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(JobsMapController::get_jobs_map))
        .route("/config", get(JobsMapController::get_map_config))
}
