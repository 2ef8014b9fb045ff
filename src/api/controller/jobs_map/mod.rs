use axum::extract::{Query, State};
use axum::Json;
use serde_json::Value;
use validator::Validate;

use crate::api::dto::ApiResponse;
use crate::api::util::json::to_json;
use crate::app_state::AppState;
use crate::domain::jobs_map::dto::jobs_map_request::JobsMapRequest;
use crate::domain::jobs_map::model::jobs_map_view::JobsMapView;
use crate::domain::map::kepler_config::kepler_map_config;
use crate::errors::AppError;

pub struct JobsMapController;

impl JobsMapController {
    pub async fn get_jobs_map(
        State(state): State<AppState>,
        Query(req): Query<JobsMapRequest>,
    ) -> Result<Json<ApiResponse<JobsMapView>>, AppError> {
        req.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let params = req.resolve(&state.dashboard);
        to_json(state.jobs_map_service.load(params).await)
    }

    pub async fn get_map_config() -> Result<Json<ApiResponse<Value>>, AppError> {
        to_json(Ok(kepler_map_config()))
    }
}
