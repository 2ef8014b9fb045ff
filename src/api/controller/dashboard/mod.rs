//! Dashboard controller: the HTML page with inputs and the map

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Response};
use http::header::CACHE_CONTROL;
use validator::Validate;

use crate::app_state::AppState;
use crate::domain::jobs_map::dto::jobs_map_request::JobsMapRequest;
use crate::domain::map::kepler_config::kepler_map_config;
use crate::errors::{internal_error, AppError};

pub struct DashboardController;

impl DashboardController {
    pub async fn page(
        State(state): State<AppState>,
        Query(req): Query<JobsMapRequest>,
    ) -> Result<Response, AppError> {
        req.validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let params = req.resolve(&state.dashboard);

        let view = state.jobs_map_service.load(params).await?;
        let html = state
            .map_renderer
            .render_page(&view, &kepler_map_config())
            .map_err(internal_error)?;

        Ok(([(CACHE_CONTROL, "no-store")], Html(html)).into_response())
    }
}
