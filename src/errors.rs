use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

use crate::core::client::warehouse_error::WarehouseError;
use crate::domain::jobs_map::jobs_map_error::JobsMapError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Warehouse error: {0}")]
    WarehouseError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Helper for mapping any unknown error into internal error
pub fn internal_error<E: ToString>(err: E) -> AppError {
    AppError::InternalServerError(err.to_string())
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<JobsMapError>() {
            return match e {
                JobsMapError::ServerNotFound(_) => AppError::NotFound(e.to_string()),
            };
        }
        if let Some(e) = err.downcast_ref::<WarehouseError>() {
            return AppError::WarehouseError(e.to_string());
        }
        if let Some(e) = err.downcast_ref::<validator::ValidationErrors>() {
            return AppError::BadRequest(e.to_string());
        }
        // `{:#}` keeps the context chain in the message
        AppError::InternalServerError(format!("{:#}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::WarehouseError(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %self, "request failed");
        }

        let body = Json(json!({
            "message": self.to_string()
        }));

        (status, body).into_response()
    }
}
