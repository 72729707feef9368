use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::error::CvAgentError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<CvAgentError> for ApiError {
    fn from(err: CvAgentError) -> Self {
        match err {
            CvAgentError::TaskNotFound(id) => ApiError::NotFound(id),
            CvAgentError::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            ApiError::NotFound(id) => (StatusCode::NOT_FOUND, "Task not found", id),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "Bad request", msg),
            ApiError::Internal(err) => {
                log::error!("Internal error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error", err)
            }
        };

        (status, Json(json!({ "error": message, "details": details }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
