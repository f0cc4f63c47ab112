use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Upload rejected before parsing: missing file, wrong extension,
    /// or required columns absent from the header.
    #[error("{0}")]
    Schema(String),
    /// The stream could not be read as tabular data, or a numeric cell
    /// failed coercion.
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<rusqlite::Error> for ApiError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<std::io::Error> for ApiError {
    fn from(value: std::io::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<csv::Error> for ApiError {
    fn from(value: csv::Error) -> Self {
        Self::Parse(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Parse failures are deliberately 500, matching the documented
        // upload contract: 400 is reserved for schema-level rejections.
        let status = match &self {
            ApiError::Schema(_) => StatusCode::BAD_REQUEST,
            ApiError::Parse(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
