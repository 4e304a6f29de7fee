//! API error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bddboard_common::MockupError;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Every way a handler can fail
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Common(#[from] bddboard_common::Error),

    #[error(transparent)]
    Mockup(#[from] MockupError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// JSON body of an error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub generated_at: chrono::DateTime<Utc>,
    #[serde(rename = "attemptedPaths", skip_serializing_if = "Option::is_none")]
    pub attempted_paths: Option<Vec<String>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Common(bddboard_common::Error::NotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Mockup(MockupError::InvalidMode { .. }) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn label(&self) -> &'static str {
        match self.status() {
            StatusCode::NOT_FOUND => "Not found",
            StatusCode::BAD_REQUEST => "Invalid request",
            _ => "Internal server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let attempted_paths = match &self {
            ApiError::Mockup(MockupError::Unreadable {
                attempted_paths, ..
            }) => Some(
                attempted_paths
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect(),
            ),
            _ => None,
        };

        let body = ErrorBody {
            error: self.label().to_string(),
            message: self.to_string(),
            generated_at: Utc::now(),
            attempted_paths,
        };

        (status, Json(body)).into_response()
    }
}

/// Run blocking file work off the async runtime.
pub async fn blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await?)
}
