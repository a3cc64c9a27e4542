use crate::services::video_store::VideoError;
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// Media type of every API response body.
pub const JSON_API_MEDIA_TYPE: &str = "application/vnd.api+json";

/// An error on its way out of a handler, rendered as a JSON:API error document.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    /// Shortcut for 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let title = self
            .status
            .canonical_reason()
            .unwrap_or("Error")
            .to_string();
        let body = Json(json!({
            "errors": [{
                "status": self.status.as_u16().to_string(),
                "title": title,
                "detail": self.message,
            }]
        }));

        let mut response = (self.status, body).into_response();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(JSON_API_MEDIA_TYPE),
        );
        response
    }
}

impl From<VideoError> for AppError {
    fn from(err: VideoError) -> Self {
        match err {
            VideoError::NotFound(_) => AppError::not_found(err.to_string()),
            VideoError::Validation(_) | VideoError::InvalidTransition { .. } => {
                AppError::bad_request(err.to_string())
            }
            VideoError::DuplicateId(_)
            | VideoError::Database(_)
            | VideoError::ObjectStorage(_) => {
                // Dependency details stay in the logs.
                tracing::error!("request failed: {}", err);
                AppError::internal("internal server error")
            }
        }
    }
}
