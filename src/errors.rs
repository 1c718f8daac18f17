use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json
};
use thiserror::Error;
use tracing::error;

use crate::calendar::CalendarError;
use crate::repo::RepoError;
use crate::sync::SyncError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Database error: {0}")]
    Database(anyhow::Error),
    #[error("Not found")]
    NotFound,
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("Authentication required")]
    Unauthorized,
    #[error("Not permitted: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Google Calendar is not connected")]
    CalendarNotConnected,
    #[error("Calendar provider error: {0}")]
    Calendar(#[from] CalendarError),
}

/// Repository errors arrive as `anyhow::Error`; rule violations the repo
/// raises on purpose become client errors, everything else is a 500.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<RepoError>() {
            Ok(RepoError::Invalid(msg)) => ApiError::Validation(msg),
            Ok(RepoError::InUse(msg)) => ApiError::Conflict(msg),
            Ok(RepoError::NotFound) => ApiError::NotFound,
            Err(err) => ApiError::Database(err),
        }
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::NotConnected => ApiError::CalendarNotConnected,
            SyncError::WebhookNotConfigured => {
                ApiError::Validation("No webhook URL is configured for push notifications".to_string())
            }
            SyncError::Calendar(err) => ApiError::Calendar(err),
            SyncError::Database(err) => ApiError::from(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Database(err) => {
                error!("Database error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required".to_string()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::CalendarNotConnected => (
                StatusCode::CONFLICT,
                "Google Calendar is not connected".to_string(),
            ),
            ApiError::Calendar(err) => {
                error!("Calendar provider error: {}", err);
                let status = match err {
                    CalendarError::Unauthorized => StatusCode::UNAUTHORIZED,
                    CalendarError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, err.to_string())
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
