//! Response types and error handling for the HTTP facade

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use totalk_common::{AppError, ErrorResponse};
use totalk_core::DomainError;
use tracing::error;
use validator::ValidationErrors;

/// API error type for consistent error responses
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    App(#[from] AppError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

impl ApiError {
    /// Get HTTP status code for this error
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::App(e) => {
                StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::Validation(_) | Self::InvalidBody(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Get error code for API responses
    #[must_use]
    pub fn error_code(&self) -> &str {
        match self {
            Self::App(e) => e.error_code(),
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidBody(_) => "INVALID_BODY",
        }
    }

    pub fn invalid_body(msg: impl Into<String>) -> Self {
        Self::InvalidBody(msg.into())
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::App(AppError::Domain(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = ?self, "Server error occurred");
        }

        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;

/// Created response (201)
pub struct Created<T>(pub T);

impl<T: IntoResponse> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        let mut response = self.0.into_response();
        *response.status_mut() = StatusCode::CREATED;
        response
    }
}

/// Accepted response (202)
pub struct Accepted<T>(pub T);

impl<T: IntoResponse> IntoResponse for Accepted<T> {
    fn into_response(self) -> Response {
        let mut response = self.0.into_response();
        *response.status_mut() = StatusCode::ACCEPTED;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_errors_map_to_status_codes() {
        let not_queued: ApiError = DomainError::not_queued("event-1", "alice").into();
        assert_eq!(not_queued.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(not_queued.error_code(), "NOT_QUEUED");

        let queued: ApiError = DomainError::already_queued("event-1", "alice").into();
        assert_eq!(queued.status_code(), StatusCode::CONFLICT);

        let closed: ApiError = DomainError::ResourceClosed("event-1".into()).into();
        assert_eq!(closed.status_code(), StatusCode::CONFLICT);

        let empty: ApiError = DomainError::EmptyQueue("event-1".into()).into();
        assert_eq!(empty.error_code(), "EMPTY_QUEUE");

        let blank: ApiError = DomainError::ValidationError("blank user id".into()).into();
        assert_eq!(blank.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_notification_errors_map_to_status_codes() {
        let missing: ApiError = DomainError::NotificationNotFound("n1".into()).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.error_code(), "NOTIFICATION_NOT_FOUND");

        let sent: ApiError = DomainError::NotCancellable("n1".into()).into();
        assert_eq!(sent.status_code(), StatusCode::CONFLICT);
        assert_eq!(sent.error_code(), "NOT_CANCELLABLE");
    }

    #[test]
    fn test_request_errors_are_bad_requests() {
        assert_eq!(
            ApiError::invalid_body("oops").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::App(AppError::validation("user_id is required")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::App(AppError::EventBus("closed".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
