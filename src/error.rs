use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::queue::status::BookingStatus;
use crate::store::StoreError;

/// Failures of the booking lifecycle, surfaced once to the caller with no
/// state change.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("{0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("booking is {from} and cannot move that way")]
    InvalidTransition { from: BookingStatus },
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
    #[error("{0}")]
    Forbidden(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorObject,
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub code: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str, String),
    Forbidden(&'static str, String),
    BadRequest(&'static str, String),
    NotFound(&'static str, String),
    Conflict(&'static str, String),
    Unavailable(&'static str, String),
    Internal(String),
}

impl ApiError {
    pub fn invalid_credentials() -> Self {
        ApiError::Unauthorized("INVALID_CREDENTIALS", "Email or password is incorrect".into())
    }

    pub fn session_expired() -> Self {
        ApiError::Unauthorized("SESSION_EXPIRED", "Session expired".into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        ApiError::BadRequest("VALIDATION_ERROR", msg.into())
    }

    fn to_error_response(code: &str, message: &str) -> Json<ErrorResponse> {
        Json(ErrorResponse {
            error: ErrorObject {
                code: code.to_string(),
                message: message.to_string(),
            },
        })
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Validation(msg) => ApiError::validation(msg),
            QueueError::NotFound(_) => ApiError::NotFound("NOT_FOUND", e.to_string()),
            QueueError::InvalidTransition { .. } => {
                ApiError::Conflict("INVALID_TRANSITION", e.to_string())
            }
            QueueError::StoreUnavailable(inner) => {
                tracing::error!(error = %inner, "store unavailable");
                ApiError::Unavailable("STORE_UNAVAILABLE", "Booking store is unavailable".into())
            }
            QueueError::Forbidden(msg) => ApiError::Forbidden("FORBIDDEN", msg),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        QueueError::from(e).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(code, msg) => {
                (StatusCode::UNAUTHORIZED, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Forbidden(code, msg) => {
                (StatusCode::FORBIDDEN, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::BadRequest(code, msg) => {
                (StatusCode::BAD_REQUEST, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::NotFound(code, msg) => {
                (StatusCode::NOT_FOUND, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Conflict(code, msg) => {
                (StatusCode::CONFLICT, ApiError::to_error_response(code, &msg)).into_response()
            }
            ApiError::Unavailable(code, msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::to_error_response(code, &msg),
            )
                .into_response(),
            ApiError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::to_error_response("INTERNAL", &msg),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(e: QueueError) -> StatusCode {
        ApiError::from(e).into_response().status()
    }

    #[test]
    fn test_queue_errors_map_to_http_statuses() {
        assert_eq!(status_of(QueueError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(QueueError::NotFound("booking")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(QueueError::InvalidTransition { from: BookingStatus::Completed }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(QueueError::StoreUnavailable(StoreError::Decode("bad".into()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(status_of(QueueError::Forbidden("no".into())), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(QueueError::NotFound("booking").to_string(), "booking not found");
        assert_eq!(
            QueueError::InvalidTransition { from: BookingStatus::Completed }.to_string(),
            "booking is completed and cannot move that way"
        );
    }
}
