use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::foundation::error::LarmError;

/// Handler failure rendered as a plain-text response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// 400 with `message`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// 500 with `message`.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Upload failures keep their cause in the body.
    pub fn upload(err: LarmError) -> Self {
        match err {
            LarmError::Validation(msg) => Self::bad_request(msg),
            other => Self::internal(format!("Upload failed: {other}")),
        }
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response body.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<LarmError> for ApiError {
    fn from(err: LarmError) -> Self {
        match err {
            LarmError::SessionNotFound(_) => Self {
                status: StatusCode::NOT_FOUND,
                message: "Session not found".to_string(),
            },
            LarmError::Validation(msg) => Self::bad_request(msg),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::internal(format!("worker task failed: {err}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "request failed");
        } else {
            tracing::debug!(status = %self.status, error = %self.message, "request rejected");
        }
        (self.status, self.message).into_response()
    }
}
