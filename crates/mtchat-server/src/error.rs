//! HTTP error mapping for the BFF.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mtchat_core::MtchatError;
use serde_json::json;
use thiserror::Error;

/// Error returned by BFF handlers; rendered as `{ "error": message }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Upstream answered with a non-2xx status that is passed through.
    #[error("{message}")]
    Upstream { status: StatusCode, message: String },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn unauthorized() -> Self {
        Self::Unauthorized("Unauthorized".into())
    }

    pub fn authentication_required() -> Self {
        Self::Unauthorized("Authentication required".into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Replaces the message of a not-found error, keeping every other error.
    pub fn not_found_as(self, message: &str) -> Self {
        match self {
            Self::NotFound(_) => Self::NotFound(message.to_string()),
            other => other,
        }
    }
}

impl From<MtchatError> for ApiError {
    fn from(error: MtchatError) -> Self {
        match error {
            MtchatError::SessionExpired => Self::unauthorized(),
            MtchatError::Validation(message) => Self::BadRequest(message),
            MtchatError::InvalidTransition { .. } => Self::BadRequest(error.to_string()),
            MtchatError::NotFound { .. } => Self::NotFound(error.to_string()),
            MtchatError::Http {
                status, message, ..
            } => match StatusCode::from_u16(status) {
                Ok(StatusCode::NOT_FOUND) => Self::NotFound(message),
                Ok(status) if status.is_client_error() || status.is_server_error() => {
                    Self::Upstream { status, message }
                }
                _ => Self::Internal(message),
            },
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("[Server] {}: {}", status, self);
        } else {
            tracing::debug!("[Server] {}: {}", status, self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::from(MtchatError::SessionExpired).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(MtchatError::validation("bad")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(MtchatError::not_found("Entity", "x")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(MtchatError::http(404, "Not Found", "gone")).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(MtchatError::http(503, "Service Unavailable", "busy")).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::from(MtchatError::network("refused")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message_override() {
        let err = ApiError::from(MtchatError::not_found("Entity", "x")).not_found_as("Entity not found");
        assert_eq!(err.to_string(), "Entity not found");
        let other = ApiError::unauthorized().not_found_as("Entity not found");
        assert_eq!(other.to_string(), "Unauthorized");
    }
}
