//! Sync client error types with HTTP status code mapping.
//!
//! [`SyncError`] is the central error type of the crate. The realtime core
//! never hands it to UI code: connection and dispatch failures are logged
//! and self-heal. It surfaces from configuration, the HTTP collaborators,
//! and the local read API, where each variant maps to a status code and a
//! structured JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::domain::ListingId;

/// Structured JSON error response body.
///
/// ```json
/// {
///   "error": {
///     "code": 2001,
///     "message": "listing not found: 42",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Crate-wide error enum.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status               |
/// |-----------|-----------------|---------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request           |
/// | 2000–2999 | Not Found       | 404 Not Found             |
/// | 3000–3999 | Local           | 500 / 503                 |
/// | 5000–5999 | Upstream        | 502 Bad Gateway           |
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Realtime transport failed to connect or read.
    #[error("transport error: {0}")]
    Transport(String),

    /// Configuration value could not be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A payload field held a value outside its domain.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// JSON could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// HTTP request to the marketplace API failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The marketplace API answered with a non-success status.
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus {
        /// HTTP status code returned upstream.
        status: u16,
        /// Requested URL.
        url: String,
    },

    /// No listing with this id in the requested collection.
    #[error("listing not found: {0}")]
    ListingNotFound(ListingId),

    /// No moderation action collaborator is configured.
    #[error("moderation actions are not available")]
    ActionsUnavailable,

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SyncError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidPayload(_) => 1001,
            Self::Decode(_) => 1002,
            Self::InvalidConfig(_) => 1003,
            Self::ListingNotFound(_) => 2001,
            Self::Internal(_) => 3000,
            Self::ActionsUnavailable => 3001,
            Self::Transport(_) => 5001,
            Self::Http(_) => 5002,
            Self::UnexpectedStatus { .. } => 5003,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidPayload(_) | Self::Decode(_) => StatusCode::BAD_REQUEST,
            Self::ListingNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidConfig(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ActionsUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Transport(_) | Self::Http(_) | Self::UnexpectedStatus { .. } => {
                StatusCode::BAD_GATEWAY
            }
        }
    }
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let err = SyncError::ListingNotFound(ListingId::new(42));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_code(), 2001);
        assert_eq!(err.to_string(), "listing not found: 42");
    }

    #[test]
    fn upstream_failures_map_to_bad_gateway() {
        let err = SyncError::UnexpectedStatus {
            status: 401,
            url: "http://localhost/api/ads".to_string(),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            SyncError::Transport("refused".to_string()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn into_response_carries_status() {
        let response = SyncError::ActionsUnavailable.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
