//! HTTP error type for the relay.
//!
//! Callers only ever see `{ "error": "Censorship check failed" }` with status
//! 500. The variant records what actually went wrong for the logs.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Body returned for every relay failure.
pub const FAILURE_MESSAGE: &str = "Censorship check failed";

/// Relay failure.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Request body is not a JSON object.
    #[error("invalid request body: {0}")]
    InvalidBody(String),

    /// Request body has no usable `token` field.
    #[error("request body carries no token")]
    MissingToken,

    /// Upstream answered with a non-2xx status.
    #[error("upstream returned {status}")]
    Upstream { status: u16 },

    /// Upstream could not be reached or its response could not be read.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// Upstream answered 2xx with a body that is not JSON.
    #[error("upstream body is not JSON: {0}")]
    UpstreamBody(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        match &self {
            Self::InvalidBody(_) | Self::MissingToken => {
                tracing::warn!(error = %self, "rejected censorship check request");
            }
            Self::Upstream { .. } | Self::Transport(_) | Self::UpstreamBody(_) => {
                tracing::error!(error = %self, "censorship check relay failed");
            }
        }

        let body = ErrorBody {
            error: FAILURE_MESSAGE,
        };
        (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(body)).into_response()
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
