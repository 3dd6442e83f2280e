// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed errors surfaced by the session client.

use reqwest::StatusCode;
use serde::Deserialize;

/// Every failure a caller of [`crate::client::ApiClient`] can observe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// 400/422: missing or malformed fields.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 401: bad credentials, or a token the server would not accept.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// The refresh exchange failed; stored tokens were cleared.
    #[error("Session expired, please log in again")]
    SessionExpired,

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// Error body as sent by the API. `detail` is accepted in place of `details`.
#[derive(Deserialize)]
struct WireError {
    error: Option<String>,
    details: Option<String>,
    detail: Option<String>,
}

impl ApiError {
    /// Build an error from a non-success status and its body text.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<WireError>(body)
            .ok()
            .and_then(|w| w.details.or(w.detail).or(w.error))
            .or_else(|| {
                let text = body.trim();
                (!text.is_empty()).then(|| text.to_string())
            })
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::Validation(message)
            }
            StatusCode::UNAUTHORIZED => ApiError::Authentication(message),
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::CONFLICT => ApiError::Conflict(message),
            _ => ApiError::Server {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Whether the user has to log in again to continue.
    pub fn requires_login(&self) -> bool {
        matches!(self, ApiError::SessionExpired | ApiError::Authentication(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e.to_string())
    }
}
