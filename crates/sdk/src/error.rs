//! Error types for the Promptlift SDK.

use serde::Deserialize;

/// Result type for SDK operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Failures surfaced by the remote client.
///
/// The client never retries. [`ApiError::is_retryable`] tells a caller
/// whether its own policy may try again.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The API key was missing, unknown or revoked (401).
    #[error("API key was rejected")]
    Unauthorized,

    /// The API key is valid but not allowed to do this (403).
    #[error("API key is not permitted to perform this operation")]
    Forbidden,

    /// Quota exhausted or backoff requested (429).
    #[error("Rate limited{}", retry_hint(.retry_after_secs))]
    RateLimited { retry_after_secs: Option<u64> },

    /// The service rejected the request (other 4xx).
    #[error("Bad request (status {status}): {message}")]
    BadRequest { status: u16, message: String },

    /// The service failed (5xx).
    #[error("Server error (status {status}): {message}")]
    ServerError { status: u16, message: String },

    /// The service could not be reached or did not answer in time.
    #[error("Service unreachable: {reason}")]
    Unreachable { reason: String, timed_out: bool },

    /// A successful response carried a body we could not decode.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

fn retry_hint(retry_after_secs: &Option<u64>) -> String {
    match retry_after_secs {
        Some(secs) => format!(", retry after {} seconds", secs),
        None => String::new(),
    }
}

impl ApiError {
    /// Check if a caller may retry this error.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::ServerError { .. } | Self::Unreachable { .. }
        )
    }

    /// Map a non-success status, its `Retry-After` header and body into an error.
    pub fn from_response(status: u16, retry_after: Option<&str>, body: &str) -> Self {
        let parsed = serde_json::from_str::<ErrorResponse>(body).ok();

        match status {
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            429 => {
                let retry_after_secs = retry_after
                    .and_then(|value| value.trim().parse::<u64>().ok())
                    .or_else(|| parsed.as_ref().and_then(|p| p.retry_after));
                Self::RateLimited { retry_after_secs }
            }
            400..=499 => Self::BadRequest {
                status,
                message: error_message(parsed, body),
            },
            _ => Self::ServerError {
                status,
                message: error_message(parsed, body),
            },
        }
    }
}

fn error_message(parsed: Option<ErrorResponse>, body: &str) -> String {
    match parsed.and_then(|p| p.error) {
        Some(message) => message,
        None if body.trim().is_empty() => "no details provided".to_string(),
        None => body.trim().to_string(),
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Unreachable {
                reason: "request timed out".to_string(),
                timed_out: true,
            }
        } else if e.is_decode() {
            Self::InvalidResponse(e.to_string())
        } else if e.is_builder() {
            Self::Config(e.to_string())
        } else {
            Self::Unreachable {
                reason: e.to_string(),
                timed_out: false,
            }
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(e: url::ParseError) -> Self {
        Self::Config(format!("invalid URL: {}", e))
    }
}

/// Error body returned by the Promptlift API.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default, alias = "message")]
    error: Option<String>,
    #[serde(default)]
    retry_after: Option<u64>,
}
