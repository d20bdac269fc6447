use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// Unified error type for API calls
// ============================================================================

/// Every failure an API call can produce. `Http` carries the server's own message so callers
/// can surface it verbatim.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error("{0}")]
    Unauthorized(String),
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response: {0}")]
    Decode(String),
    #[error("Request cancelled")]
    Cancelled,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    pub fn decode(message: impl Into<String>) -> Self {
        ApiError::Decode(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ApiError::InvalidRequest(message.into())
    }

    /// HTTP status of the failed response, if the failure came from the server.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Unauthorized(_) => Some(StatusCode::UNAUTHORIZED),
            ApiError::Transport(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_status(&self, status: StatusCode) -> bool {
        self.status() == Some(status)
    }

    /// Replace the message for a specific status, keeping the status itself.
    pub fn with_message_for(self, status: StatusCode, message: &str) -> Self {
        match self {
            ApiError::Http { status: s, .. } if s == status => ApiError::Http {
                status: s,
                message: message.to_string(),
            },
            other => other,
        }
    }

    /// Message suitable for an operator-facing notification.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Http { message, .. } | ApiError::Unauthorized(message)
                if !message.is_empty() =>
            {
                message.clone()
            }
            ApiError::Cancelled => "Request cancelled".to_string(),
            _ => fallback.to_string(),
        }
    }
}

// ============================================================================
// Server error bodies
// ============================================================================

/// Error bodies come as `{message}`, `{error}`, or JSend-style `{data: {message}}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<ErrorData>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorData {
    #[serde(default)]
    message: Option<String>,
}

/// Extract the most specific message from an error response body.
pub(crate) fn error_message(status: StatusCode, body: &[u8]) -> String {
    let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();
    parsed
        .message
        .or(parsed.error)
        .or(parsed.data.and_then(|d| d.message))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_message_field() {
        let body = br#"{"message":"Category already exists","error":"Conflict"}"#;
        assert_eq!(
            error_message(StatusCode::CONFLICT, body),
            "Category already exists"
        );
    }

    #[test]
    fn test_error_message_reads_jsend_fail() {
        let body = br#"{"status":"fail","data":{"message":"limit must be greater than 0"}}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "limit must be greater than 0"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_reason() {
        assert_eq!(error_message(StatusCode::NOT_FOUND, b"<html>"), "Not Found");
    }

    #[test]
    fn test_with_message_for_only_touches_matching_status() {
        let err = ApiError::Http {
            status: StatusCode::CONFLICT,
            message: "duplicate key".into(),
        }
        .with_message_for(StatusCode::CONFLICT, "Category already exists");
        assert_eq!(err.to_string(), "Category already exists");
        assert!(err.is_status(StatusCode::CONFLICT));

        let err = ApiError::Http {
            status: StatusCode::BAD_REQUEST,
            message: "name required".into(),
        }
        .with_message_for(StatusCode::CONFLICT, "Category already exists");
        assert_eq!(err.to_string(), "name required");
    }

    #[test]
    fn test_user_message_uses_fallback_for_transport_errors() {
        let err = ApiError::decode("bad json");
        assert_eq!(err.user_message("Failed to load orders"), "Failed to load orders");
    }
}
