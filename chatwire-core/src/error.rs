//! API error types and handling

use crate::protocol::ErrorEnvelope;
use crate::stream::StreamError;
use crate::validation::ValidationError;
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors produced while handling or forwarding chat completion calls
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Malformed or out-of-range request
    #[error("Invalid request: {message}")]
    InvalidRequest {
        message: String,
        /// Offending field path, reported as the envelope `code`
        param: Option<String>,
    },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Upstream returned an error envelope
    #[error("Upstream error ({status}): {envelope}")]
    Upstream { status: u16, envelope: ErrorEnvelope },

    /// Timeout occurred
    #[error("Request timed out")]
    Timeout,

    /// Network or connection error
    #[error("Network error: {0}")]
    Network(String),

    /// Response parsing error
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Stream violated chunk ordering rules
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Create an invalid request error without a field reference
    pub fn invalid_request(message: impl Into<String>) -> Self {
        ApiError::InvalidRequest {
            message: message.into(),
            param: None,
        }
    }

    /// HTTP status this error is reported with
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::ModelNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Network(_) | ApiError::Parse(_) | ApiError::Stream(_) => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// OpenAI error classification string
    pub fn error_type(&self) -> &str {
        match self {
            ApiError::InvalidRequest { .. } | ApiError::ModelNotFound(_) => "invalid_request_error",
            ApiError::Authentication(_) => "authentication_error",
            ApiError::RateLimit { .. } => "rate_limit_error",
            ApiError::Upstream { envelope, .. } => envelope.error_type(),
            ApiError::Timeout
            | ApiError::Network(_)
            | ApiError::Parse(_)
            | ApiError::Stream(_)
            | ApiError::Internal(_) => "server_error",
        }
    }

    /// Machine readable code, if this error kind has one
    pub fn code(&self) -> Option<String> {
        match self {
            ApiError::InvalidRequest { param, .. } => param.clone(),
            ApiError::Authentication(_) => Some("invalid_api_key".to_string()),
            ApiError::ModelNotFound(_) => Some("model_not_found".to_string()),
            ApiError::RateLimit { .. } => Some("rate_limit_exceeded".to_string()),
            ApiError::Upstream { envelope, .. } => envelope.error.code.clone(),
            ApiError::Timeout => Some("timeout".to_string()),
            ApiError::Network(_) => Some("upstream_unavailable".to_string()),
            ApiError::Parse(_) | ApiError::Stream(_) => Some("invalid_upstream_response".to_string()),
            ApiError::Internal(_) => None,
        }
    }

    /// Build the error body sent to callers
    pub fn to_envelope(&self) -> ErrorEnvelope {
        let message = match self {
            ApiError::Upstream { envelope, .. } => envelope.message().to_string(),
            ApiError::InvalidRequest { message, .. } => message.clone(),
            other => other.to_string(),
        };
        ErrorEnvelope::new(message, self.error_type(), self.code())
    }

    /// Check if this error is worth retrying
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::RateLimit { .. } | ApiError::Timeout | ApiError::Network(_) => true,
            ApiError::Upstream { status, .. } => *status >= 500 || *status == 408,
            _ => false,
        }
    }

    /// Delay requested by the server before the next attempt
    pub fn retry_delay(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::InvalidRequest {
            message: err.to_string(),
            param: Some(err.field_path),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Timeout
        } else if err.is_connect() {
            ApiError::Network(format!("Connection failed: {}", err))
        } else if err.is_decode() {
            ApiError::Parse(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_maps_to_param() {
        let err: ApiError = ValidationError::required("messages").into();
        let envelope = err.to_envelope();

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(envelope.error_type(), "invalid_request_error");
        assert_eq!(envelope.code(), Some("messages"));
    }

    #[test]
    fn test_upstream_envelope_passes_through() {
        let upstream = ErrorEnvelope::new("overloaded", "server_error", Some("overloaded".into()));
        let err = ApiError::Upstream {
            status: 503,
            envelope: upstream.clone(),
        };

        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.to_envelope(), upstream);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_retry_delay_only_for_rate_limits() {
        let err = ApiError::RateLimit {
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(2)),
        };
        assert_eq!(err.retry_delay(), Some(Duration::from_secs(2)));
        assert_eq!(ApiError::Timeout.retry_delay(), None);
        assert!(!ApiError::invalid_request("nope").is_retryable());
    }
}
