use crate::config::ConfigError;

/// Error type surfaced by an exchange.
///
/// Only configuration, transport and stream-lifecycle failures reach the
/// caller. Frame-level decode problems are absorbed by the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("API request failed: {status} - {message}")]
    Upstream { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Stream ended before message_stop")]
    IncompleteStream,
    #[error("An exchange is already in flight for this session")]
    Busy,
    #[error("Exchange cancelled")]
    Cancelled,
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ConfigError> for BridgeError {
    fn from(err: ConfigError) -> Self {
        BridgeError::Config(err.to_string())
    }
}

/// Broad error category, used as a structured log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidRequest,
    Authentication,
    Permission,
    RateLimit,
    ServerError,
    Client,
    Unknown,
}

/// Map an upstream HTTP status code to an error category.
#[must_use]
pub fn category_from_upstream_status(status: u16) -> ErrorCategory {
    match status {
        400 => ErrorCategory::InvalidRequest,
        401 => ErrorCategory::Authentication,
        403 => ErrorCategory::Permission,
        429 => ErrorCategory::RateLimit,
        500..=599 => ErrorCategory::ServerError,
        _ => ErrorCategory::Unknown,
    }
}

impl BridgeError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            BridgeError::Config(_) => ErrorCategory::InvalidRequest,
            BridgeError::Busy | BridgeError::Cancelled => ErrorCategory::Client,
            BridgeError::Transport(_)
            | BridgeError::IncompleteStream
            | BridgeError::Internal(_) => ErrorCategory::ServerError,
            BridgeError::Upstream { status, .. } => category_from_upstream_status(*status),
        }
    }

    /// Upstream HTTP status, when the failure carried one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            BridgeError::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_message_includes_status_and_body() {
        let err = BridgeError::Upstream {
            status: 401,
            message: "{\"error\":\"invalid x-api-key\"}".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("401"));
        assert!(text.contains("invalid x-api-key"));
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.category(), ErrorCategory::Authentication);
    }

    #[test]
    fn test_category_from_status() {
        assert_eq!(category_from_upstream_status(429), ErrorCategory::RateLimit);
        assert_eq!(category_from_upstream_status(503), ErrorCategory::ServerError);
        assert_eq!(category_from_upstream_status(418), ErrorCategory::Unknown);
    }

    #[test]
    fn test_config_error_converts() {
        let err: BridgeError = ConfigError::Validation("api.model cannot be empty".into()).into();
        assert!(matches!(err, BridgeError::Config(ref msg) if msg.contains("api.model")));
        assert_eq!(err.status(), None);
    }
}
