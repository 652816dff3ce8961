//! Anthropic API client error types.

use std::sync::Arc;

use tpd_core::ConfigError;

/// Errors from the Anthropic messages client.
#[derive(Debug, thiserror::Error)]
pub enum AnthropicError {
    /// No usable API key in the configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Authentication failed (invalid or revoked API key).
    #[error("authentication failed: HTTP {status}")]
    AuthError { status: u16 },

    /// Rate limited by the API.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// Any other non-success HTTP response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response body was not a messages payload.
    #[error("parse error: {0}")]
    Parse(String),

    /// The response carried no text block.
    #[error("response contained no text content")]
    EmptyContent,
}

impl From<reqwest::Error> for AnthropicError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { AnthropicError::Timeout } else { AnthropicError::Network(Arc::new(err)) }
    }
}

impl AnthropicError {
    /// Map a non-success status to its error.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => AnthropicError::AuthError { status },
            429 => AnthropicError::RateLimited,
            _ => AnthropicError::HttpError { status },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert!(AnthropicError::AuthError { status: 401 }.to_string().contains("authentication"));
        assert_eq!(AnthropicError::HttpError { status: 529 }.to_string(), "HTTP error: 529");
    }

    #[test]
    fn test_from_status() {
        assert!(matches!(AnthropicError::from_status(401), AnthropicError::AuthError { status: 401 }));
        assert!(matches!(AnthropicError::from_status(403), AnthropicError::AuthError { status: 403 }));
        assert!(matches!(AnthropicError::from_status(429), AnthropicError::RateLimited));
        assert!(matches!(AnthropicError::from_status(500), AnthropicError::HttpError { status: 500 }));
        assert!(matches!(AnthropicError::from_status(400), AnthropicError::HttpError { status: 400 }));
    }

    #[test]
    fn test_config_error_passthrough() {
        let err: AnthropicError =
            ConfigError::Missing { field: "anthropic_api_key".into(), hint: "set it".into() }.into();
        assert!(err.to_string().contains("anthropic_api_key"));
    }
}
