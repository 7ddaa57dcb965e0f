//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur while talking to a provider
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// Connection-level failure (DNS, refused, reset)
    #[error("Network error: {message}")]
    Network { message: String },

    /// The request exceeded its deadline
    #[error("Request timed out")]
    Timeout,

    /// The credential was rejected
    #[error("Invalid credential (HTTP {status})")]
    InvalidCredential { status: u16 },

    /// The model or endpoint does not exist
    #[error("Model or endpoint not found: {message}")]
    NotFound { message: String },

    /// The provider is rate-limiting us
    #[error("Rate limited")]
    RateLimited,

    /// Any other non-success HTTP response
    #[error("Request failed: HTTP {status}: {message}")]
    RequestFailed { status: u16, message: String },

    /// The vendor envelope could not be interpreted
    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    /// The provider configuration is unusable
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl LlmError {
    /// Classify a non-success HTTP status into a specific error
    pub fn from_status(status: u16, body: &str) -> Self {
        // Keep vendor bodies short; they can embed whole HTML pages.
        let message: String = body.chars().take(200).collect();
        match status {
            401 | 403 => Self::InvalidCredential { status },
            404 => Self::NotFound { message },
            429 => Self::RateLimited,
            _ => Self::RequestFailed { status, message },
        }
    }

    /// Map a transport error from reqwest
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Network {
                message: e.to_string(),
            }
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Human-readable reason recorded by the health checker
    pub fn probe_reason(&self) -> String {
        match self {
            Self::InvalidCredential { .. } => "invalid credential".to_string(),
            Self::NotFound { .. } => "model or endpoint not found".to_string(),
            Self::RateLimited => "rate limited".to_string(),
            Self::Timeout => "timeout".to_string(),
            Self::Network { .. } => "network failure".to_string(),
            other => other.to_string(),
        }
    }
}
