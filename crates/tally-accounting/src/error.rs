//! Pipeline error types
//!
//! Only identity/authorization problems and malformed requests are errors;
//! LLM, parse, and budget-matching failures degrade the result instead.

use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, AccountingError>;

#[derive(Debug, Clone, Error)]
pub enum AccountingError {
    /// A required request field was missing or empty
    #[error("Missing required field: {field}")]
    InvalidRequest { field: &'static str },

    /// The account book does not exist or the requester has no access
    #[error("Account book {account_id} not found or not accessible by user {user_id}")]
    Unauthorized { account_id: String, user_id: String },

    /// A collaborator failed in a way that cannot be degraded
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AccountingError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest { .. } => "INVALID_REQUEST",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
