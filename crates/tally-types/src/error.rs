//! Error types shared across the tally workspace.

use thiserror::Error;

/// Result type for tally domain operations
pub type Result<T> = std::result::Result<T, TallyError>;

/// Domain-level error types
#[derive(Debug, Clone, Error)]
pub enum TallyError {
    /// Account book does not exist or the user has no access
    #[error("Account book {account_id} not found or not accessible by user {user_id}")]
    AccountBookNotAccessible { account_id: String, user_id: String },

    /// A referenced category does not exist
    #[error("Category {category_id} not found")]
    CategoryNotFound { category_id: String },

    /// Invalid input
    #[error("Invalid input: {field} - {reason}")]
    InvalidInput { field: String, reason: String },

    /// Internal error (storage, query backend, ...)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TallyError {
    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Get an error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AccountBookNotAccessible { .. } => "ACCOUNT_BOOK_NOT_ACCESSIBLE",
            Self::CategoryNotFound { .. } => "CATEGORY_NOT_FOUND",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
