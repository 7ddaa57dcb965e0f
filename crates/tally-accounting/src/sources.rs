//! Read-only data access consumed by the pipeline
//!
//! The host application implements these against its persistence layer;
//! the pipeline never mutates any of this data. In-memory implementations
//! for tests live in [`crate::memory`].

use async_trait::async_trait;
use chrono::NaiveDate;

use tally_types::{AccountBook, Budget, Category, Result};

/// Candidate categories for one user + account book
#[async_trait]
pub trait CategorySource: Send + Sync {
    /// User-owned + system default + account-scoped categories
    async fn categories_for(&self, user_id: &str, account_id: &str) -> Result<Vec<Category>>;
}

/// Candidate budgets for one user + account book
#[async_trait]
pub trait BudgetSource: Send + Sync {
    /// Account-scoped, requester-personal, and family-scoped budgets whose
    /// window contains `on`
    async fn active_budgets(
        &self,
        user_id: &str,
        account_id: &str,
        family_id: Option<&str>,
        on: NaiveDate,
    ) -> Result<Vec<Budget>>;
}

/// Account book lookup and access verification
#[async_trait]
pub trait AccountBookSource: Send + Sync {
    /// Plain lookup, used when composing prompts (no access check)
    async fn get(&self, account_id: &str) -> Result<Option<AccountBook>>;

    /// The book iff it exists and `user_id` owns it or belongs to its family
    async fn find_accessible(&self, account_id: &str, user_id: &str)
        -> Result<Option<AccountBook>>;
}
