//! In-memory data sources
//!
//! A self-contained directory of categories, budgets, account books, and
//! family members. Backs the test suites and demo embeddings; production
//! hosts implement the source traits against their own database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use tally_types::{AccountBook, Budget, Category, FamilyMember, Result};

use crate::sources::{AccountBookSource, BudgetSource, CategorySource};

/// Builder-style fixture implementing every source trait
#[derive(Default)]
pub struct MemoryDirectory {
    categories: Vec<Category>,
    budgets: Vec<Budget>,
    books: Vec<AccountBook>,
    /// family id → members
    members: HashMap<String, Vec<FamilyMember>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.categories.push(category);
        self
    }

    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budgets.push(budget);
        self
    }

    pub fn with_book(mut self, book: AccountBook) -> Self {
        self.books.push(book);
        self
    }

    pub fn with_member(mut self, family_id: impl Into<String>, member: FamilyMember) -> Self {
        self.members.entry(family_id.into()).or_default().push(member);
        self
    }
}

#[async_trait]
impl CategorySource for MemoryDirectory {
    async fn categories_for(&self, user_id: &str, account_id: &str) -> Result<Vec<Category>> {
        Ok(self
            .categories
            .iter()
            .filter(|c| {
                c.is_default
                    || c.user_id.as_deref() == Some(user_id)
                    || c.account_book_id.as_deref() == Some(account_id)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BudgetSource for MemoryDirectory {
    async fn active_budgets(
        &self,
        user_id: &str,
        account_id: &str,
        family_id: Option<&str>,
        on: NaiveDate,
    ) -> Result<Vec<Budget>> {
        Ok(self
            .budgets
            .iter()
            .filter(|b| b.is_active_on(on))
            .filter(|b| {
                b.account_book_id.as_deref() == Some(account_id)
                    || b.user_id.as_deref() == Some(user_id)
                    || (family_id.is_some() && b.family_id.as_deref() == family_id)
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AccountBookSource for MemoryDirectory {
    async fn get(&self, account_id: &str) -> Result<Option<AccountBook>> {
        Ok(self.books.iter().find(|b| b.id == account_id).cloned())
    }

    async fn find_accessible(
        &self,
        account_id: &str,
        user_id: &str,
    ) -> Result<Option<AccountBook>> {
        let Some(book) = self.books.iter().find(|b| b.id == account_id) else {
            return Ok(None);
        };
        let members = book
            .family_id
            .as_ref()
            .and_then(|f| self.members.get(f))
            .map(|m| m.as_slice())
            .unwrap_or(&[]);
        Ok(book.is_accessible_by(user_id, members).then(|| book.clone()))
    }
}
