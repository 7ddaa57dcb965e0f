//! Transaction categories

use serde::{Deserialize, Serialize};

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Expense,
    Income,
}

impl Default for TransactionType {
    fn default() -> Self {
        Self::Expense
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Expense => write!(f, "EXPENSE"),
            Self::Income => write!(f, "INCOME"),
        }
    }
}

/// A transaction category
///
/// Candidate categories for a request are the union of the user's own
/// categories, the system defaults, and categories scoped to the account
/// book being posted to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// System default category, visible to every user
    #[serde(default)]
    pub is_default: bool,
    /// Owning user, if user-created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Account book this category is scoped to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_book_id: Option<String>,
}

impl Category {
    /// Compact `id:name(支出|收入)` form used when embedding the candidate
    /// list into an LLM prompt.
    pub fn prompt_label(&self) -> String {
        let kind = match self.transaction_type {
            TransactionType::Expense => "支出",
            TransactionType::Income => "收入",
        };
        format!("{}:{}({})", self.id, self.name, kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_label() {
        let cat = Category {
            id: "3".to_string(),
            name: "日用".to_string(),
            transaction_type: TransactionType::Expense,
            is_default: true,
            user_id: None,
            account_book_id: None,
        };
        assert_eq!(cat.prompt_label(), "3:日用(支出)");
    }

    #[test]
    fn test_transaction_type_serde() {
        let json = serde_json::to_string(&TransactionType::Expense).unwrap();
        assert_eq!(json, "\"EXPENSE\"");
        let back: TransactionType = serde_json::from_str("\"INCOME\"").unwrap();
        assert_eq!(back, TransactionType::Income);
    }
}
