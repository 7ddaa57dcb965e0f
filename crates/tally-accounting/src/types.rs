//! Pipeline request, intermediate, and result types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tally_types::{AccountBookType, TransactionType};

/// One smart-accounting request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartAccountingRequest {
    /// Free-text description, e.g. `"昨天在沃尔玛买了日用品，花了128.5元"`
    pub description: String,
    pub user_id: String,
    pub account_id: String,
    /// Advisory only; the persisted account book record wins
    pub account_type: AccountBookType,
    /// Attach the prompt/response trace to the result
    #[serde(default)]
    pub include_debug: bool,
}

impl SmartAccountingRequest {
    pub fn new(
        description: impl Into<String>,
        user_id: impl Into<String>,
        account_id: impl Into<String>,
        account_type: AccountBookType,
    ) -> Self {
        Self {
            description: description.into(),
            user_id: user_id.into(),
            account_id: account_id.into(),
            account_type,
            include_debug: false,
        }
    }

    pub fn with_debug(mut self) -> Self {
        self.include_debug = true;
        self
    }
}

/// What the analysis stage extracted from the model output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzedTransaction {
    pub amount: f64,
    pub date: NaiveDate,
    pub category_id: String,
    pub category_name: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Budget or member name the model spotted in the description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_name: Option<String>,
    pub note: String,
    /// Model confidence, clamped to [0, 1]
    pub confidence: f64,
}

/// A budget resolved by the matching stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedBudget {
    pub id: String,
    pub name: String,
    /// Presentation name of the owner (member name for personal budgets)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
}

/// Prompt/response trace attached to results on request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugTrace {
    pub system_prompt: String,
    pub user_prompt: String,
    pub raw_response: String,
    pub parsed: serde_json::Value,
}

/// The final transaction proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartAccountingResult {
    pub amount: f64,
    pub date: NaiveDate,
    pub category_id: String,
    pub category_name: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub note: String,

    pub account_id: String,
    pub account_name: String,
    pub account_type: AccountBookType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_owner_name: Option<String>,

    pub user_id: String,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
    pub original_description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugTrace>,
}
