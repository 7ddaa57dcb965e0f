//! Budgets and budget display naming

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of a budget
///
/// General budgets belong to an account book as a whole; personal budgets
/// belong to one member and are displayed under the member's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BudgetKind {
    General,
    Personal,
}

/// A budget candidate for matching
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: String,
    pub name: String,
    pub kind: BudgetKind,
    /// Category this budget is restricted to; `None` means any category
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    /// Owning user for personal budgets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Account book this budget is scoped to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_book_id: Option<String>,
    /// Family this budget is scoped to (family account books)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
    /// Display name of the owning member, for personal budgets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Budget {
    /// Whether the budget window contains `date` (inclusive on both ends)
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// The name this budget is presented under.
    ///
    /// General budgets display their own name; personal budgets display the
    /// owning member's name, falling back to the budget name when the member
    /// name is unknown.
    pub fn display_name(&self) -> &str {
        match self.kind {
            BudgetKind::General => &self.name,
            BudgetKind::Personal => self.member_name.as_deref().unwrap_or(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(kind: BudgetKind, member: Option<&str>) -> Budget {
        Budget {
            id: "b1".to_string(),
            name: "月度预算".to_string(),
            kind,
            category_id: None,
            user_id: Some("u1".to_string()),
            account_book_id: None,
            family_id: None,
            member_name: member.map(|s| s.to_string()),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        }
    }

    #[test]
    fn test_display_name_general_uses_own_name() {
        let b = budget(BudgetKind::General, Some("张三"));
        assert_eq!(b.display_name(), "月度预算");
    }

    #[test]
    fn test_display_name_personal_uses_member_name() {
        let b = budget(BudgetKind::Personal, Some("张三"));
        assert_eq!(b.display_name(), "张三");
    }

    #[test]
    fn test_display_name_personal_falls_back_to_budget_name() {
        let b = budget(BudgetKind::Personal, None);
        assert_eq!(b.display_name(), "月度预算");
    }

    #[test]
    fn test_window_is_inclusive() {
        let b = budget(BudgetKind::General, None);
        assert!(b.is_active_on(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
        assert!(b.is_active_on(NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()));
        assert!(!b.is_active_on(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()));
    }
}
