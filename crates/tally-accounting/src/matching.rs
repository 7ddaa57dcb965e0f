//! Budget resolution
//!
//! Two entry points: hint-driven matching when the model spotted a budget
//! or member name in the description, and precedence-driven matching over
//! the requester's data otherwise.

use chrono::NaiveDate;

use tally_types::{Budget, BudgetKind};

/// Match a model-supplied hint against budget display names.
///
/// Exact display-name equality first; then a fuzzy pass where the hint
/// merely *contains* a personal budget's member name, so `"给张三买的"`
/// lands on 张三's budget.
pub fn match_by_hint<'a>(hint: &str, candidates: &'a [Budget]) -> Option<&'a Budget> {
    if let Some(exact) = candidates.iter().find(|b| b.display_name() == hint) {
        return Some(exact);
    }
    candidates
        .iter()
        .filter(|b| b.kind == BudgetKind::Personal)
        .find(|b| {
            let name = b.display_name();
            !name.is_empty() && hint.contains(name)
        })
}

/// Resolve a budget without a hint.
///
/// Precedence:
/// 1. the requester's own personal budget scoped to this account
///    (category match preferred within the group),
/// 2. any account-scoped budget whose category matches, then a general
///    account-scoped budget,
/// 3. the requester's personal budget filtered by category.
///
/// Requester-owned budgets beat account-level ones on ties.
pub fn match_by_precedence<'a>(
    user_id: &str,
    account_id: &str,
    category_id: &str,
    on: NaiveDate,
    candidates: &'a [Budget],
) -> Option<&'a Budget> {
    let active: Vec<&'a Budget> = candidates.iter().filter(|b| b.is_active_on(on)).collect();

    let own_scoped: Vec<&'a Budget> = active
        .iter()
        .copied()
        .filter(|b| {
            b.user_id.as_deref() == Some(user_id)
                && b.account_book_id.as_deref() == Some(account_id)
        })
        .collect();
    if let Some(&hit) = own_scoped
        .iter()
        .find(|b| b.category_id.as_deref() == Some(category_id))
    {
        return Some(hit);
    }
    if let Some(&hit) = own_scoped.first() {
        return Some(hit);
    }

    let account_scoped: Vec<&'a Budget> = active
        .iter()
        .copied()
        .filter(|b| b.account_book_id.as_deref() == Some(account_id))
        .collect();
    if let Some(&hit) = account_scoped
        .iter()
        .find(|b| b.category_id.as_deref() == Some(category_id))
    {
        return Some(hit);
    }
    if let Some(&hit) = account_scoped.iter().find(|b| b.category_id.is_none()) {
        return Some(hit);
    }

    active
        .iter()
        .filter(|b| b.user_id.as_deref() == Some(user_id))
        .find(|b| b.category_id.as_deref() == Some(category_id))
        .copied()
}
