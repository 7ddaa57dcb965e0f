//! Content-addressed result cache
//!
//! Keys are `(user, account, description)` — identical repeated text
//! collapses to one answer within the TTL window. Entries need no
//! cross-entry locking; expiry is checked on read.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::types::SmartAccountingResult;

/// Default entry lifetime: 1 hour
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// TTL-expiring cache for pipeline results
pub struct ResultCache {
    ttl: Duration,
    entries: DashMap<String, (Instant, SmartAccountingResult)>,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    /// Composite cache key for one request
    pub fn key(user_id: &str, account_id: &str, description: &str) -> String {
        format!("smart-accounting:{user_id}:{account_id}:{description}")
    }

    /// A fresh entry, or `None`; stale entries are evicted on the way out
    pub fn get(&self, key: &str) -> Option<SmartAccountingResult> {
        let hit = self.entries.get(key).and_then(|entry| {
            let (stored_at, result) = entry.value();
            (stored_at.elapsed() < self.ttl).then(|| result.clone())
        });
        if hit.is_none() {
            self.entries.remove(key);
        }
        hit
    }

    /// Store a result; an identical-key write overwrites the old entry
    pub fn insert(&self, key: String, result: SmartAccountingResult) {
        self.entries.insert(key, (Instant::now(), result));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tally_types::{AccountBookType, TransactionType};

    fn result() -> SmartAccountingResult {
        SmartAccountingResult {
            amount: 12.0,
            date: Utc::now().date_naive(),
            category_id: "3".to_string(),
            category_name: "日用".to_string(),
            transaction_type: TransactionType::Expense,
            note: "测试".to_string(),
            account_id: "book-1".to_string(),
            account_name: "我的账本".to_string(),
            account_type: AccountBookType::Personal,
            budget_id: None,
            budget_name: None,
            budget_owner_name: None,
            user_id: "u1".to_string(),
            confidence: 0.9,
            created_at: Utc::now(),
            original_description: "买了点东西12元".to_string(),
            debug: None,
        }
    }

    #[test]
    fn test_fresh_entry_is_returned() {
        let cache = ResultCache::default();
        let key = ResultCache::key("u1", "book-1", "买了点东西12元");
        cache.insert(key.clone(), result());
        assert!(cache.get(&key).is_some());
    }

    #[test]
    fn test_expired_entry_is_evicted() {
        let cache = ResultCache::new(Duration::from_millis(10));
        let key = ResultCache::key("u1", "book-1", "买了点东西12元");
        cache.insert(key.clone(), result());
        std::thread::sleep(Duration::from_millis(30));
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_key_distinguishes_users_and_accounts() {
        let a = ResultCache::key("u1", "book-1", "x");
        let b = ResultCache::key("u2", "book-1", "x");
        let c = ResultCache::key("u1", "book-2", "x");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
