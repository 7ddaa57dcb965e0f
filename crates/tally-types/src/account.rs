//! Account books and family membership

use serde::{Deserialize, Serialize};

/// Kind of an account book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccountBookType {
    Personal,
    Family,
}

impl AccountBookType {
    /// Case-insensitive parse of `"personal"` / `"family"`
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "personal" => Some(Self::Personal),
            "family" => Some(Self::Family),
            _ => None,
        }
    }
}

impl std::fmt::Display for AccountBookType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Personal => write!(f, "personal"),
            Self::Family => write!(f, "family"),
        }
    }
}

/// An account book (ledger) transactions are posted into
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBook {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub book_type: AccountBookType,
    /// Owning user
    pub user_id: String,
    /// Backing family for family books
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_id: Option<String>,
}

impl AccountBook {
    /// Whether `user_id` may post into this book: the owner always may, and
    /// family members may when the membership list says so.
    pub fn is_accessible_by(&self, user_id: &str, family_members: &[FamilyMember]) -> bool {
        if self.user_id == user_id {
            return true;
        }
        self.book_type == AccountBookType::Family
            && self.family_id.is_some()
            && family_members.iter().any(|m| m.user_id == user_id)
    }
}

/// A member of a family, as seen by access checks and budget display names
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    pub user_id: String,
    pub name: String,
}
