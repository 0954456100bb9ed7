//! Core data models for the cashbook ledger service.
//!
//! These types mirror the service's JSON wire shapes (camelCase field names)
//! and the locally cached structures layered on top of them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// User Profile
// =============================================================================

/// Denormalized snapshot of the authenticated user.
///
/// Not authoritative: it may be stale and is refreshed opportunistically on
/// login. Every optional field the service may omit is defaulted here so
/// callers never observe an absent value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl UserProfile {
    /// Display name: "First Last" when available, otherwise the username.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

// =============================================================================
// Transactions
// =============================================================================

/// Lifecycle status of a transaction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Completed,
    Pending,
    Cancelled,
}

impl TransactionStatus {
    /// Wire name of the status, e.g. for query parameters.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A financial transaction recorded against a cashbook.
///
/// Identity is the server-assigned `id`; a transaction is not valid until a
/// create request succeeds (no client-generated optimistic IDs).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    pub cashbook_id: i64,
    pub type_id: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,

    pub amount: f64,
    pub transaction_date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_date: Option<NaiveDate>,

    #[serde(default)]
    pub status: TransactionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_number: Option<String>,

    #[serde(default)]
    pub is_recurring: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_pattern: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// Economic nature of a transaction type.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionNature {
    Income,
    #[default]
    Expense,
    Transfer,
}

/// A user-defined transaction type (salary, groceries, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionType {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub nature: TransactionNature,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A transaction category, optionally nested under a parent category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionCategory {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A cashbook balance snapshot as computed by the service.
///
/// Balance arithmetic is the service's business; this client only carries
/// the value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub id: i64,
    pub cashbook_id: i64,
    pub amount: f64,
    pub as_of: DateTime<Utc>,
}

// =============================================================================
// Cached Collections
// =============================================================================

/// A locally cached collection of domain records.
///
/// `items` preserves reception order from the most recent successful fetch
/// (index 0 = most recent); the cache layer never resorts it. Local
/// mutations keep that invariant: create inserts at the head, update
/// replaces in place, delete filters out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CachedCollection<T> {
    pub key: String,
    pub items: Vec<T>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl<T> CachedCollection<T> {
    /// Create an empty collection for a cache key.
    #[must_use]
    pub fn empty(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            items: Vec::new(),
            last_synced_at: None,
        }
    }

    /// Replace the whole collection with a freshly fetched one.
    ///
    /// Replace semantics, not merge: the previous items are discarded.
    pub fn replace(&mut self, items: Vec<T>) {
        self.items = items;
        self.last_synced_at = Some(Utc::now());
    }

    /// Number of cached items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// Pagination
// =============================================================================

/// Pagination cursor attached to the most recent successful list fetch.
///
/// Never persisted with the cached collection; it is recomputed on the next
/// successful fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageCursor {
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub current_page: u32,
}

/// Raw list response body: either a bare sequence or a pagination envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListBody<T> {
    Paged {
        results: Vec<T>,
        count: i64,
        next: Option<String>,
        previous: Option<String>,
    },
    Plain(Vec<T>),
}

impl<T> ListBody<T> {
    /// Split into items and cursor. A bare sequence yields a cursor covering
    /// exactly the returned items on page 1.
    #[must_use]
    pub fn into_parts(self, current_page: u32) -> (Vec<T>, PageCursor) {
        match self {
            Self::Paged {
                results,
                count,
                next,
                previous,
            } => {
                let cursor = PageCursor {
                    count,
                    next,
                    previous,
                    current_page,
                };
                (results, cursor)
            }
            Self::Plain(items) => {
                let cursor = PageCursor {
                    count: items.len() as i64,
                    next: None,
                    previous: None,
                    current_page,
                };
                (items, cursor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_defaults_fill_missing_fields() {
        let profile: UserProfile =
            serde_json::from_str(r#"{"username":"ada","email":"ada@example.com"}"#).unwrap();
        assert_eq!(profile.username, "ada");
        assert_eq!(profile.first_name, "");
        assert!(!profile.is_verified);
        assert!(profile.avatar.is_none());
    }

    #[test]
    fn profile_display_name_falls_back_to_username() {
        let mut profile = UserProfile {
            username: "ada".into(),
            ..UserProfile::default()
        };
        assert_eq!(profile.display_name(), "ada");
        profile.first_name = "Ada".into();
        profile.last_name = "Lovelace".into();
        assert_eq!(profile.display_name(), "Ada Lovelace");
    }

    #[test]
    fn transaction_decodes_with_minimal_fields() {
        let json = r#"{
            "id": 7,
            "cashbookId": 2,
            "typeId": 1,
            "amount": 12.5,
            "transactionDate": "2026-01-15"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.id, 7);
        assert_eq!(tx.status, TransactionStatus::Completed);
        assert!(tx.tags.is_empty());
        assert!(!tx.is_recurring);
    }

    #[test]
    fn list_body_decodes_envelope() {
        let json = r#"{"results":[{"id":1,"cashbookId":1,"typeId":1,"amount":1.0,"transactionDate":"2026-01-01"}],"count":40,"next":"?page=2","previous":null}"#;
        let body: ListBody<Transaction> = serde_json::from_str(json).unwrap();
        let (items, cursor) = body.into_parts(1);
        assert_eq!(items.len(), 1);
        assert_eq!(cursor.count, 40);
        assert_eq!(cursor.next.as_deref(), Some("?page=2"));
        assert_eq!(cursor.current_page, 1);
    }

    #[test]
    fn list_body_decodes_bare_sequence() {
        let json = r#"[{"id":3,"name":"Groceries"}]"#;
        let body: ListBody<TransactionCategory> = serde_json::from_str(json).unwrap();
        let (items, cursor) = body.into_parts(1);
        assert_eq!(items.len(), 1);
        assert_eq!(cursor.count, 1);
        assert!(cursor.next.is_none());
    }

    #[test]
    fn collection_replace_discards_previous_items() {
        let mut collection = CachedCollection::empty("transactionCategories");
        collection.replace(vec![TransactionCategory {
            id: 1,
            name: "Old".into(),
            parent_id: None,
            description: None,
        }]);
        collection.replace(vec![TransactionCategory {
            id: 2,
            name: "New".into(),
            parent_id: None,
            description: None,
        }]);
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.items[0].id, 2);
        assert!(collection.last_synced_at.is_some());
    }
}
