//! Test utilities for ledgerlink.
//!
//! Provides shared test data factories for use across all test modules.
//!
//! # Usage
//!
//! ```rust,ignore
//! use ledgerlink::test_utils::*;
//!
//! let tx = make_test_transaction(1);
//! let body = login_response_json("ada", "access-1", "refresh-1");
//! ```

use chrono::{NaiveDate, Utc};
use serde_json::{Value, json};

use crate::core::models::{
    Balance, Transaction, TransactionCategory, TransactionStatus, TransactionType, UserProfile,
};

// =============================================================================
// Test Data Factories
// =============================================================================

/// Create a test `Transaction` with the given id and realistic defaults.
#[must_use]
pub fn make_test_transaction(id: i64) -> Transaction {
    Transaction {
        id,
        cashbook_id: 1,
        type_id: 2,
        category_id: Some(3),
        amount: 125.50,
        transaction_date: NaiveDate::from_ymd_opt(2026, 1, 15).expect("valid date"),
        value_date: None,
        status: TransactionStatus::Completed,
        description: Some(format!("test transaction {id}")),
        reference_number: Some(format!("REF-{id:04}")),
        is_recurring: false,
        recurring_pattern: None,
        tags: vec!["test".to_string()],
    }
}

/// Create a minimal test `Transaction` (only required fields populated).
#[must_use]
pub fn make_test_transaction_minimal(id: i64) -> Transaction {
    Transaction {
        id,
        cashbook_id: 1,
        type_id: 1,
        category_id: None,
        amount: 1.0,
        transaction_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date"),
        value_date: None,
        status: TransactionStatus::Completed,
        description: None,
        reference_number: None,
        is_recurring: false,
        recurring_pattern: None,
        tags: Vec::new(),
    }
}

/// Create a test `TransactionType`.
#[must_use]
pub fn make_test_type(id: i64, name: &str) -> TransactionType {
    TransactionType {
        id,
        name: name.to_string(),
        nature: crate::core::models::TransactionNature::Expense,
        description: None,
    }
}

/// Create a test `TransactionCategory`.
#[must_use]
pub fn make_test_category(id: i64, name: &str) -> TransactionCategory {
    TransactionCategory {
        id,
        name: name.to_string(),
        parent_id: None,
        description: None,
    }
}

/// Create a test `Balance` for a cashbook.
#[must_use]
pub fn make_test_balance(id: i64, cashbook_id: i64, amount: f64) -> Balance {
    Balance {
        id,
        cashbook_id,
        amount,
        as_of: Utc::now(),
    }
}

/// Create a test `UserProfile`.
#[must_use]
pub fn make_test_profile(username: &str) -> UserProfile {
    UserProfile {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        is_staff: false,
        is_verified: true,
        avatar: None,
    }
}

// =============================================================================
// Wire payload builders
// =============================================================================

/// JSON body of a successful login response.
#[must_use]
pub fn login_response_json(username: &str, access: &str, refresh: &str) -> Value {
    json!({
        "access": access,
        "refresh": refresh,
        "user": make_test_profile(username),
    })
}

/// JSON body of a successful refresh response.
#[must_use]
pub fn refresh_response_json(access: &str) -> Value {
    json!({ "access": access })
}

/// JSON body of a paginated list envelope.
#[must_use]
pub fn paged_envelope_json<T: serde::Serialize>(items: &[T], count: i64) -> Value {
    json!({
        "results": items,
        "count": count,
        "next": null,
        "previous": null,
    })
}
