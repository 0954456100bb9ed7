//! Repository instantiations for the four domain resources, plus their
//! entity-specific query variants.

use chrono::NaiveDate;

use crate::core::models::{
    Balance, Transaction, TransactionCategory, TransactionStatus, TransactionType,
};
use crate::repo::{Entity, ListParams, Repository, ResourceSpec};
use crate::storage::keys;

/// Transactions resource.
pub const TRANSACTIONS: ResourceSpec = ResourceSpec {
    cache_key: keys::TRANSACTIONS,
    endpoint: "api/transactions/",
};

/// Transaction types resource.
pub const TRANSACTION_TYPES: ResourceSpec = ResourceSpec {
    cache_key: keys::TRANSACTION_TYPES,
    endpoint: "api/transaction-types/",
};

/// Transaction categories resource.
pub const TRANSACTION_CATEGORIES: ResourceSpec = ResourceSpec {
    cache_key: keys::TRANSACTION_CATEGORIES,
    endpoint: "api/transaction-categories/",
};

/// Balances resource.
pub const TRANSACTION_BALANCES: ResourceSpec = ResourceSpec {
    cache_key: keys::TRANSACTION_BALANCES,
    endpoint: "api/balances/",
};

impl Entity for Transaction {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for TransactionType {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for TransactionCategory {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Entity for Balance {
    fn id(&self) -> i64 {
        self.id
    }
}

impl Repository<Transaction> {
    /// Transactions dated within `[start, end]`, inclusive.
    pub async fn by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<Transaction> {
        let params = ListParams::new()
            .with("startDate", start)
            .with("endDate", end);
        self.list(&params).await
    }

    /// Transactions belonging to one cashbook.
    pub async fn by_cashbook(&self, cashbook_id: i64) -> Vec<Transaction> {
        self.list(&ListParams::new().with("cashbookId", cashbook_id))
            .await
    }

    /// The most recent transactions, newest first.
    pub async fn recent(&self, limit: u32) -> Vec<Transaction> {
        let params = ListParams::new()
            .with("ordering", "-transactionDate")
            .with("pageSize", limit);
        self.list(&params).await
    }

    /// Transactions still pending.
    pub async fn pending(&self) -> Vec<Transaction> {
        self.list(&ListParams::new().with("status", TransactionStatus::Pending.as_str()))
            .await
    }
}

impl Repository<Balance> {
    /// Balance snapshots for one cashbook.
    pub async fn by_cashbook(&self, cashbook_id: i64) -> Vec<Balance> {
        self.list(&ListParams::new().with("cashbookId", cashbook_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_keys_are_partitioned() {
        let keys = [
            TRANSACTIONS.cache_key,
            TRANSACTION_TYPES.cache_key,
            TRANSACTION_CATEGORIES.cache_key,
            TRANSACTION_BALANCES.cache_key,
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn endpoints_end_with_trailing_slash() {
        for spec in [
            TRANSACTIONS,
            TRANSACTION_TYPES,
            TRANSACTION_CATEGORIES,
            TRANSACTION_BALANCES,
        ] {
            assert!(spec.endpoint.ends_with('/'));
        }
    }
}
