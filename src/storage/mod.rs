//! Local persistence: storage backends, cache store, and path resolution.

pub mod backend;
pub mod cache;
pub mod paths;

pub use backend::{FileBackend, NoopBackend, StorageBackend, StorageError};
pub use cache::{CacheStore, EVICTION_HIGH_WATER, EVICTION_LOW_WATER};
pub use paths::AppPaths;

/// Storage keys for each cached collection and the session blobs.
pub mod keys {
    /// Cached transactions collection.
    pub const TRANSACTIONS: &str = "transactions";
    /// Cached transaction types collection.
    pub const TRANSACTION_TYPES: &str = "transactionTypes";
    /// Cached transaction categories collection.
    pub const TRANSACTION_CATEGORIES: &str = "transactionCategories";
    /// Cached balances collection.
    pub const TRANSACTION_BALANCES: &str = "transactionBalances";
    /// Persisted access token.
    pub const AUTH_ACCESS: &str = "auth.access";
    /// Persisted refresh token.
    pub const AUTH_REFRESH: &str = "auth.refresh";
    /// Persisted profile snapshot.
    pub const AUTH_PROFILE: &str = "auth.profile";
}
