//! Client facade: the single entry point a UI layer consumes.
//!
//! Wires the HTTP client, the storage backend selection, the session
//! manager, the authenticated transport, and the four domain repositories.

use std::sync::Arc;

use crate::auth::SessionManager;
use crate::core::config::ClientConfig;
use crate::core::models::{Balance, Transaction, TransactionCategory, TransactionType};
use crate::error::Result;
use crate::repo::{Repository, resources};
use crate::storage::{AppPaths, CacheStore, FileBackend, NoopBackend, StorageBackend};
use crate::transport::{ApiTransport, build_client};

/// Ledger service client.
///
/// Owns one session, one transport, and one repository per domain resource.
pub struct Client {
    session: Arc<SessionManager>,
    transactions: Repository<Transaction>,
    transaction_types: Repository<TransactionType>,
    transaction_categories: Repository<TransactionCategory>,
    balances: Repository<Balance>,
}

impl Client {
    /// Build a client from configuration.
    ///
    /// Storage selection happens here, once: a usable directory yields the
    /// persistent file store; anything else degrades to the no-op store and
    /// the rest of the subsystem never knows the difference.
    ///
    /// # Errors
    /// Returns an error only if the HTTP client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = build_client(config.timeout, &config.user_agent)?;

        let store_dir = config
            .storage_dir
            .clone()
            .unwrap_or_else(|| AppPaths::new().store_dir());
        let backend: Arc<dyn StorageBackend> =
            match FileBackend::open(&store_dir, config.storage_quota_bytes) {
                Ok(backend) => Arc::new(backend),
                Err(e) => {
                    tracing::warn!(
                        dir = %store_dir.display(),
                        error = %e,
                        "persistent storage unavailable; running without cache durability"
                    );
                    Arc::new(NoopBackend)
                }
            };
        let cache = Arc::new(CacheStore::new(backend));

        let session = Arc::new(SessionManager::new(
            http.clone(),
            config.base_url.clone(),
            Arc::clone(&cache),
        ));
        let transport = Arc::new(ApiTransport::new(
            http,
            config.base_url,
            Arc::clone(&session),
        ));

        Ok(Self {
            session,
            transactions: Repository::new(
                resources::TRANSACTIONS,
                Arc::clone(&transport),
                Arc::clone(&cache),
            ),
            transaction_types: Repository::new(
                resources::TRANSACTION_TYPES,
                Arc::clone(&transport),
                Arc::clone(&cache),
            ),
            transaction_categories: Repository::new(
                resources::TRANSACTION_CATEGORIES,
                Arc::clone(&transport),
                Arc::clone(&cache),
            ),
            balances: Repository::new(resources::TRANSACTION_BALANCES, transport, cache),
        })
    }

    /// The session manager: login, logout, restore, session-ended signal.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Transactions repository.
    #[must_use]
    pub const fn transactions(&self) -> &Repository<Transaction> {
        &self.transactions
    }

    /// Transaction types repository.
    #[must_use]
    pub const fn transaction_types(&self) -> &Repository<TransactionType> {
        &self.transaction_types
    }

    /// Transaction categories repository.
    #[must_use]
    pub const fn transaction_categories(&self) -> &Repository<TransactionCategory> {
        &self.transaction_categories
    }

    /// Balances repository.
    #[must_use]
    pub const fn balances(&self) -> &Repository<Balance> {
        &self.balances
    }
}
