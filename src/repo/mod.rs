//! Domain repositories.
//!
//! One parameterized pattern instead of four near-duplicate fetch helpers:
//! a [`Repository`] is built from a [`ResourceSpec`] and composes the
//! authenticated transport with the persistent cache store.
//!
//! The resilience contract lives here: reads degrade to the last-known-good
//! cached snapshot instead of failing, writes require the network and
//! surface their errors unchanged.

pub mod resources;

use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::core::models::{CachedCollection, ListBody, PageCursor};
use crate::error::{ErrorCategory, Result};
use crate::storage::CacheStore;
use crate::transport::{ApiTransport, MultipartBody};

// =============================================================================
// Entity + spec
// =============================================================================

/// A domain record with a server-assigned identity.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Server-assigned id. Not valid until a create request succeeds.
    fn id(&self) -> i64;
}

/// Static description of one repository instance: its cache partition and
/// its service endpoint. No two repositories share a cache key.
#[derive(Debug, Clone, Copy)]
pub struct ResourceSpec {
    pub cache_key: &'static str,
    pub endpoint: &'static str,
}

// =============================================================================
// List parameters
// =============================================================================

/// Query parameters for a list fetch.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pairs: Vec<(String, String)>,
    page: Option<u32>,
}

impl ListParams {
    /// No filtering; the service's default page.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one query parameter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.pairs.push((key.into(), value.to_string()));
        self
    }

    /// Request a specific page.
    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self.pairs.push(("page".to_string(), page.to_string()));
        self
    }

    pub(crate) fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub(crate) fn current_page(&self) -> u32 {
        self.page.unwrap_or(1)
    }
}

// =============================================================================
// Repository
// =============================================================================

struct RepoState<T> {
    collection: CachedCollection<T>,
    cursor: Option<PageCursor>,
}

/// Cache-backed repository over one entity type.
pub struct Repository<T: Entity> {
    spec: ResourceSpec,
    transport: Arc<ApiTransport>,
    cache: Arc<CacheStore>,
    state: RwLock<RepoState<T>>,
}

impl<T: Entity> Repository<T> {
    /// Create a repository for a resource, hydrated from the persisted
    /// snapshot. Mutations issued before the first successful fetch apply
    /// against the last-known-good collection, not an empty one.
    pub fn new(spec: ResourceSpec, transport: Arc<ApiTransport>, cache: Arc<CacheStore>) -> Self {
        let collection = cache.load_collection(spec.cache_key);
        Self {
            spec,
            transport,
            cache,
            state: RwLock::new(RepoState {
                collection,
                cursor: None,
            }),
        }
    }

    /// Pagination cursor from the most recent successful fetch.
    #[must_use]
    pub fn cursor(&self) -> Option<PageCursor> {
        self.read().cursor.clone()
    }

    /// Snapshot of the in-memory collection.
    #[must_use]
    pub fn items(&self) -> Vec<T> {
        self.read().collection.items.clone()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetch the collection.
    ///
    /// On success the in-memory collection is replaced (not merged), written
    /// through to the cache store, and the pagination cursor recorded. On
    /// any failure the last persisted snapshot is returned instead — reads
    /// degrade to last-known-good; they do not fail. With no cached data
    /// this returns an empty sequence.
    pub async fn list(&self, params: &ListParams) -> Vec<T> {
        match self.try_list(params).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(
                    resource = self.spec.cache_key,
                    error = %e,
                    "list failed; serving cached snapshot"
                );
                self.cache.load_collection::<T>(self.spec.cache_key).items
            }
        }
    }

    /// Fetch one record by id.
    ///
    /// A network-level failure falls back to the in-memory collection and
    /// then the cached snapshot; service-level errors (including 404)
    /// propagate unchanged.
    ///
    /// # Errors
    /// The original transport error when no local copy exists.
    pub async fn get(&self, id: i64) -> Result<T> {
        match self.transport.get::<T>(&self.detail_path(id), &[]).await {
            Ok(entity) => Ok(entity),
            Err(e) if e.category() == ErrorCategory::Network => {
                let local = self
                    .read()
                    .collection
                    .items
                    .iter()
                    .find(|item| item.id() == id)
                    .cloned()
                    .or_else(|| {
                        self.cache
                            .load_collection::<T>(self.spec.cache_key)
                            .items
                            .into_iter()
                            .find(|item| item.id() == id)
                    });
                match local {
                    Some(entity) => {
                        tracing::debug!(
                            resource = self.spec.cache_key,
                            id,
                            "get failed; serving cached record"
                        );
                        Ok(entity)
                    }
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // Writes (network required; no offline queue)
    // =========================================================================

    /// Create a record. On success it is inserted at the head of the
    /// collection and written through to the cache, so cache-fallback reads
    /// reflect it immediately.
    ///
    /// # Errors
    /// Any transport or service error; local state is left untouched.
    pub async fn create<B: Serialize + Sync>(&self, data: &B) -> Result<T> {
        let created: T = self.transport.post(self.spec.endpoint, data).await?;
        self.insert_head(created.clone());
        Ok(created)
    }

    /// Create a record from a multipart body (file upload variant).
    ///
    /// # Errors
    /// Any transport or service error; local state is left untouched.
    pub async fn create_multipart(&self, body: MultipartBody) -> Result<T> {
        let created: T = self.transport.post_multipart(self.spec.endpoint, body).await?;
        self.insert_head(created.clone());
        Ok(created)
    }

    /// Update a record. On success it replaces the matching item in place.
    ///
    /// # Errors
    /// Any transport or service error; local state is left untouched.
    pub async fn update<B: Serialize + Sync>(&self, id: i64, data: &B) -> Result<T> {
        let updated: T = self.transport.put(&self.detail_path(id), data).await?;
        self.replace_item(updated.clone());
        Ok(updated)
    }

    /// Update a record from a multipart body.
    ///
    /// # Errors
    /// Any transport or service error; local state is left untouched.
    pub async fn update_multipart(&self, id: i64, body: MultipartBody) -> Result<T> {
        let updated: T = self
            .transport
            .put_multipart(&self.detail_path(id), body)
            .await?;
        self.replace_item(updated.clone());
        Ok(updated)
    }

    /// Delete a record. On success it is filtered out of the collection and
    /// the cache. Deleting a non-existent id is a pass-through service
    /// error, not specially handled.
    ///
    /// # Errors
    /// Any transport or service error; local state is left untouched.
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.transport.delete(&self.detail_path(id)).await?;
        self.mutate(|items| items.retain(|item| item.id() != id));
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn try_list(&self, params: &ListParams) -> Result<Vec<T>> {
        let body: ListBody<T> = self.transport.get(self.spec.endpoint, params.pairs()).await?;
        let (items, cursor) = body.into_parts(params.current_page());

        let snapshot = {
            let mut state = self.write();
            state.collection.replace(items.clone());
            state.cursor = Some(cursor);
            state.collection.clone()
        };
        self.cache.save_collection(&snapshot);
        Ok(items)
    }

    fn detail_path(&self, id: i64) -> String {
        format!("{}{}/", self.spec.endpoint, id)
    }

    fn insert_head(&self, entity: T) {
        self.mutate(|items| items.insert(0, entity));
    }

    /// Replace the matching item in place; a record never seen locally is
    /// inserted at the head so fallback reads still reflect it.
    fn replace_item(&self, entity: T) {
        self.mutate(|items| {
            if let Some(slot) = items.iter_mut().find(|item| item.id() == entity.id()) {
                *slot = entity;
            } else {
                items.insert(0, entity);
            }
        });
    }

    fn mutate(&self, op: impl FnOnce(&mut Vec<T>)) {
        let snapshot = {
            let mut state = self.write();
            op(&mut state.collection.items);
            state.collection.clone()
        };
        self.cache.save_collection(&snapshot);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RepoState<T>> {
        self.state.read().expect("repository lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RepoState<T>> {
        self.state.write().expect("repository lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_accumulate_pairs() {
        let params = ListParams::new()
            .with("cashbookId", 3)
            .with("status", "pending")
            .page(2);
        assert_eq!(
            params.pairs(),
            &[
                ("cashbookId".to_string(), "3".to_string()),
                ("status".to_string(), "pending".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
        assert_eq!(params.current_page(), 2);
    }

    #[test]
    fn default_params_are_page_one() {
        let params = ListParams::new();
        assert!(params.pairs().is_empty());
        assert_eq!(params.current_page(), 1);
    }
}
