//! Document store with injectable failures.

use crate::application::ports::DocumentStore;
use crate::domain::document::{Document, DocumentEdit, DocumentId, OwnerId};
use crate::domain::error::StoreError;
use crate::domain::reorder::PositionUpdate;
use crate::infrastructure::memory_store::InMemoryDocumentStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Wraps an [`InMemoryDocumentStore`] and fails chosen operations on demand.
///
/// Also counts position batches, so tests can assert that a rejected
/// request never reached the store.
#[derive(Debug, Default)]
pub struct FailingDocumentStore {
    inner: InMemoryDocumentStore,
    fail_saves: AtomicBool,
    fail_batches: AtomicBool,
    batch_calls: AtomicUsize,
}

impl FailingDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every single-document write (`save` and `apply_edit`) fail until
    /// switched off.
    pub fn fail_saves(&self, enabled: bool) {
        self.fail_saves.store(enabled, Ordering::SeqCst);
    }

    /// Make every `batch_update_positions` fail until switched off.
    pub fn fail_batches(&self, enabled: bool) {
        self.fail_batches.store(enabled, Ordering::SeqCst);
    }

    /// Number of `batch_update_positions` calls received, failed ones included.
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for FailingDocumentStore {
    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_owner(&self, owner: &OwnerId) -> Result<Vec<Document>, StoreError> {
        self.inner.find_by_owner(owner).await
    }

    async fn save(&self, document: &Document) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected save failure".to_string()));
        }
        self.inner.save(document).await
    }

    async fn apply_edit(
        &self,
        owner: &OwnerId,
        id: DocumentId,
        edit: DocumentEdit,
    ) -> Result<Option<Document>, StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected edit failure".to_string()));
        }
        self.inner.apply_edit(owner, id, edit).await
    }

    async fn delete(&self, id: DocumentId) -> Result<(), StoreError> {
        self.inner.delete(id).await
    }

    async fn batch_update_positions(
        &self,
        owner: &OwnerId,
        updates: &[PositionUpdate],
    ) -> Result<(), StoreError> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_batches.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "injected batch failure".to_string(),
            ));
        }
        self.inner.batch_update_positions(owner, updates).await
    }
}
