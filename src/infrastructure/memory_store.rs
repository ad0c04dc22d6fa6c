//! In-memory document store.
//!
//! Reference adapter for the `DocumentStore` port, used by tests, demos and
//! single-process deployments. One lock guards all rows, which makes the
//! position batch trivially all-or-nothing.

use crate::application::ports::DocumentStore;
use crate::domain::document::{Document, DocumentEdit, DocumentId, OwnerId};
use crate::domain::error::StoreError;
use crate::domain::reorder::PositionUpdate;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Document store backed by a `HashMap` behind a `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    rows: RwLock<HashMap<DocumentId, Document>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents across all owners.
    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        let rows = self.rows.read().map_err(poisoned)?;
        Ok(rows.get(&id).cloned())
    }

    async fn find_by_owner(&self, owner: &OwnerId) -> Result<Vec<Document>, StoreError> {
        let rows = self.rows.read().map_err(poisoned)?;
        Ok(rows
            .values()
            .filter(|doc| doc.is_owned_by(owner))
            .cloned()
            .collect())
    }

    async fn save(&self, document: &Document) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        rows.insert(document.id(), document.clone());
        Ok(())
    }

    async fn apply_edit(
        &self,
        owner: &OwnerId,
        id: DocumentId,
        edit: DocumentEdit,
    ) -> Result<Option<Document>, StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        match rows.get_mut(&id) {
            Some(doc) if doc.is_owned_by(owner) => {
                edit.apply_to(doc);
                Ok(Some(doc.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete(&self, id: DocumentId) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;
        rows.remove(&id);
        Ok(())
    }

    async fn batch_update_positions(
        &self,
        owner: &OwnerId,
        updates: &[PositionUpdate],
    ) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(poisoned)?;

        let missing: Vec<DocumentId> = updates
            .iter()
            .filter(|update| {
                !rows
                    .get(&update.id)
                    .is_some_and(|doc| doc.is_owned_by(owner))
            })
            .map(|update| update.id)
            .collect();
        if !missing.is_empty() {
            return Err(StoreError::BatchRejected { missing });
        }

        for update in updates {
            if let Some(doc) = rows.get_mut(&update.id) {
                doc.set_sort_position(update.position);
            }
        }
        Ok(())
    }
}
