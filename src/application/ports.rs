//! Ports (interfaces) for the application layer.
//!
//! In hexagonal architecture, ports define the interfaces that the application
//! layer needs. Infrastructure adapters implement these ports.

use crate::domain::document::{Document, DocumentEdit, DocumentId, OwnerId};
use crate::domain::error::StoreError;
use crate::domain::reorder::PositionUpdate;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::hash::Hash;

/// Port for obtaining current time.
///
/// This abstraction allows the application layer to work with time
/// without depending on system clock implementation details.
/// Infrastructure provides concrete implementations (SystemClock, MockClock).
pub trait Clock: Send + Sync + Debug {
    /// Get the current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// Port for concurrent key-value storage.
///
/// This abstraction allows the application layer to store and retrieve values
/// without depending on specific concurrent data structure implementations.
/// Infrastructure provides concrete implementations (ShardedStorage).
pub trait Storage<K, V>: Send + Sync + Debug
where
    K: Hash + Eq + Clone + Send + Sync,
    V: Send + Sync,
{
    /// Access an entry with mutable access, creating it if necessary.
    ///
    /// Creation and the accessor run under the same entry lock, so the
    /// read-check-write done by `accessor` is atomic for `key`.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    /// * `factory` - Function to create a new value if the key doesn't exist
    /// * `accessor` - Function that gets mutable access to the value
    ///
    /// # Returns
    /// The result from the accessor function
    fn with_entry_mut<F, R>(&self, key: K, factory: impl FnOnce() -> V, accessor: F) -> R
    where
        F: FnOnce(&mut V) -> R;

    /// Read an entry without creating it.
    fn peek<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R>;

    /// Remove one entry, returning whether it existed.
    fn remove(&self, key: &K) -> bool;

    /// Get the number of entries in the storage.
    fn len(&self) -> usize;

    /// Check if the storage is empty.
    fn is_empty(&self) -> bool;

    /// Clear all entries from the storage.
    fn clear(&self);

    /// Remove entries for which the predicate returns false.
    fn retain<F>(&self, f: F)
    where
        F: FnMut(&K, &mut V) -> bool;
}

/// Port for document persistence.
///
/// Every method is atomic per row. `batch_update_positions` is the one
/// multi-row write and must apply all updates or none.
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Fetch one document by id, regardless of owner.
    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, StoreError>;

    /// Fetch every document owned by `owner`, in no particular order.
    async fn find_by_owner(&self, owner: &OwnerId) -> Result<Vec<Document>, StoreError>;

    /// Insert a new document, or replace a stored one wholesale.
    async fn save(&self, document: &Document) -> Result<(), StoreError>;

    /// Apply `edit` to `owner`'s document in one atomic step.
    ///
    /// The edit runs against the row as currently stored. It must leave the
    /// sort position alone, so a concurrent reorder or edit is never
    /// reverted. Returns the updated document, or `None` when `owner` has no
    /// document with this id.
    async fn apply_edit(
        &self,
        owner: &OwnerId,
        id: DocumentId,
        edit: DocumentEdit,
    ) -> Result<Option<Document>, StoreError>;

    /// Delete a document. Deleting a missing id is not an error.
    async fn delete(&self, id: DocumentId) -> Result<(), StoreError>;

    /// Set the positions of several of `owner`'s documents in one atomic step.
    ///
    /// Updates naming a document that no longer exists for `owner` reject
    /// the whole batch.
    async fn batch_update_positions(
        &self,
        owner: &OwnerId,
        updates: &[PositionUpdate],
    ) -> Result<(), StoreError>;
}
