//! Owner-scoped document operations.
//!
//! `DocumentCollection` enforces the ordering and versioning rules on top of
//! a `DocumentStore`: new documents append at the end, content edits bump
//! the version exactly once, and reorders replace the whole ordering in one
//! atomic batch.

use crate::application::ports::{Clock, DocumentStore};
use crate::domain::document::{
    sort_for_listing, validate_title, Document, DocumentContent, DocumentEdit, DocumentId,
    OwnerId,
};
use crate::domain::error::{CollectionError, StoreError, ValidationFailure};
use crate::domain::reorder::{check_order, plan_reorder, ReorderPlan, ReorderRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Input for [`DocumentCollection::create`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub content: Option<String>,
}

impl NewDocument {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: Some(content.into()),
        }
    }
}

/// A combined edit. Fields left as `None` are unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

/// Issues strictly increasing sort positions.
///
/// Positions follow the wall clock in milliseconds, so they keep growing
/// across restarts, and never repeat within one process even when several
/// documents are created in the same millisecond.
#[derive(Debug, Default)]
struct PositionSequencer {
    last: AtomicI64,
}

impl PositionSequencer {
    fn next(&self, now: DateTime<Utc>) -> i64 {
        let floor = now.timestamp_millis();
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = last.saturating_add(1).max(floor);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => last = actual,
            }
        }
    }
}

/// Document operations for many owners over one store.
pub struct DocumentCollection<D>
where
    D: DocumentStore,
{
    store: D,
    clock: Arc<dyn Clock>,
    positions: PositionSequencer,
}

impl<D> DocumentCollection<D>
where
    D: DocumentStore,
{
    pub fn new(store: D, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            positions: PositionSequencer::default(),
        }
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &D {
        &self.store
    }

    /// Create a document at the end of the owner's ordering.
    ///
    /// # Errors
    /// `Validation` when the title is blank or too long, or the content is
    /// missing or too long. `Store` when the save fails.
    pub async fn create(
        &self,
        owner: &OwnerId,
        input: NewDocument,
    ) -> Result<Document, CollectionError> {
        let title = validate_title(&input.title)?;
        let content = input.content.ok_or(ValidationFailure::MissingContent)?;
        let content = DocumentContent::new(content)?;

        let now = self.clock.now();
        let document = Document::new(
            DocumentId::new(),
            owner.clone(),
            title,
            content,
            self.positions.next(now),
            now,
        );
        self.store.save(&document).await.map_err(|e| self.store_failed("create", e))?;

        tracing::info!(
            owner = %owner,
            id = %document.id(),
            position = document.sort_position(),
            "document created"
        );
        Ok(document)
    }

    /// Fetch one of the owner's documents.
    pub async fn get(&self, owner: &OwnerId, id: DocumentId) -> Result<Document, CollectionError> {
        self.find_owned(owner, id).await
    }

    /// Replace a document's content, bumping its version.
    ///
    /// The edit applies to the stored row, so concurrent edits each add
    /// their own version and a concurrent reorder keeps its positions.
    pub async fn update_content(
        &self,
        owner: &OwnerId,
        id: DocumentId,
        content: impl Into<String>,
    ) -> Result<Document, CollectionError> {
        let content = DocumentContent::new(content)?;
        self.edit(owner, id, Some(content), None).await
    }

    /// Rename a document. The version is unchanged.
    pub async fn update_title(
        &self,
        owner: &OwnerId,
        id: DocumentId,
        title: &str,
    ) -> Result<Document, CollectionError> {
        let title = validate_title(title)?;
        self.edit(owner, id, None, Some(title)).await
    }

    /// Apply a title and/or content edit with at most one version bump.
    ///
    /// # Errors
    /// `Validation(EmptyPatch)` when neither field is set.
    pub async fn update(
        &self,
        owner: &OwnerId,
        id: DocumentId,
        patch: DocumentPatch,
    ) -> Result<Document, CollectionError> {
        if patch.is_empty() {
            return Err(ValidationFailure::EmptyPatch.into());
        }
        let title = patch.title.as_deref().map(validate_title).transpose()?;
        let content = patch.content.map(DocumentContent::new).transpose()?;
        self.edit(owner, id, content, title).await
    }

    /// All of the owner's documents in display order.
    pub async fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<Document>, CollectionError> {
        let mut documents = self
            .store
            .find_by_owner(owner)
            .await
            .map_err(|e| self.store_failed("list", e))?;
        sort_for_listing(&mut documents);
        Ok(documents)
    }

    /// Remove a document. Sibling positions are left as they are.
    pub async fn delete(&self, owner: &OwnerId, id: DocumentId) -> Result<(), CollectionError> {
        self.find_owned(owner, id).await?;
        self.store.delete(id).await.map_err(|e| self.store_failed("delete", e))?;
        tracing::info!(owner = %owner, id = %id, "document deleted");
        Ok(())
    }

    /// Replace the owner's ordering with `ordered_ids`.
    ///
    /// The list must name every one of the owner's documents exactly once.
    /// Position `i` is assigned to `ordered_ids[i]`. The member set is read
    /// again right before the commit; a document that appears after that
    /// read keeps its own position.
    ///
    /// # Errors
    /// - `Validation(EmptyOrder)` / `Validation(DuplicateId)`, before the
    ///   store is touched.
    /// - `Conflict(CountMismatch)` / `Conflict(UnknownIds)` when the list does
    ///   not match the owner's documents. No position changes.
    /// - `Store` when the batch fails. No position changes.
    pub async fn reorder(
        &self,
        owner: &OwnerId,
        ordered_ids: &[DocumentId],
    ) -> Result<(), CollectionError> {
        check_order(ordered_ids)?;

        self.validate_against_members(owner, ordered_ids).await?;
        // Membership may have moved while the first check awaited the store.
        let plan = self.validate_against_members(owner, ordered_ids).await?;

        self.store
            .batch_update_positions(owner, plan.updates())
            .await
            .map_err(|e| self.store_failed("reorder", e))?;

        tracing::info!(owner = %owner, documents = plan.len(), "documents reordered");
        Ok(())
    }

    /// [`reorder`](Self::reorder) for a request decoded from a client.
    pub async fn reorder_request(&self, request: &ReorderRequest) -> Result<(), CollectionError> {
        self.reorder(&request.owner_id, &request.ordered_ids).await
    }

    async fn validate_against_members(
        &self,
        owner: &OwnerId,
        ordered_ids: &[DocumentId],
    ) -> Result<ReorderPlan, CollectionError> {
        let members: Vec<DocumentId> = self
            .store
            .find_by_owner(owner)
            .await
            .map_err(|e| self.store_failed("reorder", e))?
            .iter()
            .map(Document::id)
            .collect();

        plan_reorder(ordered_ids, &members).inspect_err(|e| {
            tracing::warn!(owner = %owner, error = %e, "reorder rejected");
        })
    }

    async fn find_owned(&self, owner: &OwnerId, id: DocumentId) -> Result<Document, CollectionError> {
        match self.store.find_by_id(id).await {
            Ok(Some(document)) if document.is_owned_by(owner) => Ok(document),
            Ok(_) => Err(CollectionError::NotFound { id }),
            Err(e) => Err(self.store_failed("lookup", e)),
        }
    }

    async fn edit(
        &self,
        owner: &OwnerId,
        id: DocumentId,
        content: Option<DocumentContent>,
        title: Option<String>,
    ) -> Result<Document, CollectionError> {
        let edit = DocumentEdit {
            title,
            content,
            at: self.clock.now(),
        };
        match self.store.apply_edit(owner, id, edit).await {
            Ok(Some(document)) => Ok(document),
            Ok(None) => Err(CollectionError::NotFound { id }),
            Err(e) => Err(self.store_failed("update", e)),
        }
    }

    fn store_failed(&self, operation: &'static str, error: StoreError) -> CollectionError {
        tracing::warn!(operation, error = %error, "document store failure");
        CollectionError::Store(error)
    }
}

impl<D> fmt::Debug for DocumentCollection<D>
where
    D: DocumentStore,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCollection")
            .field("store", &self.store)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}
