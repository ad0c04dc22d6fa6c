//! Reorders and edits racing other writes.
//!
//! `InterleavingStore` lets a test slip a new document into the store at a
//! chosen point of a reorder: just before the member set is read again, or
//! just before the position batch is written. `GatedStore` holds edits in
//! flight until a reorder commits or until a second edit arrives.

use async_trait::async_trait;
use chrono::Utc;
use doc_throttle::infrastructure::mocks::MockClock;
use doc_throttle::{
    CollectionError, Document, DocumentCollection, DocumentContent, DocumentEdit, DocumentId,
    DocumentStore, InMemoryDocumentStore, NewDocument, OwnerId, PositionUpdate, ReorderConflict,
    StoreError,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Barrier, Notify};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InjectAt {
    /// On the n-th `find_by_owner` call (1-based)
    MemberRead(usize),
    /// When the position batch arrives
    Batch,
}

#[derive(Debug, Default)]
struct InterleavingStore {
    inner: InMemoryDocumentStore,
    member_reads: AtomicUsize,
    pending: Mutex<Option<(InjectAt, Document)>>,
}

impl InterleavingStore {
    fn inject(&self, at: InjectAt, document: Document) {
        *self.pending.lock().unwrap() = Some((at, document));
    }

    fn take_pending(&self, now: InjectAt) -> Option<Document> {
        let mut pending = self.pending.lock().unwrap();
        match pending.as_ref() {
            Some((at, _)) if *at == now => pending.take().map(|(_, doc)| doc),
            _ => None,
        }
    }
}

#[async_trait]
impl DocumentStore for InterleavingStore {
    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_owner(&self, owner: &OwnerId) -> Result<Vec<Document>, StoreError> {
        let read = self.member_reads.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(doc) = self.take_pending(InjectAt::MemberRead(read)) {
            self.inner.save(&doc).await?;
        }
        self.inner.find_by_owner(owner).await
    }

    async fn save(&self, document: &Document) -> Result<(), StoreError> {
        self.inner.save(document).await
    }

    async fn apply_edit(
        &self,
        owner: &OwnerId,
        id: DocumentId,
        edit: DocumentEdit,
    ) -> Result<Option<Document>, StoreError> {
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
        if let Some(doc) = self.take_pending(InjectAt::Batch) {
            self.inner.save(&doc).await?;
        }
        self.inner.batch_update_positions(owner, updates).await
    }
}

#[derive(Debug, Default)]
struct GatedStore {
    inner: InMemoryDocumentStore,
    /// Edits wait for the next position batch to commit
    edits_wait_for_batch: AtomicBool,
    batch_committed: Notify,
    /// Edits wait here until enough of them are in flight
    edit_barrier: Mutex<Option<Arc<Barrier>>>,
}

impl GatedStore {
    fn hold_edits_until_batch(&self) {
        self.edits_wait_for_batch.store(true, Ordering::SeqCst);
    }

    fn hold_edits_until(&self, in_flight: usize) {
        *self.edit_barrier.lock().unwrap() = Some(Arc::new(Barrier::new(in_flight)));
    }
}

#[async_trait]
impl DocumentStore for GatedStore {
    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_owner(&self, owner: &OwnerId) -> Result<Vec<Document>, StoreError> {
        self.inner.find_by_owner(owner).await
    }

    async fn save(&self, document: &Document) -> Result<(), StoreError> {
        self.inner.save(document).await
    }

    async fn apply_edit(
        &self,
        owner: &OwnerId,
        id: DocumentId,
        edit: DocumentEdit,
    ) -> Result<Option<Document>, StoreError> {
        if self.edits_wait_for_batch.load(Ordering::SeqCst) {
            self.batch_committed.notified().await;
        }
        let barrier = self.edit_barrier.lock().unwrap().clone();
        if let Some(barrier) = barrier {
            barrier.wait().await;
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
        let result = self.inner.batch_update_positions(owner, updates).await;
        if self.edits_wait_for_batch.load(Ordering::SeqCst) {
            self.batch_committed.notify_one();
        }
        result
    }
}

async fn gated_setup(owner: &OwnerId) -> (DocumentCollection<GatedStore>, Vec<DocumentId>) {
    let docs = DocumentCollection::new(GatedStore::default(), Arc::new(MockClock::default()));
    let mut ids = Vec::new();
    for title in ["A", "B", "C"] {
        ids.push(docs.create(owner, NewDocument::new(title, "text")).await.unwrap().id());
    }
    docs.reorder(owner, &ids).await.unwrap();
    (docs, ids)
}

fn late_document(owner: &OwnerId) -> Document {
    Document::new(
        DocumentId::new(),
        owner.clone(),
        "Late".to_string(),
        DocumentContent::new("arrived mid-reorder").unwrap(),
        i64::MAX - 1,
        Utc::now(),
    )
}

async fn setup(owner: &OwnerId) -> (DocumentCollection<InterleavingStore>, Vec<DocumentId>) {
    let docs = DocumentCollection::new(InterleavingStore::default(), Arc::new(MockClock::default()));
    let mut ids = Vec::new();
    for title in ["A", "B", "C"] {
        ids.push(docs.create(owner, NewDocument::new(title, "text")).await.unwrap().id());
    }
    docs.store().member_reads.store(0, Ordering::SeqCst);
    (docs, ids)
}

#[tokio::test]
async fn test_create_before_revalidation_conflicts() {
    let owner = OwnerId::new("owner-1");
    let (docs, ids) = setup(&owner).await;
    let before = docs.list_by_owner(&owner).await.unwrap();
    docs.store().member_reads.store(0, Ordering::SeqCst);

    let late = late_document(&owner);
    let late_id = late.id();
    docs.store().inject(InjectAt::MemberRead(2), late);

    let err = docs
        .reorder(&owner, &[ids[2], ids[1], ids[0]])
        .await
        .unwrap_err();

    assert_eq!(
        err,
        CollectionError::Conflict(ReorderConflict::CountMismatch {
            expected: 4,
            actual: 3,
            missing: vec![late_id],
        })
    );
    let after = docs.list_by_owner(&owner).await.unwrap();
    let unchanged: Vec<&Document> = after.iter().filter(|d| d.id() != late_id).collect();
    assert_eq!(unchanged, before.iter().collect::<Vec<_>>());
}

#[tokio::test]
async fn test_create_after_revalidation_is_left_out() {
    let owner = OwnerId::new("owner-1");
    let (docs, ids) = setup(&owner).await;

    let late = late_document(&owner);
    let late_id = late.id();
    docs.store().inject(InjectAt::Batch, late);

    docs.reorder(&owner, &[ids[2], ids[0], ids[1]]).await.unwrap();

    let listed: Vec<(DocumentId, i64)> = docs
        .list_by_owner(&owner)
        .await
        .unwrap()
        .iter()
        .map(|d| (d.id(), d.sort_position()))
        .collect();
    assert_eq!(
        listed,
        vec![
            (ids[2], 0),
            (ids[0], 1),
            (ids[1], 2),
            (late_id, i64::MAX - 1),
        ]
    );
}

#[tokio::test]
async fn test_delete_before_batch_rejects_whole_batch() {
    let owner = OwnerId::new("owner-1");
    let (docs, ids) = setup(&owner).await;
    let before = docs.list_by_owner(&owner).await.unwrap();

    // The batch names a row that vanished after validation.
    let updates = [
        PositionUpdate { id: ids[1], position: 0 },
        PositionUpdate { id: ids[0], position: 1 },
        PositionUpdate { id: DocumentId::new(), position: 2 },
    ];
    let result = docs.store().batch_update_positions(&owner, &updates).await;

    assert!(matches!(result, Err(StoreError::BatchRejected { .. })));
    assert_eq!(docs.list_by_owner(&owner).await.unwrap(), before);
}

#[tokio::test]
async fn test_edit_in_flight_keeps_reorder_positions() {
    let owner = OwnerId::new("owner-1");
    let (docs, ids) = gated_setup(&owner).await;
    docs.store().hold_edits_until_batch();
    let order = [ids[1], ids[0], ids[2]];

    let (edited, reordered) = tokio::join!(
        docs.update_content(&owner, ids[1], "edited while moving"),
        docs.reorder(&owner, &order),
    );
    reordered.unwrap();
    let edited = edited.unwrap();

    assert_eq!((edited.sort_position(), edited.version()), (0, 2));
    let listed: Vec<(DocumentId, i64)> = docs
        .list_by_owner(&owner)
        .await
        .unwrap()
        .iter()
        .map(|d| (d.id(), d.sort_position()))
        .collect();
    assert_eq!(listed, vec![(ids[1], 0), (ids[0], 1), (ids[2], 2)]);
    let b = docs.get(&owner, ids[1]).await.unwrap();
    assert_eq!(b.content().text(), "edited while moving");
}

#[tokio::test]
async fn test_concurrent_content_edits_each_bump_version() {
    let owner = OwnerId::new("owner-1");
    let (docs, ids) = gated_setup(&owner).await;
    docs.store().hold_edits_until(2);

    let (first, second) = tokio::join!(
        docs.update_content(&owner, ids[0], "first"),
        docs.update_content(&owner, ids[0], "second"),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    let mut versions = vec![first.version(), second.version()];
    versions.sort_unstable();
    assert_eq!(versions, vec![2, 3]);

    let stored = docs.get(&owner, ids[0]).await.unwrap();
    assert_eq!(stored.version(), 3);
    let latest = if first.version() == 3 { &first } else { &second };
    assert_eq!(stored.content(), latest.content());
}

#[tokio::test]
async fn test_concurrent_title_and_content_edits_both_land() {
    let owner = OwnerId::new("owner-1");
    let (docs, ids) = gated_setup(&owner).await;
    docs.store().hold_edits_until(2);

    let (renamed, rewritten) = tokio::join!(
        docs.update_title(&owner, ids[2], "Renamed"),
        docs.update_content(&owner, ids[2], "rewritten body"),
    );
    renamed.unwrap();
    rewritten.unwrap();

    let stored = docs.get(&owner, ids[2]).await.unwrap();
    assert_eq!(stored.title(), "Renamed");
    assert_eq!(stored.content().text(), "rewritten body");
    assert_eq!((stored.version(), stored.sort_position()), (2, 2));
}
