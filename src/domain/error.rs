//! Error taxonomy for admission and document operations.

use crate::domain::document::DocumentId;
use chrono::{DateTime, Utc};
use std::fmt;

/// Malformed input, detected before any mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationFailure {
    #[error("title is required")]
    BlankTitle,
    #[error("title exceeds {max} characters")]
    TitleTooLong { max: usize },
    #[error("content is required")]
    MissingContent,
    #[error("content exceeds {max} characters")]
    ContentTooLong { max: usize },
    #[error("no changes were provided")]
    EmptyPatch,
    #[error("the document order is empty")]
    EmptyOrder,
    #[error("the document order lists {0} more than once")]
    DuplicateId(DocumentId),
}

/// A reorder request whose ids do not match the owner's documents.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReorderConflict {
    /// The list does not cover every document the owner has
    #[error("expected {expected} documents, got {actual}{}", IdList(.missing))]
    CountMismatch {
        expected: usize,
        actual: usize,
        /// Owned documents absent from the list
        missing: Vec<DocumentId>,
    },
    /// The list names documents the owner does not have
    #[error("unknown documents{}", IdList(.ids))]
    UnknownIds { ids: Vec<DocumentId> },
}

struct IdList<'a>(&'a [DocumentId]);

impl fmt::Display for IdList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return Ok(());
        }
        f.write_str(": ")?;
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

/// Failure reported by a `DocumentStore` adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not complete the operation
    #[error("document store unavailable: {0}")]
    Unavailable(String),
    /// A position batch referenced rows that no longer exist; nothing was written
    #[error("position batch rejected, {} documents missing", .missing.len())]
    BatchRejected { missing: Vec<DocumentId> },
}

/// Error returned by document collection operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error("document {id} not found")]
    NotFound { id: DocumentId },
    #[error("reorder conflict: {0}")]
    Conflict(#[from] ReorderConflict),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CollectionError {
    /// Whether the failure was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, CollectionError::Store(_))
    }
}

/// A denied admission, for callers that want to propagate it with `?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("rate limit exceeded, retry in {retry_after_secs}s")]
pub struct LimitExceeded {
    pub retry_after_secs: u64,
    pub reset_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_conflict_lists_ids() {
        let a = DocumentId::from(Uuid::nil());
        let err = CollectionError::from(ReorderConflict::CountMismatch {
            expected: 3,
            actual: 2,
            missing: vec![a],
        });

        let message = err.to_string();
        assert!(message.contains("expected 3 documents, got 2"));
        assert!(message.contains(&a.to_string()));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_unknown_ids_message() {
        let conflict = ReorderConflict::UnknownIds { ids: vec![] };
        assert_eq!(conflict.to_string(), "unknown documents");
    }

    #[test]
    fn test_store_errors_are_not_client_errors() {
        let err = CollectionError::from(StoreError::Unavailable("timeout".into()));
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "document store unavailable: timeout");
    }
}
