//! Documents and their versioning rules.
//!
//! A [`Document`] only changes through the methods here, which keep three
//! invariants: content edits bump `version` by exactly one, title and
//! position edits never do, and `word_count` always matches the text.

use crate::domain::error::ValidationFailure;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Longest accepted title, in characters.
pub const TITLE_MAX_CHARS: usize = 200;

/// Longest accepted content, in characters.
pub const CONTENT_MAX_CHARS: usize = 1_000_000;

/// Minimum word count before a document is worth analyzing.
pub const ANALYSIS_MIN_WORDS: usize = 100;

/// Analysis is suggested every this many versions.
pub const ANALYSIS_VERSION_INTERVAL: u32 = 5;

/// Unique document identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a new time-ordered identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for DocumentId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Verified identifier of the user owning a set of documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Document text together with its derived word count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentContent {
    text: String,
    word_count: usize,
}

impl DocumentContent {
    /// Wrap text, rejecting content over [`CONTENT_MAX_CHARS`].
    pub fn new(text: impl Into<String>) -> Result<Self, ValidationFailure> {
        let text = text.into();
        if text.chars().count() > CONTENT_MAX_CHARS {
            return Err(ValidationFailure::ContentTooLong {
                max: CONTENT_MAX_CHARS,
            });
        }
        let word_count = text.split_whitespace().count();
        Ok(Self { text, word_count })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn word_count(&self) -> usize {
        self.word_count
    }

    pub fn character_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Whether the text is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.word_count == 0
    }
}

impl TryFrom<String> for DocumentContent {
    type Error = ValidationFailure;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::new(text)
    }
}

impl From<DocumentContent> for String {
    fn from(content: DocumentContent) -> Self {
        content.text
    }
}

/// Validate and normalize a title.
pub fn validate_title(title: &str) -> Result<String, ValidationFailure> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ValidationFailure::BlankTitle);
    }
    if trimmed.chars().count() > TITLE_MAX_CHARS {
        return Err(ValidationFailure::TitleTooLong {
            max: TITLE_MAX_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

/// A user's document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    id: DocumentId,
    owner_id: OwnerId,
    title: String,
    content: DocumentContent,
    version: u32,
    sort_position: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a first-version document.
    ///
    /// The title must already be validated with [`validate_title`].
    pub fn new(
        id: DocumentId,
        owner_id: OwnerId,
        title: String,
        content: DocumentContent,
        sort_position: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            title,
            content,
            version: 1,
            sort_position,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn owner_id(&self) -> &OwnerId {
        &self.owner_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &DocumentContent {
        &self.content
    }

    pub fn word_count(&self) -> usize {
        self.content.word_count()
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn sort_position(&self) -> i64 {
        self.sort_position
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Whether `owner` owns this document.
    pub fn is_owned_by(&self, owner: &OwnerId) -> bool {
        &self.owner_id == owner
    }

    /// Replace the content and bump the version.
    pub fn replace_content(&mut self, content: DocumentContent, now: DateTime<Utc>) {
        self.content = content;
        self.version = self.version.saturating_add(1);
        self.updated_at = now;
    }

    /// Replace the title. The version is left alone.
    pub fn rename(&mut self, title: String, now: DateTime<Utc>) {
        self.title = title;
        self.updated_at = now;
    }

    /// Apply a combined title and content edit with a single version bump.
    pub fn apply(&mut self, title: Option<String>, content: Option<DocumentContent>, now: DateTime<Utc>) {
        if let Some(title) = title {
            self.rename(title, now);
        }
        if let Some(content) = content {
            self.replace_content(content, now);
        }
    }

    /// Move the document. Neither the version nor `updated_at` change.
    pub fn set_sort_position(&mut self, position: i64) {
        self.sort_position = position;
    }

    /// Whether this revision should be sent for text analysis.
    pub fn analysis_due(&self) -> bool {
        self.content.word_count() > ANALYSIS_MIN_WORDS
            && self.version % ANALYSIS_VERSION_INTERVAL == 0
    }
}

/// A field-scoped edit to one document.
///
/// Stores apply it to the row they currently hold, so it never writes the
/// sort position and the version bump lands on the stored version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEdit {
    pub title: Option<String>,
    pub content: Option<DocumentContent>,
    pub at: DateTime<Utc>,
}

impl DocumentEdit {
    /// Apply to `document`, bumping its version when the content changes.
    pub fn apply_to(self, document: &mut Document) {
        document.apply(self.title, self.content, self.at);
    }
}

/// Order documents by position, breaking ties by most recent update.
pub fn sort_for_listing(documents: &mut [Document]) {
    documents.sort_by(|a, b| {
        a.sort_position
            .cmp(&b.sort_position)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn doc(position: i64) -> Document {
        Document::new(
            DocumentId::new(),
            OwnerId::new("alice"),
            "Draft".to_string(),
            DocumentContent::new("one two three").unwrap(),
            position,
            now(),
        )
    }

    #[test]
    fn test_word_count() {
        assert_eq!(DocumentContent::new("").unwrap().word_count(), 0);
        assert_eq!(DocumentContent::new("   \n\t ").unwrap().word_count(), 0);
        assert_eq!(
            DocumentContent::new("  hello   world\nagain ").unwrap().word_count(),
            3
        );
        assert!(DocumentContent::new("  ").unwrap().is_blank());
        assert_eq!(DocumentContent::new("héllo").unwrap().character_count(), 5);
    }

    #[test]
    fn test_content_limit() {
        let text = "a".repeat(CONTENT_MAX_CHARS + 1);
        assert_eq!(
            DocumentContent::new(text),
            Err(ValidationFailure::ContentTooLong {
                max: CONTENT_MAX_CHARS
            })
        );
    }

    #[test]
    fn test_title_validation() {
        assert_eq!(validate_title("  "), Err(ValidationFailure::BlankTitle));
        assert_eq!(validate_title(" Notes ").unwrap(), "Notes");
        assert!(validate_title(&"t".repeat(TITLE_MAX_CHARS)).is_ok());
        assert!(matches!(
            validate_title(&"t".repeat(TITLE_MAX_CHARS + 1)),
            Err(ValidationFailure::TitleTooLong { .. })
        ));
    }

    #[test]
    fn test_content_edit_bumps_version() {
        let mut doc = doc(0);
        assert_eq!(doc.version(), 1);

        let later = now() + Duration::seconds(5);
        doc.replace_content(DocumentContent::new("a b").unwrap(), later);
        assert_eq!(doc.version(), 2);
        assert_eq!(doc.word_count(), 2);
        assert_eq!(doc.updated_at(), later);
        assert_eq!(doc.sort_position(), 0);
    }

    #[test]
    fn test_rename_keeps_version() {
        let mut doc = doc(7);
        doc.rename("Final".to_string(), now() + Duration::seconds(1));
        assert_eq!(doc.version(), 1);
        assert_eq!(doc.title(), "Final");
        assert_eq!(doc.sort_position(), 7);
    }

    #[test]
    fn test_combined_edit_bumps_once() {
        let mut doc = doc(0);
        doc.apply(
            Some("Both".to_string()),
            Some(DocumentContent::new("new text").unwrap()),
            now(),
        );
        assert_eq!(doc.version(), 2);
        assert_eq!(doc.title(), "Both");
    }

    #[test]
    fn test_edit_keeps_position() {
        let mut doc = doc(9);
        DocumentEdit {
            title: None,
            content: Some(DocumentContent::new("moved on").unwrap()),
            at: now() + Duration::seconds(2),
        }
        .apply_to(&mut doc);
        assert_eq!((doc.version(), doc.sort_position()), (2, 9));
        assert_eq!(doc.updated_at(), now() + Duration::seconds(2));
    }

    #[test]
    fn test_position_change_keeps_version_and_timestamp() {
        let mut doc = doc(3);
        let updated = doc.updated_at();
        doc.set_sort_position(0);
        assert_eq!(doc.version(), 1);
        assert_eq!(doc.updated_at(), updated);
    }

    #[test]
    fn test_analysis_due() {
        let mut doc = doc(0);
        let long = DocumentContent::new("word ".repeat(ANALYSIS_MIN_WORDS + 1)).unwrap();
        for _ in 0..3 {
            doc.replace_content(long.clone(), now());
        }
        assert_eq!(doc.version(), 4);
        assert!(!doc.analysis_due());

        doc.replace_content(long, now());
        assert_eq!(doc.version(), 5);
        assert!(doc.analysis_due());

        doc.replace_content(DocumentContent::new("short").unwrap(), now());
        assert!(!doc.analysis_due());
    }

    #[test]
    fn test_listing_order() {
        let a = doc(2);
        let b = doc(0);
        let mut c = doc(2);
        c.rename("Newer".to_string(), now() + Duration::seconds(10));

        let mut docs = vec![a.clone(), b.clone(), c.clone()];
        sort_for_listing(&mut docs);

        let ids: Vec<_> = docs.iter().map(Document::id).collect();
        assert_eq!(ids, vec![b.id(), c.id(), a.id()]);
    }

    #[test]
    fn test_content_serde_recomputes_word_count() {
        let content: DocumentContent = serde_json::from_str("\"four little words here\"").unwrap();
        assert_eq!(content.word_count(), 4);
    }
}
