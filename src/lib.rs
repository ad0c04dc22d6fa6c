//! # doc-throttle
//!
//! Admission control and race-resistant ordering for multi-user document
//! services.
//!
//! The crate has two halves that usually sit back to back in a request
//! handler:
//!
//! - **Admission control**: every inbound request is attributed to a client
//!   identity and counted against a fixed window for its endpoint class.
//!   Requests past the limit are denied with a reset time, never queued.
//! - **Document ordering**: a user's documents keep a stable, explicit
//!   order. New documents append at the end, content edits bump a version
//!   counter, and a reorder replaces the whole ordering in one atomic batch.
//!
//! ## Quick Start
//!
//! ```rust
//! use doc_throttle::{AdmissionControl, PolicyKind, RequestMetadata};
//!
//! let control = AdmissionControl::new();
//! let request = RequestMetadata::new().with_forwarded_for("203.0.113.7");
//!
//! let admission = control.admit(&request, PolicyKind::Standard);
//! assert!(admission.is_allowed());
//!
//! for (name, value) in control.headers(&admission).to_pairs() {
//!     println!("{name}: {value}");
//! }
//! ```
//!
//! ## Policies
//!
//! Each endpoint class ([`PolicyKind`]) has its own [`RateLimitPolicy`]:
//!
//! | kind       | limit | window     |
//! |------------|-------|------------|
//! | `standard` | 100   | 15 minutes |
//! | `ai`       | 10    | 1 minute   |
//! | `auth`     | 5     | 15 minutes |
//!
//! Override them with [`AdmissionControlBuilder::with_policy`] or load a
//! [`LimiterConfig`] with serde.
//!
//! ```rust
//! use doc_throttle::{AdmissionControl, PolicyKind, RateLimitPolicy};
//! use std::time::Duration;
//!
//! let control = AdmissionControl::builder()
//!     .with_policy(PolicyKind::Ai, RateLimitPolicy::new(Duration::from_secs(60), 3).unwrap())
//!     .with_sweep_interval(Duration::from_secs(30))
//!     .build()
//!     .unwrap();
//! assert_eq!(control.policies().get(PolicyKind::Ai).max_requests(), 3);
//! ```
//!
//! ## Documents
//!
//! ```rust
//! use doc_throttle::{DocumentCollection, InMemoryDocumentStore, NewDocument, OwnerId, SystemClock};
//! use std::sync::Arc;
//!
//! # tokio_test_block(async {
//! let docs = DocumentCollection::new(InMemoryDocumentStore::new(), Arc::new(SystemClock::new()));
//! let owner = OwnerId::new("alice");
//!
//! let a = docs.create(&owner, NewDocument::new("A", "first")).await.unwrap();
//! let b = docs.create(&owner, NewDocument::new("B", "second")).await.unwrap();
//! docs.reorder(&owner, &[b.id(), a.id()]).await.unwrap();
//!
//! let titles: Vec<_> = docs
//!     .list_by_owner(&owner)
//!     .await
//!     .unwrap()
//!     .iter()
//!     .map(|d| d.title().to_string())
//!     .collect();
//! assert_eq!(titles, ["B", "A"]);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
//! # }
//! ```
//!
//! ## Observability
//!
//! Decisions and document operations are logged through `tracing`; install
//! any subscriber to see them. Counters are available from
//! [`AdmissionControl::metrics`]:
//!
//! ```rust
//! # use doc_throttle::{AdmissionControl, PolicyKind, RequestMetadata};
//! # let control = AdmissionControl::new();
//! # control.admit(&RequestMetadata::new(), PolicyKind::Auth);
//! let snapshot = control.metrics().snapshot();
//! println!("admitted: {}, denied: {}", snapshot.requests_admitted, snapshot.requests_denied);
//! ```
//!
//! ## Background Sweep
//!
//! With the `async` feature (default), [`AdmissionControl::start_sweeper`]
//! spawns a tokio task that evicts expired windows on a fixed interval.
//! Stop it with [`AdmissionControl::shutdown`].

// Domain layer - pure business logic
pub mod domain;

// Application layer - orchestration
pub mod application;

// Infrastructure layer - external adapters
pub mod infrastructure;

// Re-export commonly used types for convenience
pub use domain::{
    document::{Document, DocumentContent, DocumentEdit, DocumentId, OwnerId},
    error::{
        CollectionError, LimitExceeded, ReorderConflict, StoreError, ValidationFailure,
    },
    identity::{ClientIdentity, RequestMetadata},
    policy::{PolicyConfig, PolicyError, PolicyKind, PolicyTable, RateLimitPolicy},
    reorder::{PositionUpdate, ReorderPlan, ReorderRequest},
    window::{AdmissionDecision, RateLimitHeaders, RateWindow},
};

pub use application::{
    admission::{Admission, AdmissionControl, AdmissionControlBuilder, BuildError, LimiterConfig},
    collection::{DocumentCollection, DocumentPatch, NewDocument},
    limiter::RateLimiter,
    metrics::{Metrics, MetricsSnapshot},
    ports::{Clock, DocumentStore, Storage},
    registry::WindowRegistry,
    sweeper::{SweepConfig, SweepConfigError, Sweeper},
};

#[cfg(feature = "async")]
pub use application::sweeper::{ShutdownError, SweeperHandle};

pub use infrastructure::{
    clock::SystemClock, memory_store::InMemoryDocumentStore, storage::ShardedStorage,
};
