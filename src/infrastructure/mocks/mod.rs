//! Mock implementations for testing.
//!
//! This module provides test doubles for infrastructure adapters,
//! enabling controlled testing of application logic.

pub mod clock;
pub mod store;

pub use clock::MockClock;
pub use store::FailingDocumentStore;
