//! Domain layer - pure business logic with no I/O.
//!
//! This layer contains the core concepts and invariants:
//! - Rate limiting policies and fixed-window counters
//! - Client identity derivation
//! - Documents, versioning and listing order
//! - Reorder validation
//! - The error taxonomy shared by the layers above
//!
//! All types in this layer are pure and easily testable.

pub mod document;
pub mod error;
pub mod identity;
pub mod policy;
pub mod reorder;
pub mod window;
