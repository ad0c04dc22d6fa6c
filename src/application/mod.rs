//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain logic and manages the runtime behavior:
//! - Window registry (storage of per-key rate windows)
//! - Rate limiter (admission decisions)
//! - Sweeper (periodic eviction of expired windows)
//! - Admission facade (identity + policy table + limiter)
//! - Document collection (ordering, versioning, reorder)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod admission;
pub mod collection;
pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod registry;
pub mod sweeper;
