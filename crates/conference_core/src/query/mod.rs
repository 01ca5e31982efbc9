//! Conference filtering and query planning.
//!
//! # Responsibility
//! - Compile loosely-typed client filters into validated property filters.
//! - Build ordered query plans the repository layer executes.
//!
//! # Invariants
//! - Validation completes before a plan exists; plans are always executable.

pub mod conference_query;
pub mod filter;
