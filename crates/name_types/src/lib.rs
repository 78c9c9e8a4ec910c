//! Shared types for the name-authenticated registry
//!
//! Identifiers handed out by the ledger substrate, addresses of callers,
//! naming-service records, and the pure string helpers that decide whether
//! one name is a structural child of another.

pub mod ids;
pub mod name;

pub use ids::{Address, ObjectId};
pub use name::*;
