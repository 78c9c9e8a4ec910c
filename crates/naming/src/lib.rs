//! Naming service seam
//!
//! The registry never stores name ownership itself: it asks an external
//! naming service who currently owns a name, which address it points at and
//! which registration object backs it. This crate defines that interface,
//! owns the minting of [`NameRegistration`] objects and ships an in-memory
//! resolver used by tests and embedders.

pub mod memory;
pub mod registration;

pub use memory::InMemoryNamingService;
pub use registration::NameRegistration;

use namereg_types::{labels_of, NameRecord};
use thiserror::Error;

/// Errors raised by naming service administration calls.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("name is not registered: {name}")]
    NotRegistered { name: String },
}

/// Resolves human-readable names to their current ownership record.
pub trait NamingService: Send + Sync {
    /// Current record for `name`, or `None` when the name is unregistered.
    fn resolve(&self, name: &str) -> Option<NameRecord>;

    /// Ordered path components of `name`, leaf first.
    fn labels_of(&self, name: &str) -> Vec<String> {
        labels_of(name).into_iter().map(str::to_string).collect()
    }
}
