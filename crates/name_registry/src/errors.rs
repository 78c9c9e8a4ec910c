//! Error types for the name-authenticated registry

use namereg_types::{NameError, ObjectId};
use thiserror::Error;

/// Every failure aborts the enclosing operation with no state change.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// Ownership proof failed. Deliberately does not say whether the name is
    /// unregistered or registered to someone else.
    #[error("Not authorized for name: {name}")]
    NotAuthorized { name: String },

    #[error("Namespace not found: {namespace}")]
    NamespaceNotFound { namespace: String },

    #[error("Entry not found: {key} in namespace {namespace}")]
    EntryNotFound { namespace: String, key: String },

    #[error("Capability/registration mismatch: expected {expected}, found {found}")]
    Mismatch { expected: ObjectId, found: ObjectId },

    #[error("Already exists: {what}")]
    AlreadyExists { what: String },

    #[error("Invalid domain '{name}': {reason}")]
    InvalidDomain { name: String, reason: String },

    #[error("Capability {id} was already consumed or never issued")]
    CapabilityUnavailable { id: ObjectId },

    #[error("Account not found: {id}")]
    AccountNotFound { id: ObjectId },

    #[error("Field not found: {key}")]
    FieldNotFound { key: String },

    #[error("{what} exceeds limit of {limit}")]
    LimitExceeded { what: String, limit: usize },
}

impl RegistryError {
    pub(crate) fn invalid_domain(name: &str, err: NameError) -> Self {
        Self::InvalidDomain {
            name: name.to_string(),
            reason: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;
