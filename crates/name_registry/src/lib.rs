//! Name-Authenticated Registry
//!
//! A hierarchical key-value store whose write access is gated by proof of
//! ownership of a human-readable name. Ownership is checked against an
//! external [`NamingService`], either through the registration token that
//! currently backs a name or through the address the name resolves to.
//! Owners of a parent name can hand out single-use capabilities that let
//! others open child accounts beneath it.

pub mod account;
pub mod capability;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod registry;
pub mod verifier;

pub use account::{Account, AccountBook};
pub use capability::{AccountCap, CapabilityIssuer, SubdomainCap};
pub use config::{ConfigError, DuplicateNamespacePolicy, RegistryConfig, SubdomainPolicy};
pub use errors::*;
pub use ledger::{Ledger, ObjectKind};
pub use registry::{Entry, EntryWrite, Namespace, Registry, RegistrySnapshot};
pub use verifier::{Denial, OwnershipProof, OwnershipVerifier};

pub use namereg_naming::{NameRegistration, NamingService};
pub use namereg_types::{Address, NameRecord, ObjectId};

use std::sync::Arc;
use tracing::info;

/// One deployment: the single flat registry, the account book and the
/// capability issuer, all sharing one ledger and one naming service.
#[derive(Debug)]
pub struct Deployment {
    ledger: Arc<Ledger>,
    verifier: OwnershipVerifier,
    registry: Registry,
    accounts: AccountBook,
    issuer: CapabilityIssuer,
}

impl Deployment {
    pub fn new(owner: Address, naming: Arc<dyn NamingService>, config: RegistryConfig) -> Self {
        let ledger = Arc::new(Ledger::new());
        let verifier = OwnershipVerifier::new(naming);
        let registry = Registry::new(owner, verifier.clone(), ledger.clone(), config.clone());
        let accounts = AccountBook::new(ledger.clone(), config);
        let issuer = CapabilityIssuer::new(ledger.clone());
        info!(%owner, "registry deployed");
        Self {
            ledger,
            verifier,
            registry,
            accounts,
            issuer,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn accounts(&self) -> &AccountBook {
        &self.accounts
    }

    pub fn issuer(&self) -> &CapabilityIssuer {
        &self.issuer
    }

    pub fn verifier(&self) -> &OwnershipVerifier {
        &self.verifier
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }
}
