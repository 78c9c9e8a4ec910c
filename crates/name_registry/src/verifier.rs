//! Ownership verification over naming service records
//!
//! Two independent proofs exist. The token proof binds to the registration
//! object that currently backs a name; the address proof trusts whatever
//! address the name resolves to. Neither takes precedence on its own: each
//! caller picks the proof its operation is defined over.

use namereg_naming::{NameRegistration, NamingService};
use namereg_types::{Address, NameRecord};
use std::sync::Arc;
use thiserror::Error;

/// A caller's claim of control over a name.
#[derive(Debug, Clone, Copy)]
pub enum OwnershipProof<'a> {
    /// The caller presents the registration object itself.
    Token(&'a NameRegistration),
    /// The caller claims to be the address `name` resolves to.
    Address { name: &'a str, caller: Address },
}

impl OwnershipProof<'_> {
    pub fn name(&self) -> &str {
        match self {
            OwnershipProof::Token(registration) => registration.name(),
            OwnershipProof::Address { name, .. } => name,
        }
    }
}

/// Why a proof was rejected. Only surfaced in logs; registry callers see a
/// single `NotAuthorized`.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum Denial {
    #[error("name is not registered")]
    Unregistered,
    #[error("registration token is no longer the one backing the name")]
    TokenSuperseded,
    #[error("name has no target address")]
    NoTarget,
    #[error("name targets a different address")]
    TargetMismatch,
}

/// Checks ownership proofs against the live records of a naming service.
#[derive(Clone)]
pub struct OwnershipVerifier {
    naming: Arc<dyn NamingService>,
}

impl std::fmt::Debug for OwnershipVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnershipVerifier").finish_non_exhaustive()
    }
}

impl OwnershipVerifier {
    pub fn new(naming: Arc<dyn NamingService>) -> Self {
        Self { naming }
    }

    /// Current naming service record for `name`.
    pub fn resolve(&self, name: &str) -> Option<NameRecord> {
        self.naming.resolve(name)
    }

    pub fn token_proof(&self, registration: &NameRegistration) -> bool {
        self.check(&OwnershipProof::Token(registration)).is_ok()
    }

    pub fn address_proof(&self, name: &str, caller: Address) -> bool {
        self.check(&OwnershipProof::Address { name, caller }).is_ok()
    }

    pub fn verify(&self, proof: &OwnershipProof<'_>) -> bool {
        self.check(proof).is_ok()
    }

    pub fn check(&self, proof: &OwnershipProof<'_>) -> Result<(), Denial> {
        let record = self.resolve(proof.name()).ok_or(Denial::Unregistered)?;
        match proof {
            OwnershipProof::Token(registration) => {
                if record.token_id == Some(registration.id()) {
                    Ok(())
                } else {
                    Err(Denial::TokenSuperseded)
                }
            }
            OwnershipProof::Address { caller, .. } => match record.target {
                Some(target) if target == *caller => Ok(()),
                Some(_) => Err(Denial::TargetMismatch),
                None => Err(Denial::NoTarget),
            },
        }
    }
}
