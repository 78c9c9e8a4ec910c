//! In-memory naming service

use crate::{NameRegistration, NamingError, NamingService};
use namereg_types::{Address, NameRecord, ObjectId};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

const TOKEN_DOMAIN: &[u8] = b"namereg/registration";

/// Shared by every service instance in the process so two services never
/// mint the same registration id.
static NEXT_TOKEN: AtomicU64 = AtomicU64::new(0);

/// Naming service backed by a hashmap.
///
/// Every call to [`register`](Self::register) mints a registration object
/// with a fresh id and makes it the only token that proves ownership of the
/// name; older tokens for the same name stop verifying.
#[derive(Debug, Default)]
pub struct InMemoryNamingService {
    records: RwLock<HashMap<String, NameRecord>>,
}

impl InMemoryNamingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) `name` to `owner` and hand back its token.
    pub fn register(&self, name: &str, owner: Address) -> NameRegistration {
        self.mint(name, owner, None)
    }

    /// Register `name` and point it at `target` in one step.
    pub fn register_with_target(
        &self,
        name: &str,
        owner: Address,
        target: Address,
    ) -> NameRegistration {
        self.mint(name, owner, Some(target))
    }

    fn mint(&self, name: &str, owner: Address, target: Option<Address>) -> NameRegistration {
        let id = ObjectId::derive(TOKEN_DOMAIN, NEXT_TOKEN.fetch_add(1, Ordering::Relaxed));
        let mut records = self.records.write();
        let record = records.entry(name.to_string()).or_default();
        if record.token_id.is_some() {
            debug!(name, "superseding previous registration token");
        }
        record.owner = Some(owner);
        record.token_id = Some(id);
        if target.is_some() {
            record.target = target;
        }
        NameRegistration::new(id, name)
    }

    /// Point `name` at `target`, or clear the target with `None`.
    pub fn set_target(&self, name: &str, target: Option<Address>) -> Result<(), NamingError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(name)
            .ok_or_else(|| NamingError::NotRegistered {
                name: name.to_string(),
            })?;
        record.target = target;
        Ok(())
    }

    /// Record a new owner address; the registration token is unchanged.
    pub fn transfer(&self, name: &str, new_owner: Address) -> Result<(), NamingError> {
        let mut records = self.records.write();
        let record = records
            .get_mut(name)
            .ok_or_else(|| NamingError::NotRegistered {
                name: name.to_string(),
            })?;
        record.owner = Some(new_owner);
        Ok(())
    }

    /// Drop the name entirely.
    pub fn unregister(&self, name: &str) -> Result<NameRecord, NamingError> {
        self.records
            .write()
            .remove(name)
            .ok_or_else(|| NamingError::NotRegistered {
                name: name.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl NamingService for InMemoryNamingService {
    fn resolve(&self, name: &str) -> Option<NameRecord> {
        self.records.read().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_resolve() {
        let naming = InMemoryNamingService::new();
        let owner = Address::new([1u8; 32]);
        let reg = naming.register("alice.tld", owner);

        let record = naming.resolve("alice.tld").expect("record present");
        assert_eq!(record.owner, Some(owner));
        assert_eq!(record.token_id, Some(reg.id()));
        assert_eq!(record.target, None);
        assert!(naming.resolve("bob.tld").is_none());
    }

    #[test]
    fn test_reregistration_supersedes_token() {
        let naming = InMemoryNamingService::new();
        let owner = Address::new([1u8; 32]);
        let first = naming.register("alice.tld", owner);
        let second = naming.register("alice.tld", owner);

        assert_ne!(first.id(), second.id());
        let record = naming.resolve("alice.tld").unwrap();
        assert_eq!(record.token_id, Some(second.id()));
        assert_eq!(naming.len(), 1);
    }

    #[test]
    fn test_target_updates() {
        let naming = InMemoryNamingService::new();
        let owner = Address::new([1u8; 32]);
        let target = Address::new([2u8; 32]);
        naming.register_with_target("alice.tld", owner, target);
        assert_eq!(naming.resolve("alice.tld").unwrap().target, Some(target));

        naming.set_target("alice.tld", None).unwrap();
        assert_eq!(naming.resolve("alice.tld").unwrap().target, None);

        let err = naming.set_target("missing.tld", Some(target)).unwrap_err();
        assert_eq!(
            err,
            NamingError::NotRegistered {
                name: "missing.tld".into()
            }
        );
    }

    #[test]
    fn test_transfer_and_unregister() {
        let naming = InMemoryNamingService::new();
        let reg = naming.register("alice.tld", Address::new([1u8; 32]));
        naming.transfer("alice.tld", Address::new([9u8; 32])).unwrap();

        let record = naming.resolve("alice.tld").unwrap();
        assert_eq!(record.owner, Some(Address::new([9u8; 32])));
        assert_eq!(record.token_id, Some(reg.id()));

        naming.unregister("alice.tld").unwrap();
        assert!(naming.is_empty());
        assert!(naming.unregister("alice.tld").is_err());
    }

    #[test]
    fn test_separate_services_never_share_token_ids() {
        let real = InMemoryNamingService::new();
        let shadow = InMemoryNamingService::new();
        let genuine = real.register("alice.tld", Address::new([1u8; 32]));
        let lookalike = shadow.register("alice.tld", Address::new([66u8; 32]));

        assert_ne!(genuine.id(), lookalike.id());
        assert_eq!(
            real.resolve("alice.tld").unwrap().token_id,
            Some(genuine.id())
        );
    }

    #[test]
    fn test_labels_of_default() {
        let naming = InMemoryNamingService::new();
        assert_eq!(naming.labels_of("a.b.tld"), vec!["a", "b", "tld"]);
    }
}
