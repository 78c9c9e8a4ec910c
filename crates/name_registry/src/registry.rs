//! Flat namespace registry
//!
//! The registry owner creates namespaces; anyone who proves control of a
//! name may write the entry keyed by that name inside any namespace.
//! Reads are public.

use crate::config::{DuplicateNamespacePolicy, RegistryConfig, SubdomainPolicy};
use crate::errors::{RegistryError, Result};
use crate::ledger::{Ledger, ObjectKind};
use crate::verifier::{OwnershipProof, OwnershipVerifier};
use namereg_naming::NameRegistration;
use namereg_types::{child_suffix, is_suffix_of, validate_name, Address, NameRecord, ObjectId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Keyed payload record inside a namespace.
///
/// Entries are never edited in place: a write produces a new object with a
/// new id and the previous one is burned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    id: ObjectId,
    key: String,
    payload: Vec<u8>,
    /// Owner address of `key` when the entry was written
    owner: Option<Address>,
    /// Target address of `key` when the entry was written
    target: Option<Address>,
}

impl Entry {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn owner(&self) -> Option<Address> {
        self.owner
    }

    pub fn target(&self) -> Option<Address> {
        self.target
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Namespace {
    name: String,
    entries: BTreeMap<String, Entry>,
}

impl Namespace {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryWrite {
    pub entry_id: ObjectId,
    /// Id of the entry that was replaced and burned, if any
    pub replaced: Option<ObjectId>,
}

/// Read-only view of the whole registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub owner: Address,
    pub namespaces: BTreeMap<String, Vec<Entry>>,
}

/// The single flat registry of namespaces, administered by `owner`.
#[derive(Debug)]
pub struct Registry {
    owner: Address,
    namespaces: RwLock<BTreeMap<String, Namespace>>,
    verifier: OwnershipVerifier,
    ledger: Arc<Ledger>,
    config: RegistryConfig,
}

impl Registry {
    pub fn new(
        owner: Address,
        verifier: OwnershipVerifier,
        ledger: Arc<Ledger>,
        config: RegistryConfig,
    ) -> Self {
        Self {
            owner,
            namespaces: RwLock::new(BTreeMap::new()),
            verifier,
            ledger,
            config,
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn add_namespace(&self, name: &str, caller: Address) -> Result<()> {
        if caller != self.owner {
            return Err(RegistryError::NotAuthorized {
                name: name.to_string(),
            });
        }
        if name.is_empty() || name.len() > self.config.max_name_len {
            return Err(RegistryError::InvalidDomain {
                name: name.to_string(),
                reason: format!("namespace name must be 1..={} bytes", self.config.max_name_len),
            });
        }

        let mut namespaces = self.namespaces.write();
        if namespaces.contains_key(name) {
            return match self.config.duplicate_namespace {
                DuplicateNamespacePolicy::Reject => Err(RegistryError::AlreadyExists {
                    what: format!("namespace {name}"),
                }),
                DuplicateNamespacePolicy::Ignore => {
                    debug!(namespace = name, "namespace already exists, ignoring");
                    Ok(())
                }
            };
        }
        namespaces.insert(name.to_string(), Namespace::new(name));
        info!(namespace = name, "namespace added");
        Ok(())
    }

    /// Write `key` on behalf of the address `key` currently resolves to.
    pub fn update_entry(
        &self,
        namespace: &str,
        key: &str,
        payload: Vec<u8>,
        caller: Address,
    ) -> Result<EntryWrite> {
        let mut namespaces = self.namespaces.write();
        let ns = Self::namespace_mut(&mut namespaces, namespace)?;
        self.validate_write(key, &payload)?;
        self.authorize(&OwnershipProof::Address { name: key, caller })?;
        Ok(self.write_entry(ns, key, payload))
    }

    /// Write the entry keyed by the token's own name; the key cannot be chosen
    /// by the caller.
    pub fn update_entry_with_token(
        &self,
        namespace: &str,
        token: &NameRegistration,
        payload: Vec<u8>,
    ) -> Result<EntryWrite> {
        let key = token.name();
        let mut namespaces = self.namespaces.write();
        let ns = Self::namespace_mut(&mut namespaces, namespace)?;
        self.validate_write(key, &payload)?;
        self.authorize(&OwnershipProof::Token(token))?;
        Ok(self.write_entry(ns, key, payload))
    }

    /// Write a child name's entry using the parent's registration.
    pub fn update_subdomain_entry(
        &self,
        namespace: &str,
        parent_token: &NameRegistration,
        child_key: &str,
        payload: Vec<u8>,
        caller: Address,
    ) -> Result<EntryWrite> {
        let mut namespaces = self.namespaces.write();
        let ns = Self::namespace_mut(&mut namespaces, namespace)?;
        if !is_suffix_of(child_key, &child_suffix(parent_token.name())) {
            return Err(RegistryError::InvalidDomain {
                name: child_key.to_string(),
                reason: format!("not a subdomain of {}", parent_token.name()),
            });
        }
        self.validate_write(child_key, &payload)?;

        let child_proof = OwnershipProof::Address {
            name: child_key,
            caller,
        };
        let authorized = match self.config.subdomain_policy {
            SubdomainPolicy::ParentAuthority => {
                self.verifier.token_proof(parent_token) || self.verifier.verify(&child_proof)
            }
            SubdomainPolicy::RespectChildDelegation => {
                let delegated = self
                    .verifier
                    .resolve(child_key)
                    .is_some_and(|record| record.target.is_some());
                if delegated {
                    self.verifier.verify(&child_proof)
                } else {
                    self.verifier.token_proof(parent_token)
                }
            }
        };
        if !authorized {
            debug!(
                parent = parent_token.name(),
                child = child_key,
                %caller,
                "subdomain write denied"
            );
            return Err(RegistryError::NotAuthorized {
                name: child_key.to_string(),
            });
        }
        Ok(self.write_entry(ns, child_key, payload))
    }

    pub fn query(&self, namespace: &str, key: &str) -> Result<Entry> {
        let namespaces = self.namespaces.read();
        let ns = namespaces
            .get(namespace)
            .ok_or_else(|| RegistryError::NamespaceNotFound {
                namespace: namespace.to_string(),
            })?;
        ns.get(key)
            .cloned()
            .ok_or_else(|| RegistryError::EntryNotFound {
                namespace: namespace.to_string(),
                key: key.to_string(),
            })
    }

    pub fn remove_entry(&self, namespace: &str, key: &str, caller: Address) -> Result<()> {
        let mut namespaces = self.namespaces.write();
        let ns = Self::namespace_mut(&mut namespaces, namespace)?;
        if !ns.entries.contains_key(key) {
            return Err(RegistryError::EntryNotFound {
                namespace: namespace.to_string(),
                key: key.to_string(),
            });
        }
        self.authorize(&OwnershipProof::Address { name: key, caller })?;

        if let Some(entry) = ns.entries.remove(key) {
            self.ledger.burn(entry.id);
            info!(namespace, key, entry = %entry.id.short(), "entry removed");
        }
        Ok(())
    }

    pub fn has_namespace(&self, name: &str) -> bool {
        self.namespaces.read().contains_key(name)
    }

    pub fn namespaces(&self) -> Vec<String> {
        self.namespaces.read().keys().cloned().collect()
    }

    pub fn entry_keys(&self, namespace: &str) -> Result<Vec<String>> {
        let namespaces = self.namespaces.read();
        namespaces
            .get(namespace)
            .map(|ns| ns.entries.keys().cloned().collect())
            .ok_or_else(|| RegistryError::NamespaceNotFound {
                namespace: namespace.to_string(),
            })
    }

    pub fn entry_count(&self, namespace: &str) -> Result<usize> {
        let namespaces = self.namespaces.read();
        namespaces
            .get(namespace)
            .map(Namespace::len)
            .ok_or_else(|| RegistryError::NamespaceNotFound {
                namespace: namespace.to_string(),
            })
    }

    /// Number of entries discarded by replacement or removal
    pub fn burned_entries(&self) -> usize {
        self.ledger.burned_count()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let namespaces = self.namespaces.read();
        RegistrySnapshot {
            owner: self.owner,
            namespaces: namespaces
                .iter()
                .map(|(name, ns)| (name.clone(), ns.entries.values().cloned().collect()))
                .collect(),
        }
    }

    fn namespace_mut<'a>(
        namespaces: &'a mut BTreeMap<String, Namespace>,
        namespace: &str,
    ) -> Result<&'a mut Namespace> {
        namespaces
            .get_mut(namespace)
            .ok_or_else(|| RegistryError::NamespaceNotFound {
                namespace: namespace.to_string(),
            })
    }

    fn validate_write(&self, key: &str, payload: &[u8]) -> Result<()> {
        validate_name(key, self.config.max_name_len)
            .map_err(|e| RegistryError::invalid_domain(key, e))?;
        if payload.len() > self.config.max_payload_bytes {
            return Err(RegistryError::LimitExceeded {
                what: format!("payload of {} bytes", payload.len()),
                limit: self.config.max_payload_bytes,
            });
        }
        Ok(())
    }

    fn authorize(&self, proof: &OwnershipProof<'_>) -> Result<()> {
        self.verifier.check(proof).map_err(|denial| {
            debug!(name = proof.name(), reason = %denial, "ownership proof rejected");
            RegistryError::NotAuthorized {
                name: proof.name().to_string(),
            }
        })
    }

    /// Insert a fresh entry for `key`, burning whatever it replaces.
    fn write_entry(&self, ns: &mut Namespace, key: &str, payload: Vec<u8>) -> EntryWrite {
        let record: NameRecord = self.verifier.resolve(key).unwrap_or_default();
        let entry = Entry {
            id: self.ledger.allocate(ObjectKind::Entry),
            key: key.to_string(),
            payload,
            owner: record.owner,
            target: record.target,
        };
        let entry_id = entry.id;
        let replaced = ns.entries.insert(key.to_string(), entry).map(|old| {
            self.ledger.burn(old.id);
            old.id
        });
        info!(
            namespace = %ns.name,
            key,
            entry = %entry_id.short(),
            replaced = replaced.is_some(),
            "entry written"
        );
        EntryWrite { entry_id, replaced }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namereg_naming::InMemoryNamingService;

    const OWNER: Address = Address([0xA; 32]);
    const ALICE: Address = Address([0xA1; 32]);
    const MALLORY: Address = Address([0x66; 32]);

    fn setup(config: RegistryConfig) -> (Arc<InMemoryNamingService>, Registry) {
        let naming = Arc::new(InMemoryNamingService::new());
        let registry = Registry::new(
            OWNER,
            OwnershipVerifier::new(naming.clone()),
            Arc::new(Ledger::new()),
            config,
        );
        registry.add_namespace("ns", OWNER).unwrap();
        (naming, registry)
    }

    #[test]
    fn test_duplicate_namespace_policies() {
        let (_, registry) = setup(RegistryConfig::default());
        assert!(matches!(
            registry.add_namespace("ns", OWNER),
            Err(RegistryError::AlreadyExists { .. })
        ));

        let (naming, registry) = setup(RegistryConfig {
            duplicate_namespace: DuplicateNamespacePolicy::Ignore,
            ..Default::default()
        });
        naming.register_with_target("alice.tld", ALICE, ALICE);
        registry.update_entry("ns", "alice.tld", b"v1".to_vec(), ALICE).unwrap();
        registry.add_namespace("ns", OWNER).unwrap();
        assert_eq!(registry.entry_count("ns").unwrap(), 1);
    }

    #[test]
    fn test_entry_captures_naming_record() {
        let (naming, registry) = setup(RegistryConfig::default());
        naming.register_with_target("alice.tld", OWNER, ALICE);
        registry.update_entry("ns", "alice.tld", b"v1".to_vec(), ALICE).unwrap();

        let entry = registry.query("ns", "alice.tld").unwrap();
        assert_eq!(entry.owner(), Some(OWNER));
        assert_eq!(entry.target(), Some(ALICE));
        assert_eq!(entry.key(), "alice.tld");
    }

    #[test]
    fn test_token_write_uses_token_name() {
        let (naming, registry) = setup(RegistryConfig::default());
        let token = naming.register("alice.tld", ALICE);
        registry
            .update_entry_with_token("ns", &token, b"hello".to_vec())
            .unwrap();
        assert_eq!(registry.query("ns", "alice.tld").unwrap().payload(), b"hello");

        let _newer = naming.register("alice.tld", ALICE);
        assert_eq!(
            registry.update_entry_with_token("ns", &token, b"stale".to_vec()),
            Err(RegistryError::NotAuthorized {
                name: "alice.tld".into()
            })
        );
    }

    #[test]
    fn test_subdomain_write_parent_authority() {
        let (naming, registry) = setup(RegistryConfig::default());
        let parent = naming.register("ns.tld", ALICE);
        naming.register_with_target("bob.ns.tld", MALLORY, MALLORY);

        // parent holder wins even though the child targets someone else
        registry
            .update_subdomain_entry("ns", &parent, "bob.ns.tld", b"p".to_vec(), ALICE)
            .unwrap();
        // the child's target may write through the parent token too
        registry
            .update_subdomain_entry("ns", &parent, "bob.ns.tld", b"c".to_vec(), MALLORY)
            .unwrap();

        assert!(matches!(
            registry.update_subdomain_entry("ns", &parent, "ns.tld", b"x".to_vec(), ALICE),
            Err(RegistryError::InvalidDomain { .. })
        ));
        assert!(matches!(
            registry.update_subdomain_entry("ns", &parent, "bobns.tld", b"x".to_vec(), ALICE),
            Err(RegistryError::InvalidDomain { .. })
        ));
    }

    #[test]
    fn test_subdomain_write_stale_parent_falls_back_to_child_target() {
        let (naming, registry) = setup(RegistryConfig::default());
        let stale = naming.register("ns.tld", ALICE);
        let _current = naming.register("ns.tld", ALICE);

        assert!(matches!(
            registry.update_subdomain_entry("ns", &stale, "bob.ns.tld", b"x".to_vec(), ALICE),
            Err(RegistryError::NotAuthorized { .. })
        ));

        naming.register_with_target("bob.ns.tld", ALICE, ALICE);
        registry
            .update_subdomain_entry("ns", &stale, "bob.ns.tld", b"x".to_vec(), ALICE)
            .unwrap();
    }

    #[test]
    fn test_subdomain_write_respecting_child_delegation() {
        let (naming, registry) = setup(RegistryConfig {
            subdomain_policy: SubdomainPolicy::RespectChildDelegation,
            ..Default::default()
        });
        let parent = naming.register("ns.tld", ALICE);

        // undelegated child: parent holder writes
        registry
            .update_subdomain_entry("ns", &parent, "carol.ns.tld", b"p".to_vec(), ALICE)
            .unwrap();

        naming.register_with_target("bob.ns.tld", MALLORY, MALLORY);
        assert!(matches!(
            registry.update_subdomain_entry("ns", &parent, "bob.ns.tld", b"p".to_vec(), ALICE),
            Err(RegistryError::NotAuthorized { .. })
        ));
        registry
            .update_subdomain_entry("ns", &parent, "bob.ns.tld", b"c".to_vec(), MALLORY)
            .unwrap();
    }

    #[test]
    fn test_write_limits() {
        let (naming, registry) = setup(RegistryConfig {
            max_payload_bytes: 4,
            ..Default::default()
        });
        naming.register_with_target("alice.tld", ALICE, ALICE);
        assert!(matches!(
            registry.update_entry("ns", "alice.tld", vec![0u8; 5], ALICE),
            Err(RegistryError::LimitExceeded { limit: 4, .. })
        ));
        assert!(matches!(
            registry.update_entry("ns", "Alice..tld", vec![], ALICE),
            Err(RegistryError::InvalidDomain { .. })
        ));
        assert!(matches!(
            registry.update_entry("missing", "alice.tld", vec![], ALICE),
            Err(RegistryError::NamespaceNotFound { .. })
        ));
    }

    #[test]
    fn test_snapshot_lists_entries() {
        let (naming, registry) = setup(RegistryConfig::default());
        registry.add_namespace("other", OWNER).unwrap();
        naming.register_with_target("alice.tld", ALICE, ALICE);
        registry.update_entry("ns", "alice.tld", b"v1".to_vec(), ALICE).unwrap();

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.owner, OWNER);
        assert_eq!(snapshot.namespaces["ns"].len(), 1);
        assert!(snapshot.namespaces["other"].is_empty());

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: RegistrySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.namespaces["ns"][0].payload(), b"v1");
    }
}
