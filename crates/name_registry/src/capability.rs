//! Single-use capability tokens
//!
//! A capability ties its holder to one specific registration. Capabilities
//! are not `Clone` and are consumed by value; the ledger additionally keeps
//! the set of live capability ids, so a copy rebuilt from serialized bytes
//! cannot be spent twice and an id that was never issued is rejected.

use crate::errors::Result;
use crate::ledger::{Ledger, ObjectKind};
use namereg_naming::NameRegistration;
use namereg_types::ObjectId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Permission to create the one account of a registration.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCap {
    id: ObjectId,
    reg_id: ObjectId,
}

impl AccountCap {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Registration this capability was issued against
    pub fn reg_id(&self) -> ObjectId {
        self.reg_id
    }

    /// Destroy the capability, returning the registration id it was bound to.
    pub(crate) fn consume(self, ledger: &Ledger) -> Result<ObjectId> {
        ledger.consume_capability(self.id, ObjectKind::AccountCap)?;
        Ok(self.reg_id)
    }
}

/// Permission to create one child account under a parent registration.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubdomainCap {
    id: ObjectId,
    parent_reg_id: ObjectId,
    parent_name: String,
}

impl SubdomainCap {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn parent_reg_id(&self) -> ObjectId {
        self.parent_reg_id
    }

    /// Name of the parent registration at the time the capability was minted
    pub fn parent_name(&self) -> &str {
        &self.parent_name
    }

    pub(crate) fn consume(self, ledger: &Ledger) -> Result<ObjectId> {
        ledger.consume_capability(self.id, ObjectKind::SubdomainCap)?;
        Ok(self.parent_reg_id)
    }
}

/// Mints capabilities against registrations.
///
/// Presenting a registration is the whole proof: only its current holder
/// can pass it in, so no naming service lookup happens here.
#[derive(Debug, Clone)]
pub struct CapabilityIssuer {
    ledger: Arc<Ledger>,
}

impl CapabilityIssuer {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self { ledger }
    }

    pub fn request_cap(&self, registration: &NameRegistration) -> AccountCap {
        let id = self.ledger.issue_capability(ObjectKind::AccountCap);
        info!(
            name = registration.name(),
            capability = %id.short(),
            "account capability issued"
        );
        AccountCap {
            id,
            reg_id: registration.id(),
        }
    }

    pub fn request_subdomain_cap(&self, parent: &NameRegistration) -> SubdomainCap {
        let id = self.ledger.issue_capability(ObjectKind::SubdomainCap);
        info!(
            parent = parent.name(),
            capability = %id.short(),
            "subdomain capability issued"
        );
        SubdomainCap {
            id,
            parent_reg_id: parent.id(),
            parent_name: parent.name().to_string(),
        }
    }

    pub fn is_live(&self, id: &ObjectId) -> bool {
        self.ledger.is_live(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RegistryError;
    use namereg_naming::InMemoryNamingService;
    use namereg_types::Address;

    fn registration(name: &str, seed: u8) -> NameRegistration {
        InMemoryNamingService::new().register(name, Address::new([seed; 32]))
    }

    #[test]
    fn test_account_cap_bound_to_registration() {
        let ledger = Arc::new(Ledger::new());
        let issuer = CapabilityIssuer::new(ledger.clone());
        let reg = registration("alice.tld", 1);

        let cap = issuer.request_cap(&reg);
        assert_eq!(cap.reg_id(), reg.id());
        assert!(issuer.is_live(&cap.id()));

        let id = cap.id();
        assert_eq!(cap.consume(&ledger).unwrap(), reg.id());
        assert!(!issuer.is_live(&id));
    }

    #[test]
    fn test_serialized_copy_cannot_be_replayed() {
        let ledger = Arc::new(Ledger::new());
        let issuer = CapabilityIssuer::new(ledger.clone());
        let cap = issuer.request_cap(&registration("alice.tld", 1));

        let bytes = serde_json::to_vec(&cap).unwrap();
        let id = cap.id();
        cap.consume(&ledger).unwrap();

        let replayed: AccountCap = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            replayed.consume(&ledger),
            Err(RegistryError::CapabilityUnavailable { id })
        );
    }

    #[test]
    fn test_subdomain_cap_records_parent_name() {
        let ledger = Arc::new(Ledger::new());
        let issuer = CapabilityIssuer::new(ledger.clone());
        let parent = registration("ns.tld", 2);

        let cap = issuer.request_subdomain_cap(&parent);
        assert_eq!(cap.parent_name(), "ns.tld");
        assert_eq!(cap.parent_reg_id(), parent.id());
        assert_eq!(ledger.live_capabilities(), 1);
        assert_eq!(cap.consume(&ledger).unwrap(), parent.id());
        assert_eq!(ledger.live_capabilities(), 0);
    }

    #[test]
    fn test_each_request_mints_distinct_capability() {
        let ledger = Arc::new(Ledger::new());
        let issuer = CapabilityIssuer::new(ledger);
        let reg = registration("alice.tld", 1);
        let first = issuer.request_cap(&reg);
        let second = issuer.request_cap(&reg);
        assert_ne!(first.id(), second.id());
        assert_eq!(first.reg_id(), second.reg_id());
    }
}
