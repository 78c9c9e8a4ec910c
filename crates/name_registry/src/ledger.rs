//! Object substrate model
//!
//! Stands in for the ledger the registry runs on: it hands out globally
//! unique object ids, tracks which capability objects are still alive, and
//! keeps the sink that discarded entries are sent to.

use crate::errors::{RegistryError, Result};
use namereg_types::ObjectId;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Kind of object an id was allocated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Entry,
    Account,
    AccountCap,
    SubdomainCap,
}

impl ObjectKind {
    fn domain(self) -> &'static [u8] {
        match self {
            ObjectKind::Entry => b"namereg/entry",
            ObjectKind::Account => b"namereg/account",
            ObjectKind::AccountCap => b"namereg/account-cap",
            ObjectKind::SubdomainCap => b"namereg/subdomain-cap",
        }
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    nonce: u64,
    live_caps: HashMap<ObjectId, ObjectKind>,
    burned: HashSet<ObjectId>,
}

/// Shared object substrate. One instance per deployment.
#[derive(Debug, Default)]
pub struct Ledger {
    state: RwLock<LedgerState>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id; never returns the same id twice.
    pub fn allocate(&self, kind: ObjectKind) -> ObjectId {
        let mut state = self.state.write();
        Self::next_id(&mut state, kind)
    }

    fn next_id(state: &mut LedgerState, kind: ObjectKind) -> ObjectId {
        let id = ObjectId::derive(kind.domain(), state.nonce);
        state.nonce += 1;
        id
    }

    /// Allocate a capability id and mark it live.
    pub(crate) fn issue_capability(&self, kind: ObjectKind) -> ObjectId {
        let mut state = self.state.write();
        let id = Self::next_id(&mut state, kind);
        state.live_caps.insert(id, kind);
        id
    }

    /// Destroy a live capability. Fails if it was consumed before, was never
    /// issued, or was issued as a different kind.
    pub(crate) fn consume_capability(&self, id: ObjectId, kind: ObjectKind) -> Result<()> {
        let mut state = self.state.write();
        match state.live_caps.get(&id) {
            Some(live_kind) if *live_kind == kind => {
                state.live_caps.remove(&id);
                debug!(capability = %id.short(), ?kind, "capability consumed");
                Ok(())
            }
            _ => Err(RegistryError::CapabilityUnavailable { id }),
        }
    }

    pub fn is_live(&self, id: &ObjectId) -> bool {
        self.state.read().live_caps.contains_key(id)
    }

    pub fn live_capabilities(&self) -> usize {
        self.state.read().live_caps.len()
    }

    /// Send a discarded object to the sink.
    pub(crate) fn burn(&self, id: ObjectId) {
        self.state.write().burned.insert(id);
    }

    pub fn is_burned(&self, id: &ObjectId) -> bool {
        self.state.read().burned.contains(id)
    }

    pub fn burned_count(&self) -> usize {
        self.state.read().burned.len()
    }
}
