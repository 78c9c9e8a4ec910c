//! Per-name accounts and delegated sub-accounts
//!
//! An account is created once per registration by spending an
//! [`AccountCap`]. Accounts flagged `is_subaccount` act as namespace service
//! accounts: the holder of their registration can mint [`SubdomainCap`]s and
//! whoever receives one can open a child account linked to the child's own
//! registration. Once minted, that link cannot be revoked from above.
//!
//! Mutations check only that the presented registration is the one the
//! account is linked to. The naming service is not consulted; holding the
//! registration object is the proof.

use crate::capability::{AccountCap, SubdomainCap};
use crate::config::RegistryConfig;
use crate::errors::{RegistryError, Result};
use crate::ledger::{Ledger, ObjectKind};
use namereg_naming::NameRegistration;
use namereg_types::{validate_name, ObjectId, SEPARATOR};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    id: ObjectId,
    reg_id: ObjectId,
    name: String,
    value: String,
    fields: BTreeMap<String, String>,
    is_subaccount: bool,
    parent: Option<String>,
    /// Child label -> child account id
    subaccounts: BTreeMap<String, ObjectId>,
}

impl Account {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Registration this account is permanently linked to
    pub fn reg_id(&self) -> ObjectId {
        self.reg_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn is_subaccount(&self) -> bool {
        self.is_subaccount
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn subaccounts(&self) -> &BTreeMap<String, ObjectId> {
        &self.subaccounts
    }
}

#[derive(Debug, Default)]
struct AccountTables {
    by_id: HashMap<ObjectId, Account>,
    /// Registration id -> accounts linked to it, in creation order
    by_registration: HashMap<ObjectId, Vec<ObjectId>>,
}

impl AccountTables {
    fn get(&self, id: ObjectId) -> Result<&Account> {
        self.by_id
            .get(&id)
            .ok_or(RegistryError::AccountNotFound { id })
    }

    fn get_mut(&mut self, id: ObjectId) -> Result<&mut Account> {
        self.by_id
            .get_mut(&id)
            .ok_or(RegistryError::AccountNotFound { id })
    }

    fn insert(&mut self, account: Account) {
        let linked = self.by_registration.entry(account.reg_id).or_default();
        if !linked.is_empty() {
            // Only capability scarcity prevents this; surface it.
            warn!(
                name = %account.name,
                registration = %account.reg_id.short(),
                existing = linked.len(),
                "registration already has an account"
            );
        }
        linked.push(account.id);
        self.by_id.insert(account.id, account);
    }
}

/// Owner check for account mutations.
fn ensure_owner(registration: &NameRegistration, account: &Account) -> Result<()> {
    if registration.id() != account.reg_id {
        return Err(RegistryError::NotAuthorized {
            name: account.name.clone(),
        });
    }
    Ok(())
}

#[derive(Debug)]
pub struct AccountBook {
    tables: RwLock<AccountTables>,
    ledger: Arc<Ledger>,
    config: RegistryConfig,
}

impl AccountBook {
    pub fn new(ledger: Arc<Ledger>, config: RegistryConfig) -> Self {
        Self {
            tables: RwLock::new(AccountTables::default()),
            ledger,
            config,
        }
    }

    /// Spend `cap` to open the account of `registration`.
    pub fn create_account(
        &self,
        registration: &NameRegistration,
        cap: AccountCap,
    ) -> Result<ObjectId> {
        self.open_account(registration, cap, false)
    }

    /// Like [`create_account`](Self::create_account), but the account may
    /// mint sub-accounts.
    pub fn create_namespace_account(
        &self,
        registration: &NameRegistration,
        cap: AccountCap,
    ) -> Result<ObjectId> {
        self.open_account(registration, cap, true)
    }

    fn open_account(
        &self,
        registration: &NameRegistration,
        cap: AccountCap,
        is_subaccount: bool,
    ) -> Result<ObjectId> {
        if cap.reg_id() != registration.id() {
            return Err(RegistryError::Mismatch {
                expected: cap.reg_id(),
                found: registration.id(),
            });
        }
        let name = registration.name();
        validate_name(name, self.config.max_name_len)
            .map_err(|e| RegistryError::invalid_domain(name, e))?;

        let mut tables = self.tables.write();
        cap.consume(&self.ledger)?;

        let id = self.ledger.allocate(ObjectKind::Account);
        tables.insert(Account {
            id,
            reg_id: registration.id(),
            name: name.to_string(),
            value: String::new(),
            fields: BTreeMap::new(),
            is_subaccount,
            parent: None,
            subaccounts: BTreeMap::new(),
        });
        info!(name, account = %id.short(), is_subaccount, "account created");
        Ok(id)
    }

    /// Spend `cap` to open a child account under `parent_id`, linked to
    /// `child`'s registration, and record it in the parent's sub-account
    /// registry.
    pub fn create_subaccount(
        &self,
        parent_id: ObjectId,
        child: &NameRegistration,
        cap: SubdomainCap,
    ) -> Result<ObjectId> {
        let mut tables = self.tables.write();
        let parent = tables.get(parent_id)?;
        if !parent.is_subaccount {
            return Err(RegistryError::NotAuthorized {
                name: parent.name.clone(),
            });
        }
        if cap.parent_reg_id() != parent.reg_id {
            return Err(RegistryError::Mismatch {
                expected: parent.reg_id,
                found: cap.parent_reg_id(),
            });
        }

        let label = child.leaf_label().to_string();
        let full_name = format!("{label}{SEPARATOR}{}", parent.name);
        if child.name() != full_name {
            return Err(RegistryError::InvalidDomain {
                name: child.name().to_string(),
                reason: format!("not a direct subdomain of {}", parent.name),
            });
        }
        validate_name(&full_name, self.config.max_name_len)
            .map_err(|e| RegistryError::invalid_domain(&full_name, e))?;
        if parent.subaccounts.contains_key(&label) {
            return Err(RegistryError::AlreadyExists {
                what: format!("subaccount {label} of {}", parent.name),
            });
        }
        let parent_name = parent.name.clone();

        cap.consume(&self.ledger)?;

        let id = self.ledger.allocate(ObjectKind::Account);
        tables.insert(Account {
            id,
            reg_id: child.id(),
            name: full_name.clone(),
            value: String::new(),
            fields: BTreeMap::new(),
            is_subaccount: true,
            parent: Some(parent_name),
            subaccounts: BTreeMap::new(),
        });
        tables.get_mut(parent_id)?.subaccounts.insert(label, id);
        info!(name = %full_name, account = %id.short(), "subaccount created");
        Ok(id)
    }

    /// Record an existing child account in the parent's sub-account registry.
    pub fn register_subaccount(
        &self,
        child: &NameRegistration,
        parent_id: ObjectId,
        child_account_id: ObjectId,
    ) -> Result<()> {
        let mut tables = self.tables.write();
        let child_account = tables.get(child_account_id)?;
        if child_account.reg_id != child.id() {
            return Err(RegistryError::Mismatch {
                expected: child_account.reg_id,
                found: child.id(),
            });
        }
        let label = child.leaf_label().to_string();
        let parent = tables.get_mut(parent_id)?;
        if child.name() != format!("{label}{SEPARATOR}{}", parent.name) {
            return Err(RegistryError::InvalidDomain {
                name: child.name().to_string(),
                reason: format!("not a direct subdomain of {}", parent.name),
            });
        }
        if parent.subaccounts.contains_key(&label) {
            return Err(RegistryError::AlreadyExists {
                what: format!("subaccount {label} of {}", parent.name),
            });
        }
        info!(parent = %parent.name, label = %label, "subaccount registered");
        parent.subaccounts.insert(label, child_account_id);
        Ok(())
    }

    pub fn update_value(
        &self,
        registration: &NameRegistration,
        account_id: ObjectId,
        value: impl Into<String>,
    ) -> Result<()> {
        let mut tables = self.tables.write();
        let account = tables.get_mut(account_id)?;
        ensure_owner(registration, account)?;
        account.value = value.into();
        Ok(())
    }

    pub fn add_field(
        &self,
        registration: &NameRegistration,
        account_id: ObjectId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let key = key.into();
        let mut tables = self.tables.write();
        let account = tables.get_mut(account_id)?;
        ensure_owner(registration, account)?;
        if account.fields.contains_key(&key) {
            return Err(RegistryError::AlreadyExists {
                what: format!("field {key}"),
            });
        }
        if account.fields.len() >= self.config.max_fields_per_account {
            return Err(RegistryError::LimitExceeded {
                what: format!("fields on {}", account.name),
                limit: self.config.max_fields_per_account,
            });
        }
        account.fields.insert(key, value.into());
        Ok(())
    }

    /// Remove a field and return its value.
    pub fn delete_field(
        &self,
        registration: &NameRegistration,
        account_id: ObjectId,
        key: &str,
    ) -> Result<String> {
        let mut tables = self.tables.write();
        let account = tables.get_mut(account_id)?;
        ensure_owner(registration, account)?;
        account
            .fields
            .remove(key)
            .ok_or_else(|| RegistryError::FieldNotFound {
                key: key.to_string(),
            })
    }

    pub fn account(&self, id: ObjectId) -> Result<Account> {
        self.tables.read().get(id).cloned()
    }

    pub fn field(&self, id: ObjectId, key: &str) -> Result<Option<String>> {
        let tables = self.tables.read();
        Ok(tables.get(id)?.fields.get(key).cloned())
    }

    pub fn subaccount(&self, parent_id: ObjectId, label: &str) -> Result<Option<ObjectId>> {
        let tables = self.tables.read();
        Ok(tables.get(parent_id)?.subaccounts.get(label).copied())
    }

    /// Every account linked to a registration. More than one means two
    /// capabilities were spent on the same registration.
    pub fn accounts_for_registration(&self, reg_id: ObjectId) -> Vec<ObjectId> {
        self.tables
            .read()
            .by_registration
            .get(&reg_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn account_count(&self) -> usize {
        self.tables.read().by_id.len()
    }
}
