//! Registration objects minted by the naming service

use namereg_types::{leaf_label, ObjectId};

/// Ownership token for a registered name.
///
/// Only the current holder of a registration can present it, so the
/// registration object itself is the holder's proof. It is not `Clone`, has
/// no public constructor and does not deserialize: the only way to obtain one
/// is from a naming service in this crate.
#[derive(Debug, PartialEq, Eq)]
pub struct NameRegistration {
    id: ObjectId,
    name: String,
}

impl NameRegistration {
    pub(crate) fn new(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Ledger id of the registration object
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Full name this registration was issued for
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Left-most label of the registered name
    pub fn leaf_label(&self) -> &str {
        leaf_label(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_accessors() {
        let reg = NameRegistration::new(ObjectId::derive(b"reg", 7), "bob.ns.tld");
        assert_eq!(reg.name(), "bob.ns.tld");
        assert_eq!(reg.leaf_label(), "bob");
        assert_eq!(reg.id(), ObjectId::derive(b"reg", 7));
    }
}
