//! Address and object identifiers

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Account address of a caller (32 bytes, rendered as `0x`-prefixed hex).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(pub [u8; 32]);

impl Address {
    /// Create from byte array
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get as byte array
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse a hex address, with or without the `0x` prefix.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(raw, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Globally unique identifier of a ledger object.
///
/// Ids are derived by hashing a domain tag together with a nonce that the
/// allocator never reuses, so two objects never share an id even across
/// object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub [u8; 32]);

impl ObjectId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Deterministically derive an id from a domain tag and nonce.
    pub fn derive(domain: &[u8], nonce: u64) -> Self {
        let mut h = Sha256::new();
        h.update(domain);
        h.update(nonce.to_le_bytes());
        Self(h.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Abbreviated form used in log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..6])
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr = Address::new([0xab; 32]);
        let rendered = addr.to_string();
        assert!(rendered.starts_with("0xabab"));
        assert_eq!(Address::from_hex(&rendered).unwrap(), addr);
        assert_eq!(Address::from_hex(&rendered[2..]).unwrap(), addr);
    }

    #[test]
    fn test_address_from_bad_hex() {
        assert!(Address::from_hex("0x1234").is_err());
        assert!(Address::from_hex("zz").is_err());
    }

    #[test]
    fn test_derived_ids_differ_by_nonce_and_domain() {
        let a = ObjectId::derive(b"entry", 1);
        let b = ObjectId::derive(b"entry", 2);
        let c = ObjectId::derive(b"account", 1);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, ObjectId::derive(b"entry", 1));
        assert_eq!(a.short().len(), 12);
    }
}
