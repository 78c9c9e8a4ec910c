//! Naming-service records and hierarchy helpers

use crate::ids::{Address, ObjectId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Label separator inside a full name (`alice.tld`).
pub const SEPARATOR: char = '.';

/// What the naming service currently knows about a name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Address>,
    /// Id of the registration object currently backing the name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<ObjectId>,
}

/// Structural problems with a name string.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NameError {
    #[error("name is empty")]
    Empty,
    #[error("name is {len} bytes, limit is {max}")]
    TooLong { len: usize, max: usize },
    #[error("name contains an empty label")]
    EmptyLabel,
    #[error("label '{label}' contains characters outside [a-z0-9-] or starts/ends with '-'")]
    InvalidLabel { label: String },
}

/// Ordered path components of a name, leaf first (`a.b.tld` -> `[a, b, tld]`).
pub fn labels_of(name: &str) -> Vec<&str> {
    name.split(SEPARATOR).collect()
}

/// Characters before the first separator.
pub fn leaf_label(name: &str) -> &str {
    name.split(SEPARATOR).next().unwrap_or_default()
}

/// The suffix every direct or indirect child of `parent` ends with.
pub fn child_suffix(parent: &str) -> String {
    format!("{SEPARATOR}{parent}")
}

/// Byte-wise hierarchy check.
///
/// `parent_suffix` is expected to carry its leading separator
/// (see [`child_suffix`]); the candidate must end with it and be strictly
/// longer, so a name is never its own child.
pub fn is_suffix_of(candidate: &str, parent_suffix: &str) -> bool {
    let (c, s) = (candidate.as_bytes(), parent_suffix.as_bytes());
    c.len() > s.len() && c[c.len() - s.len()..] == *s
}

/// Check a full name: non-empty, within `max_len`, lowercase DNS-style labels.
pub fn validate_name(name: &str, max_len: usize) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.len() > max_len {
        return Err(NameError::TooLong {
            len: name.len(),
            max: max_len,
        });
    }
    for label in labels_of(name) {
        if label.is_empty() {
            return Err(NameError::EmptyLabel);
        }
        let valid_chars = label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-');
        if !valid_chars || label.starts_with('-') || label.ends_with('-') {
            return Err(NameError::InvalidLabel {
                label: label.to_string(),
            });
        }
    }
    Ok(())
}
