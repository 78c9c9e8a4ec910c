//! Registry configuration
//!
//! Loaded from a TOML file, then overridden by `NAMEREG_*` environment
//! variables, then validated.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

const ENV_PREFIX: &str = "NAMEREG_";

/// What `add_namespace` does when the namespace already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateNamespacePolicy {
    /// Fail with `AlreadyExists`
    #[default]
    Reject,
    /// Succeed without touching the existing namespace
    Ignore,
}

/// Who may write a subdomain entry through the parent's token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubdomainPolicy {
    /// The current parent token holder may always write; otherwise the
    /// child's resolved target may.
    #[default]
    ParentAuthority,
    /// Once a child name resolves to a target of its own, only that target
    /// may write it, even if the caller holds the parent token.
    RespectChildDelegation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Maximum length of an entry key, account name or namespace name
    pub max_name_len: usize,
    /// Maximum entry payload size in bytes
    pub max_payload_bytes: usize,
    /// Maximum number of extra fields on one account
    pub max_fields_per_account: usize,
    pub duplicate_namespace: DuplicateNamespacePolicy,
    pub subdomain_policy: SubdomainPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_name_len: 253,
            max_payload_bytes: 16 * 1024,
            max_fields_per_account: 64,
            duplicate_namespace: DuplicateNamespacePolicy::Reject,
            subdomain_policy: SubdomainPolicy::ParentAuthority,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl RegistryConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading registry configuration from: {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// File (if any), then environment overrides, then validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(std::env::vars())
    }

    /// Apply `NAMEREG_*` overrides from an arbitrary variable source.
    pub fn apply_overrides<I>(&mut self, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "MAX_NAME_LEN" => self.max_name_len = parse_usize(&key, &value)?,
                "MAX_PAYLOAD_BYTES" => self.max_payload_bytes = parse_usize(&key, &value)?,
                "MAX_FIELDS_PER_ACCOUNT" => {
                    self.max_fields_per_account = parse_usize(&key, &value)?
                }
                "DUPLICATE_NAMESPACE" => {
                    self.duplicate_namespace = match value.to_lowercase().as_str() {
                        "reject" => DuplicateNamespacePolicy::Reject,
                        "ignore" => DuplicateNamespacePolicy::Ignore,
                        other => {
                            return Err(ConfigError::Invalid(format!(
                                "{key}: unknown duplicate namespace policy '{other}'"
                            )))
                        }
                    }
                }
                "SUBDOMAIN_POLICY" => {
                    self.subdomain_policy = match value.to_lowercase().as_str() {
                        "parent_authority" => SubdomainPolicy::ParentAuthority,
                        "respect_child_delegation" => SubdomainPolicy::RespectChildDelegation,
                        other => {
                            return Err(ConfigError::Invalid(format!(
                                "{key}: unknown subdomain policy '{other}'"
                            )))
                        }
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_name_len == 0 {
            return Err(ConfigError::Invalid("max_name_len must be positive".into()));
        }
        if self.max_payload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_payload_bytes must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::Invalid(format!("{key}='{value}': {e}")))
}
