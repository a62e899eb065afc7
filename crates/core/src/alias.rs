use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::{ADDRESS_HEX_LEN, ADDRESS_PREFIX, AddressResolver, is_address_literal};
use crate::error::{CoreError, EntityKind};
use crate::registry::{Registry, RegistryDocument};
use crate::store::{DocumentKind, DocumentStore, StoreError};

/// A symbolic name for a contract address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasEntry {
    /// The alias itself (registry key).
    pub alias: String,
    /// Literal address the alias stands for.
    pub address: String,
    /// Human-readable contract name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Network the address lives on (e.g. `"mainnet"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Contract ABI, stored opaquely and never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<serde_json::Value>,
    /// When the entry was added.
    pub created_at: DateTime<Utc>,
    /// When the entry was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Optional metadata supplied when adding an alias.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasMetadata {
    /// Human-readable contract name.
    pub name: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// Network the address lives on.
    pub network: Option<String>,
    /// Contract ABI.
    pub abi: Option<serde_json::Value>,
}

/// Partial update for an existing alias. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasPatch {
    /// New address; re-validated before it is applied.
    pub address: Option<String>,
    /// New contract name.
    pub name: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New network.
    pub network: Option<String>,
    /// New ABI.
    pub abi: Option<serde_json::Value>,
}

impl AliasPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.network.is_none()
            && self.abi.is_none()
    }
}

/// Persisted alias → address mapping.
///
/// Changes are held in memory until [`AliasRegistry::flush`].
#[derive(Debug)]
pub struct AliasRegistry<S> {
    inner: Registry<AliasEntry, S>,
}

impl<S: DocumentStore> AliasRegistry<S> {
    /// Load the alias document from `store`, or start empty if there is none.
    pub fn open(store: S) -> Result<Self, StoreError> {
        Ok(Self {
            inner: Registry::open(store, DocumentKind::Aliases)?,
        })
    }

    /// Resolve a contract reference.
    ///
    /// Literal addresses come back unchanged, known aliases map to their
    /// address, and anything else is returned as given.
    pub fn resolve(&self, token: &str) -> String {
        if is_address_literal(token) {
            return token.to_string();
        }
        match self.inner.get(token) {
            Some(entry) => entry.address.clone(),
            None => token.to_string(),
        }
    }

    /// Register a new alias.
    pub fn add(
        &mut self,
        alias: &str,
        address: &str,
        metadata: AliasMetadata,
    ) -> Result<&AliasEntry, CoreError> {
        validate_alias(alias)?;
        validate_address(address)?;
        if self.inner.contains(alias) {
            return Err(CoreError::Duplicate {
                kind: EntityKind::Alias,
                key: alias.to_string(),
            });
        }

        let now = Utc::now();
        let entry = AliasEntry {
            alias: alias.to_string(),
            address: address.to_string(),
            name: metadata.name,
            description: metadata.description,
            network: metadata.network,
            abi: metadata.abi,
            created_at: now,
            updated_at: now,
        };
        tracing::debug!(alias, address, "added alias");
        Ok(self.inner.insert(alias.to_string(), entry))
    }

    /// Apply `patch` to an existing alias.
    pub fn update(&mut self, alias: &str, patch: AliasPatch) -> Result<&AliasEntry, CoreError> {
        if !self.inner.contains(alias) {
            return Err(CoreError::NotFound {
                kind: EntityKind::Alias,
                key: alias.to_string(),
            });
        }
        if let Some(address) = &patch.address {
            validate_address(address)?;
        }

        self.inner.touch();
        let entry = self
            .inner
            .get_mut(alias)
            .ok_or_else(|| CoreError::NotFound {
                kind: EntityKind::Alias,
                key: alias.to_string(),
            })?;
        if let Some(address) = patch.address {
            entry.address = address;
        }
        if let Some(name) = patch.name {
            entry.name = Some(name);
        }
        if let Some(description) = patch.description {
            entry.description = Some(description);
        }
        if let Some(network) = patch.network {
            entry.network = Some(network);
        }
        if let Some(abi) = patch.abi {
            entry.abi = Some(abi);
        }
        entry.updated_at = Utc::now();
        Ok(&*entry)
    }

    /// Remove an alias. Returns whether it existed.
    pub fn remove(&mut self, alias: &str) -> bool {
        self.inner.remove(alias)
    }

    /// Look up an alias.
    pub fn get(&self, alias: &str) -> Option<&AliasEntry> {
        self.inner.get(alias)
    }

    /// All aliases, ordered by alias.
    pub fn list(&self) -> impl Iterator<Item = &AliasEntry> {
        self.inner.values()
    }

    /// Drop every alias.
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Persist pending changes.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        self.inner.flush()
    }

    /// Discard pending changes and re-read the stored document.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        self.inner.reload()
    }

    /// Whether there are changes not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.inner.is_dirty()
    }

    /// The in-memory document.
    pub fn document(&self) -> &RegistryDocument<AliasEntry> {
        self.inner.document()
    }
}

impl<S: DocumentStore> AddressResolver for AliasRegistry<S> {
    fn resolve(&self, token: &str) -> String {
        AliasRegistry::resolve(self, token)
    }
}

fn validate_address(address: &str) -> Result<(), CoreError> {
    if is_address_literal(address) {
        return Ok(());
    }
    Err(CoreError::Validation {
        field: "address",
        value: address.to_string(),
        reason: format!("expected {ADDRESS_PREFIX} followed by {ADDRESS_HEX_LEN} hex digits"),
    })
}

fn validate_alias(alias: &str) -> Result<(), CoreError> {
    let reason = if alias.is_empty() {
        "must not be empty"
    } else if alias.chars().any(char::is_whitespace) {
        "must not contain whitespace"
    } else if is_address_literal(alias) {
        "must not itself be an address"
    } else {
        return Ok(());
    };
    Err(CoreError::Validation {
        field: "alias",
        value: alias.to_string(),
        reason: reason.into(),
    })
}
