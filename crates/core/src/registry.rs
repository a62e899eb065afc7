//! Versioned registry documents and the in-memory registry both registries
//! are built on.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::store::{DocumentKind, DocumentStore, StoreError};

/// Schema version written into new documents.
pub const SCHEMA_VERSION: &str = "1.0";

/// A registry's whole persisted state.
///
/// On disk the entries map lives under a kind-specific key (`commands` or
/// `contracts`, see [`DocumentKind::entries_key`]) next to `version`,
/// `createdAt`, and `updatedAt`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryDocument<E> {
    /// Entries keyed by name.
    pub entries: BTreeMap<String, E>,
    /// Schema version of the document.
    pub version: String,
    /// When the document was created (or last reset).
    pub created_at: DateTime<Utc>,
    /// When the document was last mutated.
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentHeader {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl<E> Default for RegistryDocument<E> {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            entries: BTreeMap::new(),
            version: SCHEMA_VERSION.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl<E: Serialize + DeserializeOwned> RegistryDocument<E> {
    /// Decode a document of `kind` from JSON text.
    ///
    /// Missing header fields fall back to defaults; a missing entries key is
    /// an empty registry.
    pub fn from_json(kind: DocumentKind, text: &str) -> Result<Self, StoreError> {
        let invalid = |source| StoreError::InvalidDocument { kind, source };

        let mut value: serde_json::Value = serde_json::from_str(text).map_err(invalid)?;
        let entries = match value
            .as_object_mut()
            .and_then(|obj| obj.remove(kind.entries_key()))
        {
            Some(raw) => serde_json::from_value(raw).map_err(invalid)?,
            None => BTreeMap::new(),
        };
        let header: DocumentHeader = serde_json::from_value(value).map_err(invalid)?;

        let now = Utc::now();
        let created_at = header.created_at.unwrap_or(now);
        Ok(Self {
            entries,
            version: header
                .version
                .unwrap_or_else(|| SCHEMA_VERSION.to_string()),
            created_at,
            updated_at: header.updated_at.unwrap_or(created_at),
        })
    }

    /// Encode the document of `kind` as pretty-printed JSON.
    pub fn to_json(&self, kind: DocumentKind) -> Result<String, StoreError> {
        let invalid = |source| StoreError::InvalidDocument { kind, source };

        let header = DocumentHeader {
            version: Some(self.version.clone()),
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        };
        let mut value = serde_json::to_value(&header).map_err(invalid)?;
        let entries = serde_json::to_value(&self.entries).map_err(invalid)?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert(kind.entries_key().to_string(), entries);
        }
        serde_json::to_string_pretty(&value).map_err(invalid)
    }
}

// ── Registry core ───────────────────────────────────────────────────────

/// An in-memory document bound to its store.
///
/// Mutations only touch memory and mark the registry dirty; nothing reaches
/// the store until [`Registry::flush`].
#[derive(Debug)]
pub(crate) struct Registry<E, S> {
    store: S,
    kind: DocumentKind,
    doc: RegistryDocument<E>,
    dirty: bool,
    persisted: bool,
}

impl<E, S> Registry<E, S>
where
    E: Serialize + DeserializeOwned,
    S: DocumentStore,
{
    pub(crate) fn open(store: S, kind: DocumentKind) -> Result<Self, StoreError> {
        let (doc, persisted) = load(&store, kind)?;
        tracing::debug!(%kind, entries = doc.entries.len(), persisted, "opened registry");
        Ok(Self {
            store,
            kind,
            doc,
            dirty: false,
            persisted,
        })
    }

    /// Discard in-memory changes and re-read the stored document.
    pub(crate) fn reload(&mut self) -> Result<(), StoreError> {
        let (doc, persisted) = load(&self.store, self.kind)?;
        if self.dirty {
            tracing::warn!(kind = %self.kind, "reload discarded unsaved changes");
        }
        self.doc = doc;
        self.persisted = persisted;
        self.dirty = false;
        Ok(())
    }

    /// Write the document if it changed or was never stored.
    pub(crate) fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty && self.persisted {
            return Ok(());
        }
        let text = self.doc.to_json(self.kind)?;
        self.store.write(self.kind, &text)?;
        tracing::debug!(kind = %self.kind, entries = self.doc.entries.len(), "flushed registry");
        self.dirty = false;
        self.persisted = true;
        Ok(())
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn document(&self) -> &RegistryDocument<E> {
        &self.doc
    }

    pub(crate) fn get(&self, key: &str) -> Option<&E> {
        self.doc.entries.get(key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut E> {
        self.doc.entries.get_mut(key)
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.doc.entries.contains_key(key)
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &E> {
        self.doc.entries.values()
    }

    pub(crate) fn insert(&mut self, key: String, entry: E) -> &E {
        self.touch();
        match self.doc.entries.entry(key) {
            Entry::Occupied(mut slot) => {
                slot.insert(entry);
                slot.into_mut()
            }
            Entry::Vacant(slot) => slot.insert(entry),
        }
    }

    pub(crate) fn remove(&mut self, key: &str) -> bool {
        let removed = self.doc.entries.remove(key).is_some();
        if removed {
            self.touch();
        }
        removed
    }

    /// Clear all entries; the document's `createdAt` becomes the reset time.
    pub(crate) fn reset(&mut self) {
        self.doc = RegistryDocument::default();
        self.dirty = true;
    }

    /// Stamp `updatedAt` and mark the document dirty.
    pub(crate) fn touch(&mut self) {
        self.doc.updated_at = Utc::now();
        self.dirty = true;
    }
}

fn load<E, S>(store: &S, kind: DocumentKind) -> Result<(RegistryDocument<E>, bool), StoreError>
where
    E: Serialize + DeserializeOwned,
    S: DocumentStore,
{
    match store.read(kind)? {
        Some(text) => Ok((RegistryDocument::from_json(kind, &text)?, true)),
        None => Ok((RegistryDocument::default(), false)),
    }
}
