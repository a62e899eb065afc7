//! Document persistence backends.
//!
//! A [`DocumentStore`] moves whole registry documents, as JSON text, to and
//! from storage. It knows nothing about entries; encoding and decoding live
//! in [`crate::registry`].

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// The registry a document belongs to. One document per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentKind {
    /// Command templates (`commands.json`).
    Templates,
    /// Contract aliases (`contracts.json`).
    Aliases,
}

impl DocumentKind {
    /// File name used by [`JsonFileStore`].
    pub fn file_name(self) -> &'static str {
        match self {
            DocumentKind::Templates => "commands.json",
            DocumentKind::Aliases => "contracts.json",
        }
    }

    /// Top-level JSON key holding the entries map.
    pub fn entries_key(self) -> &'static str {
        match self {
            DocumentKind::Templates => "commands",
            DocumentKind::Aliases => "contracts",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentKind::Templates => write!(f, "templates"),
            DocumentKind::Aliases => write!(f, "aliases"),
        }
    }
}

/// Errors raised while loading or saving a document.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The document exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// File that was read.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The document could not be written.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// File (or directory) that was written.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The stored text is not a valid document of this kind.
    #[error("invalid {kind} document: {source}")]
    InvalidDocument {
        /// Which document failed to decode.
        kind: DocumentKind,
        /// The JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Whole-document storage for registries.
pub trait DocumentStore {
    /// Read the raw document text for `kind`, or `None` if it does not exist yet.
    fn read(&self, kind: DocumentKind) -> Result<Option<String>, StoreError>;

    /// Replace the stored document for `kind`, creating storage on first use.
    fn write(&self, kind: DocumentKind, contents: &str) -> Result<(), StoreError>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn read(&self, kind: DocumentKind) -> Result<Option<String>, StoreError> {
        (**self).read(kind)
    }

    fn write(&self, kind: DocumentKind, contents: &str) -> Result<(), StoreError> {
        (**self).write(kind, contents)
    }
}

// ── File store ──────────────────────────────────────────────────────────

/// Stores each document as a JSON file under a root directory.
///
/// The root directory is created on the first write. Writes replace the file
/// wholesale; there is no locking, so two processes writing the same
/// registry race and the last writer wins.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at `root`. Nothing is touched on disk yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of the file holding `kind`.
    pub fn path(&self, kind: DocumentKind) -> PathBuf {
        self.root.join(kind.file_name())
    }
}

impl DocumentStore for JsonFileStore {
    fn read(&self, kind: DocumentKind) -> Result<Option<String>, StoreError> {
        let path = self.path(kind);
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    fn write(&self, kind: DocumentKind, contents: &str) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Write {
            path: self.root.clone(),
            source,
        })?;
        let path = self.path(kind);
        fs::write(&path, contents).map_err(|source| StoreError::Write { path, source })
    }
}

// ── Memory store ────────────────────────────────────────────────────────

/// In-memory store. Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    docs: Rc<RefCell<BTreeMap<DocumentKind, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current raw text for `kind`, if any was written.
    pub fn get(&self, kind: DocumentKind) -> Option<String> {
        self.docs.borrow().get(&kind).cloned()
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, kind: DocumentKind) -> Result<Option<String>, StoreError> {
        Ok(self.get(kind))
    }

    fn write(&self, kind: DocumentKind, contents: &str) -> Result<(), StoreError> {
        self.docs.borrow_mut().insert(kind, contents.to_string());
        Ok(())
    }
}
