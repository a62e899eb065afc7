//! callbook core library.
//!
//! Stores parameterized call templates and contract aliases, and turns a
//! template plus concrete arguments into a structured [`CallDescriptor`].
//! The main entry points are [`TemplateRegistry`] and [`AliasRegistry`] for
//! persistence, [`expand`] and [`reconstruct`] for the replay pipeline, and
//! [`prepare_call`] which runs the whole pipeline in one step.

/// Address literal checks and the resolver seam.
pub mod address;
/// Contract alias registry.
pub mod alias;
/// Error types shared by the registries and the replay pipeline.
pub mod error;
/// Text processing: tokenizer, placeholder scanner, expander, reconstructor.
pub mod grammar;
/// Template lookup → expansion → reconstruction in one call.
pub mod pipeline;
/// Versioned registry documents and the generic in-memory registry.
pub mod registry;
/// Document persistence backends.
pub mod store;
/// Command template registry.
pub mod template;

// ── Convenience re-exports ──────────────────────────────────────────────────

// Registries
pub use alias::{AliasEntry, AliasMetadata, AliasPatch, AliasRegistry};
pub use template::{Template, TemplateRegistry};

// Persistence
pub use registry::{RegistryDocument, SCHEMA_VERSION};
pub use store::{DocumentKind, DocumentStore, JsonFileStore, MemoryStore, StoreError};

// Errors
pub use error::{CoreError, EntityKind, MalformedReason};

// Address handling
pub use address::{AddressResolver, is_address_literal};

// Grammar
pub use grammar::expand::{expand, substitute};
pub use grammar::invocation::{
    CallDescriptor, CallOption, ParsedInvocation, parse_invocation, reconstruct,
};
pub use grammar::lexer::{Span, Token, detokenize, tokenize, tokenize_spanned};
pub use grammar::placeholder::{detect_parameters, is_identifier};

// Pipeline
pub use pipeline::{PreparedCall, prepare_call};
