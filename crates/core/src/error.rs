//! Typed errors for the registries and the replay pipeline.

use std::fmt;

use crate::grammar::lexer::Span;
use crate::store::StoreError;

/// Which registry an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A command template.
    Template,
    /// A contract alias.
    Alias,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Template => write!(f, "template"),
            EntityKind::Alias => write!(f, "alias"),
        }
    }
}

/// Errors raised by the core.
///
/// Every error is local and synchronous; nothing here is retried. Use
/// [`CoreError::kind()`] for a stable, machine-readable classification.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// An entry with this key already exists.
    #[error("{kind} '{key}' already exists")]
    Duplicate {
        /// Registry the key belongs to.
        kind: EntityKind,
        /// The conflicting key.
        key: String,
    },

    /// No entry with this key exists.
    #[error("{kind} '{key}' not found")]
    NotFound {
        /// Registry that was searched.
        kind: EntityKind,
        /// The missing key.
        key: String,
    },

    /// A value failed validation (address literal, parameter list, key).
    #[error("invalid {field} '{value}': {reason}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// The argument count does not match the template's parameter list.
    #[error("template '{template}' expects {expected} argument(s), got {actual}")]
    Arity {
        /// Template being expanded.
        template: String,
        /// Declared parameter names, in binding order.
        parameters: Vec<String>,
        /// Number of declared parameters.
        expected: usize,
        /// Number of arguments supplied.
        actual: usize,
    },

    /// The expanded text does not form a valid invocation.
    #[error("malformed invocation: {reason}")]
    MalformedInvocation {
        /// What is structurally wrong.
        reason: MalformedReason,
        /// Span of the expanded text the problem refers to.
        span: Span,
    },

    /// Reading or writing a registry document failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CoreError {
    /// Stable snake_case identifier for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Duplicate { .. } => "duplicate",
            CoreError::NotFound { .. } => "not_found",
            CoreError::Validation { .. } => "validation",
            CoreError::Arity { .. } => "arity",
            CoreError::MalformedInvocation { .. } => "malformed_invocation",
            CoreError::Store(_) => "store",
        }
    }
}

/// Structural problems found while reconstructing an invocation.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReason {
    /// Fewer than the three fixed leading tokens were present.
    TooFewTokens {
        /// Tokens left after dropping the leading verb.
        found: usize,
    },
    /// A recognized option flag was the last token.
    MissingFlagValue {
        /// The flag as written.
        flag: String,
    },
}

impl MalformedReason {
    /// What the reconstructor expected at the failure point.
    pub fn expected(&self) -> String {
        match self {
            MalformedReason::TooFewTokens { .. } => {
                "<signer> <contract> <method-signature> [args..] [options..]".into()
            }
            MalformedReason::MissingFlagValue { flag } => format!("{flag} <value>"),
        }
    }

    /// What was found instead.
    pub fn actual(&self) -> String {
        match self {
            MalformedReason::TooFewTokens { found } => format!("{found} token(s)"),
            MalformedReason::MissingFlagValue { flag } => format!("{flag} at end of input"),
        }
    }
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MalformedReason::TooFewTokens { found } => write!(
                f,
                "expected signer, contract, and method signature, found {found} token(s)"
            ),
            MalformedReason::MissingFlagValue { flag } => {
                write!(f, "option '{flag}' requires a value")
            }
        }
    }
}
