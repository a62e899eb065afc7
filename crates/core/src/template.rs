use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, EntityKind};
use crate::grammar::placeholder::is_identifier;
use crate::registry::{Registry, RegistryDocument};
use crate::store::{DocumentKind, DocumentStore, StoreError};

/// A named, reusable command string with `$name` placeholders.
///
/// `parameters` fixes the positional binding order: argument *i* binds to
/// `parameters[i]`. Substitution itself is by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Template name (registry key).
    pub name: String,
    /// Distinct parameter names, in binding order.
    pub parameters: Vec<String>,
    /// Template text containing `$name` placeholders.
    #[serde(rename = "template")]
    pub body: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// When the template was added.
    pub created_at: DateTime<Utc>,
    /// When the template was last changed.
    pub updated_at: DateTime<Utc>,
}

/// Persisted name → template mapping.
///
/// Changes are held in memory until [`TemplateRegistry::flush`].
#[derive(Debug)]
pub struct TemplateRegistry<S> {
    inner: Registry<Template, S>,
}

impl<S: DocumentStore> TemplateRegistry<S> {
    /// Load the template document from `store`, or start empty if there is none.
    pub fn open(store: S) -> Result<Self, StoreError> {
        Ok(Self {
            inner: Registry::open(store, DocumentKind::Templates)?,
        })
    }

    /// Register a new template.
    ///
    /// An empty `parameters` list is accepted here; whether a template
    /// without parameters makes sense is the caller's decision. Use
    /// [`detect_parameters`](crate::detect_parameters) to derive the list
    /// from `body`.
    pub fn add(
        &mut self,
        name: &str,
        parameters: Vec<String>,
        body: &str,
        description: Option<String>,
    ) -> Result<&Template, CoreError> {
        validate_name(name)?;
        validate_parameters(&parameters)?;
        if self.inner.contains(name) {
            return Err(CoreError::Duplicate {
                kind: EntityKind::Template,
                key: name.to_string(),
            });
        }

        let now = Utc::now();
        let template = Template {
            name: name.to_string(),
            parameters,
            body: body.to_string(),
            description,
            created_at: now,
            updated_at: now,
        };
        tracing::debug!(name, parameters = ?template.parameters, "added template");
        Ok(self.inner.insert(name.to_string(), template))
    }

    /// Look up a template.
    pub fn get(&self, name: &str) -> Option<&Template> {
        self.inner.get(name)
    }

    /// Remove a template. Returns whether it existed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.inner.remove(name)
    }

    /// All templates, ordered by name.
    pub fn list(&self) -> impl Iterator<Item = &Template> {
        self.inner.values()
    }

    /// Drop every template.
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
    pub fn document(&self) -> &RegistryDocument<Template> {
        self.inner.document()
    }
}

fn validate_name(name: &str) -> Result<(), CoreError> {
    if !name.is_empty() && !name.chars().any(char::is_whitespace) {
        return Ok(());
    }
    Err(CoreError::Validation {
        field: "template name",
        value: name.to_string(),
        reason: "must be non-empty and contain no whitespace".into(),
    })
}

fn validate_parameters(parameters: &[String]) -> Result<(), CoreError> {
    for (i, p) in parameters.iter().enumerate() {
        if !is_identifier(p) {
            return Err(CoreError::Validation {
                field: "parameter",
                value: p.clone(),
                reason: "must be letters, digits, or underscores, not starting with a digit"
                    .into(),
            });
        }
        if parameters[..i].contains(p) {
            return Err(CoreError::Validation {
                field: "parameter",
                value: p.clone(),
                reason: "declared more than once".into(),
            });
        }
    }
    Ok(())
}
