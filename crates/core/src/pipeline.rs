use serde::Serialize;

use crate::address::AddressResolver;
use crate::error::{CoreError, EntityKind};
use crate::grammar::expand::expand;
use crate::grammar::invocation::{CallDescriptor, reconstruct};
use crate::store::DocumentStore;
use crate::template::TemplateRegistry;

/// Result of running a template through the replay pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparedCall {
    /// Name of the template that was replayed.
    pub template: String,
    /// Template body after substitution.
    pub expanded: String,
    /// The reconstructed, resolved call.
    pub descriptor: CallDescriptor,
}

/// Look up `name`, expand it with `args`, and reconstruct the call.
///
/// Performs no I/O beyond what the registries already hold in memory. The
/// returned descriptor may still carry an unresolved contract reference; see
/// [`CallDescriptor::ensure_resolved`].
pub fn prepare_call<S, R, A>(
    templates: &TemplateRegistry<S>,
    resolver: &R,
    name: &str,
    args: &[A],
) -> Result<PreparedCall, CoreError>
where
    S: DocumentStore,
    R: AddressResolver + ?Sized,
    A: AsRef<str>,
{
    let template = templates.get(name).ok_or_else(|| CoreError::NotFound {
        kind: EntityKind::Template,
        key: name.to_string(),
    })?;
    let expanded = expand(template, args)?;
    tracing::debug!(template = name, %expanded, "expanded template");
    let descriptor = reconstruct(&expanded, resolver)?;
    Ok(PreparedCall {
        template: name.to_string(),
        expanded,
        descriptor,
    })
}
