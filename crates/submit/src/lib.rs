//! Submission of reconstructed contract calls.
//!
//! A [`Submitter`] takes a [`CallDescriptor`] and hands it to a signing
//! service, returning an opaque pending-action handle. The default service is
//! an external, foundry-`cast`-compatible program ([`ExternalSigner`]).
//! The API is synchronous, with no async runtime required.
mod config;
mod dry_run;
mod error;
mod external;
mod retry;

pub use config::{RetryConfig, SignerConfig, SubmitConfig};
pub use dry_run::{DRY_RUN_HANDLE, DryRunSubmitter};
pub use error::SubmitError;
pub use external::ExternalSigner;
pub use retry::RetrySubmitter;

use callbook_core::{CallDescriptor, CallOption, detokenize};

/// Subcommand the signer program is asked to run.
pub const SEND_SUBCOMMAND: &str = "send";

/// Flag that carries the signer alias.
pub const ACCOUNT_FLAG: &str = "--account";

// ── Traits ──────────────────────────────────────────────────────────────

/// Hand a call to a signing service. All backends implement this.
pub trait Submitter {
    /// Submit `call`, returning the pending-action handle.
    ///
    /// `rpc_override`, when set, replaces the call's own `--rpc-url`.
    fn submit(
        &mut self,
        call: &CallDescriptor,
        rpc_override: Option<&str>,
    ) -> Result<PendingAction, SubmitError>;
}

impl<T: Submitter + ?Sized> Submitter for Box<T> {
    fn submit(
        &mut self,
        call: &CallDescriptor,
        rpc_override: Option<&str>,
    ) -> Result<PendingAction, SubmitError> {
        (**self).submit(call, rpc_override)
    }
}

// ── Pending action ──────────────────────────────────────────────────────

/// Outcome of a submission.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(rename_all = "camelCase")
)]
pub struct PendingAction {
    /// Opaque handle returned by the signer (usually a transaction hash).
    pub handle: String,
    /// Program that was (or would have been) run.
    pub program: String,
    /// Full argument vector passed to `program`.
    pub args: Vec<String>,
    /// Whether the call was only rendered, not submitted.
    pub dry_run: bool,
}

impl PendingAction {
    /// The command as a single shell-style line.
    pub fn command_line(&self) -> String {
        let mut words = Vec::with_capacity(self.args.len() + 1);
        words.push(self.program.as_str());
        words.extend(self.args.iter().map(String::as_str));
        detokenize(&words)
    }
}

// ── Argument building ───────────────────────────────────────────────────

/// Build the signer arguments for `call`.
///
/// Produces `send <address> <signature> <args..> --account <signer>`
/// followed by each set option in [`CallOption`] order. Positional
/// arguments, including forwarded unknown flags, keep their order.
///
/// Fails with [`SubmitError::Unresolved`] if the contract reference never
/// resolved to a literal address.
pub fn signer_args(
    call: &CallDescriptor,
    rpc_override: Option<&str>,
) -> Result<Vec<String>, SubmitError> {
    if !call.is_resolved() {
        return Err(SubmitError::Unresolved {
            reference: call.contract_reference.clone(),
        });
    }

    let mut args = vec![
        SEND_SUBCOMMAND.to_string(),
        call.resolved_address.clone(),
        call.method_signature.clone(),
    ];
    args.extend(call.positional_args.iter().cloned());
    args.push(ACCOUNT_FLAG.to_string());
    args.push(call.signer_alias.clone());

    for option in CallOption::ALL {
        let value = match option {
            CallOption::RpcUrl => rpc_override.or_else(|| call.option(option)),
            _ => call.option(option),
        };
        if let Some(value) = value {
            args.push(option.flag().to_string());
            args.push(value.to_string());
        }
    }
    Ok(args)
}
