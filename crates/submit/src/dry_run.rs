//! Submitter that renders the signer command without running it.

use callbook_core::CallDescriptor;

use crate::config::SignerConfig;
use crate::{PendingAction, SubmitError, Submitter, signer_args};

/// Handle reported for calls that were never sent.
pub const DRY_RUN_HANDLE: &str = "dry-run";

/// Builds exactly what [`ExternalSigner`](crate::ExternalSigner) would run,
/// and returns it without spawning anything.
#[derive(Debug, Clone, Default)]
pub struct DryRunSubmitter {
    config: SignerConfig,
    submitted: Vec<PendingAction>,
}

impl DryRunSubmitter {
    /// Create a dry-run submitter mirroring `config`.
    pub fn new(config: SignerConfig) -> Self {
        Self {
            config,
            submitted: Vec::new(),
        }
    }

    /// Every action rendered so far, oldest first.
    pub fn submitted(&self) -> &[PendingAction] {
        &self.submitted
    }
}

impl Submitter for DryRunSubmitter {
    fn submit(
        &mut self,
        call: &CallDescriptor,
        rpc_override: Option<&str>,
    ) -> Result<PendingAction, SubmitError> {
        let mut args = self.config.args.clone();
        args.extend(signer_args(call, rpc_override)?);
        let action = PendingAction {
            handle: DRY_RUN_HANDLE.to_string(),
            program: self.config.program.clone(),
            args,
            dry_run: true,
        };
        tracing::info!(command = %action.command_line(), "dry run");
        self.submitted.push(action.clone());
        Ok(action)
    }
}
