//! Submitter that runs an external signer program.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use callbook_core::CallDescriptor;

use crate::config::SignerConfig;
use crate::{PendingAction, SubmitError, Submitter, signer_args};

/// How often a running signer is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Runs a foundry-`cast`-compatible program for every submission.
///
/// The trimmed standard output of a successful run is the pending-action
/// handle. A non-zero exit becomes [`SubmitError::Rejected`] carrying the
/// program's standard error. The process is killed once
/// [`SignerConfig::timeout`] elapses. The same deadline bounds reading its
/// output, so a signer that exits but leaves a background process holding
/// the pipes open still times out.
#[derive(Debug, Clone)]
pub struct ExternalSigner {
    config: SignerConfig,
}

impl ExternalSigner {
    /// Create a signer from `config`.
    pub fn new(config: SignerConfig) -> Result<Self, SubmitError> {
        if config.program.trim().is_empty() {
            return Err(SubmitError::InvalidConfig(
                "signer program must not be empty".into(),
            ));
        }
        if config.timeout.is_zero() {
            return Err(SubmitError::InvalidConfig(
                "signer timeout must be > 0".into(),
            ));
        }
        Ok(Self { config })
    }

    /// The configuration in use.
    pub fn config(&self) -> &SignerConfig {
        &self.config
    }

    fn spawn(&self, args: &[String]) -> Result<Child, SubmitError> {
        Command::new(&self.config.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SubmitError::Spawn {
                program: self.config.program.clone(),
                source,
            })
    }

    fn timed_out(&self) -> SubmitError {
        tracing::warn!(program = %self.config.program, timeout = ?self.config.timeout, "signer timed out");
        SubmitError::Timeout {
            program: self.config.program.clone(),
            timeout: self.config.timeout,
        }
    }
}

impl Submitter for ExternalSigner {
    fn submit(
        &mut self,
        call: &CallDescriptor,
        rpc_override: Option<&str>,
    ) -> Result<PendingAction, SubmitError> {
        let mut args = self.config.args.clone();
        args.extend(signer_args(call, rpc_override)?);
        tracing::info!(
            program = %self.config.program,
            contract = %call.resolved_address,
            method = %call.method_signature,
            "submitting call"
        );

        let mut child = self.spawn(&args)?;
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let now = Instant::now();
        let deadline = now
            .checked_add(self.config.timeout)
            .unwrap_or_else(|| now + Duration::from_secs(86400));
        let status = loop {
            match child.try_wait().map_err(SubmitError::WaitFailed)? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    // Best-effort: the process may exit between the check and the kill.
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(self.timed_out());
                }
                None => thread::sleep(POLL_INTERVAL),
            }
        };

        let (Some(stdout), Some(stderr)) =
            (collect(stdout, deadline), collect(stderr, deadline))
        else {
            return Err(self.timed_out());
        };
        if !status.success() {
            return Err(SubmitError::Rejected {
                status: status.code(),
                stderr: stderr.trim().to_string(),
            });
        }

        let handle = stdout.trim();
        if handle.is_empty() {
            return Err(SubmitError::EmptyResponse);
        }
        tracing::debug!(handle, "signer accepted call");
        Ok(PendingAction {
            handle: handle.to_string(),
            program: self.config.program.clone(),
            args,
            dry_run: false,
        })
    }
}

// ── Pipe draining ──────────────────────────────────────────────────────

/// Read a pipe to the end on a background thread so a chatty child never
/// blocks on a full pipe buffer. The text arrives on the returned channel
/// once every writer has closed the pipe.
fn drain(mut pipe: impl Read + Send + 'static) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Wait for a drained pipe until `deadline`.
///
/// Returns `None` when the deadline passes first. A reader that died
/// without sending counts as empty output.
fn collect(reader: Option<Receiver<String>>, deadline: Instant) -> Option<String> {
    let Some(rx) = reader else {
        return Some(String::new());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}
