//! Typed error types for call submission.

use std::io;
use std::time::Duration;

/// Submission failures, categorized by type.
///
/// Use [`SubmitError::is_retryable()`] to classify transient vs permanent failures.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    // -- Call --
    /// The contract reference did not resolve to an address.
    #[error("contract reference `{reference}` did not resolve to an address")]
    Unresolved {
        /// The reference as written in the template.
        reference: String,
    },

    // -- Process --
    /// The signer program could not be started.
    #[error("failed to start signer `{program}`: {source}")]
    Spawn {
        /// Program that was launched.
        program: String,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Waiting on the signer process failed.
    #[error("failed to wait for signer: {0}")]
    WaitFailed(#[source] io::Error),

    /// The signer did not finish within the configured timeout.
    #[error("signer `{program}` timed out after {timeout:?}")]
    Timeout {
        /// Program that was launched.
        program: String,
        /// The configured timeout that elapsed.
        timeout: Duration,
    },

    /// The signer exited unsuccessfully.
    #[error("signer rejected the call ({}): {stderr}", exit_label(*status))]
    Rejected {
        /// Exit code, or `None` if the process was killed by a signal.
        status: Option<i32>,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The signer succeeded but printed no pending-action handle.
    #[error("signer returned an empty response")]
    EmptyResponse,

    // -- Retry --
    /// All retry attempts have been exhausted.
    #[error("retries exhausted after {attempts} attempts ({unconfirmed} may have been sent)")]
    RetriesExhausted {
        /// Total number of attempts made.
        attempts: u32,
        /// Attempts that ran the signer and may have broadcast the call.
        unconfirmed: u32,
        /// The error from the final attempt.
        #[source]
        last_error: Box<SubmitError>,
    },

    // -- Configuration --
    /// An invalid configuration was provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SubmitError {
    /// Returns `true` if this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            SubmitError::Timeout { .. } => true,
            SubmitError::Spawn { source, .. } => matches!(
                source.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
            ),
            _ => false,
        }
    }

    /// Returns `true` if the signer ran far enough that the call may already
    /// be on the network.
    ///
    /// Resubmitting after such a failure can send the transaction twice.
    pub fn may_have_sent(&self) -> bool {
        match self {
            SubmitError::Timeout { .. }
            | SubmitError::Rejected { .. }
            | SubmitError::EmptyResponse
            | SubmitError::WaitFailed(_) => true,
            SubmitError::RetriesExhausted { unconfirmed, .. } => *unconfirmed > 0,
            SubmitError::Unresolved { .. }
            | SubmitError::Spawn { .. }
            | SubmitError::InvalidConfig(_) => false,
        }
    }
}

fn exit_label(status: Option<i32>) -> String {
    match status {
        Some(code) => format!("exit {code}"),
        None => "killed by signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_errors() {
        assert!(
            SubmitError::Timeout {
                program: "cast".into(),
                timeout: Duration::from_secs(1),
            }
            .is_retryable()
        );
        assert!(
            SubmitError::Spawn {
                program: "cast".into(),
                source: io::Error::new(io::ErrorKind::Interrupted, "test"),
            }
            .is_retryable()
        );
    }

    #[test]
    fn non_retryable_errors() {
        assert!(
            !SubmitError::Spawn {
                program: "cast".into(),
                source: io::Error::new(io::ErrorKind::NotFound, "test"),
            }
            .is_retryable()
        );
        assert!(
            !SubmitError::Unresolved {
                reference: "x".into()
            }
            .is_retryable()
        );
        assert!(
            !SubmitError::Rejected {
                status: Some(1),
                stderr: "nonce too low".into()
            }
            .is_retryable()
        );
        assert!(!SubmitError::EmptyResponse.is_retryable());
        assert!(!SubmitError::WaitFailed(io::Error::other("test")).is_retryable());
        assert!(!SubmitError::InvalidConfig("test".into()).is_retryable());
        assert!(
            !SubmitError::RetriesExhausted {
                attempts: 3,
                unconfirmed: 1,
                last_error: Box::new(SubmitError::EmptyResponse),
            }
            .is_retryable()
        );
    }

    #[test]
    fn only_failures_after_the_signer_ran_may_have_sent() {
        let timeout = SubmitError::Timeout {
            program: "cast".into(),
            timeout: Duration::from_secs(1),
        };
        assert!(timeout.may_have_sent());
        assert!(SubmitError::EmptyResponse.may_have_sent());
        assert!(
            !SubmitError::Spawn {
                program: "cast".into(),
                source: io::Error::new(io::ErrorKind::Interrupted, "test"),
            }
            .may_have_sent()
        );
        assert!(!SubmitError::Unresolved { reference: "x".into() }.may_have_sent());

        let exhausted = |unconfirmed| SubmitError::RetriesExhausted {
            attempts: 2,
            unconfirmed,
            last_error: Box::new(SubmitError::EmptyResponse),
        };
        assert!(exhausted(1).may_have_sent());
        assert!(!exhausted(0).may_have_sent());
        assert_eq!(
            exhausted(1).to_string(),
            "retries exhausted after 2 attempts (1 may have been sent)"
        );
    }

    #[test]
    fn rejected_message_names_exit_code_or_signal() {
        let coded = SubmitError::Rejected {
            status: Some(2),
            stderr: "bad".into(),
        };
        assert_eq!(coded.to_string(), "signer rejected the call (exit 2): bad");
        let killed = SubmitError::Rejected {
            status: None,
            stderr: String::new(),
        };
        assert!(killed.to_string().contains("killed by signal"));
    }
}
