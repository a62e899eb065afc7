//! Configuration types for call submission.

use std::time::Duration;

/// Complete submission configuration: signer program + retry settings.
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct SubmitConfig {
    /// External signer settings.
    pub signer: SignerConfig,
    /// Retry settings for transient failures.
    pub retry: RetryConfig,
}

/// How to invoke the external signer.
///
/// The program is run as `<program> <args..> send <address> <signature>
/// <call args..> --account <signer> [options]`, so `args` can hold a
/// subcommand prefix or wrapper flags.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct SignerConfig {
    /// Program to execute (looked up on `PATH`).
    pub program: String,
    /// Extra arguments placed before the generated ones.
    pub args: Vec<String>,
    /// Maximum time the signer may run before it is killed.
    pub timeout: Duration,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            program: "cast".to_string(),
            args: Vec::new(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Retry settings for transient failures.
///
/// Uses exponential backoff with optional jitter. Only errors where
/// `SubmitError::is_retryable()` returns `true` are retried, and a failure
/// after which the call may already have been sent (a timeout) is retried
/// only when `resubmit_after_timeout` is set. The default is a single
/// attempt.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial attempt).
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Whether to add random jitter to retry delays.
    pub jitter: bool,
    /// Resubmit after a signer timed out. The killed signer may already have
    /// broadcast, so this risks sending the call twice.
    pub resubmit_after_timeout: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            jitter: true,
            resubmit_after_timeout: false,
        }
    }
}
