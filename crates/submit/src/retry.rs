//! Resubmission with exponential backoff.
//!
//! A signer that was started may already have broadcast the transaction by
//! the time it fails. Failures that happen before the signer runs (a spawn
//! interrupted by the OS) are retried freely. A timeout is resubmitted only
//! when [`RetryConfig::resubmit_after_timeout`] allows it, and every attempt
//! that may have reached the network is counted in
//! [`SubmitError::RetriesExhausted`].

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::thread;
use std::time::Duration;

use callbook_core::CallDescriptor;

use crate::config::RetryConfig;
use crate::{PendingAction, SubmitError, Submitter};

/// Wraps a [`Submitter`] and resubmits on transient failures.
pub struct RetrySubmitter<S> {
    inner: S,
    config: RetryConfig,
}

impl<S> RetrySubmitter<S> {
    /// Wrap `inner`.
    pub fn new(inner: S, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// Unwrap, returning the inner submitter.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// The wrapped submitter.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn should_resubmit(&self, err: &SubmitError) -> bool {
        err.is_retryable() && (!err.may_have_sent() || self.config.resubmit_after_timeout)
    }
}

impl<S: Submitter> Submitter for RetrySubmitter<S> {
    fn submit(
        &mut self,
        call: &CallDescriptor,
        rpc_override: Option<&str>,
    ) -> Result<PendingAction, SubmitError> {
        if self.config.max_attempts == 0 {
            return Err(SubmitError::InvalidConfig(
                "max_attempts must be >= 1".into(),
            ));
        }

        let mut backoff = Backoff::new(&self.config);
        let mut unconfirmed = 0u32;
        let mut attempt = 1u32;
        loop {
            let err = match self.inner.submit(call, rpc_override) {
                Ok(action) => {
                    if attempt > 1 {
                        tracing::info!(attempt, handle = %action.handle, "submitted after retry");
                    }
                    return Ok(action);
                }
                Err(err) => err,
            };

            let sent = err.may_have_sent();
            if sent {
                unconfirmed += 1;
            }
            if !self.should_resubmit(&err) {
                return Err(err);
            }
            if attempt >= self.config.max_attempts {
                return Err(SubmitError::RetriesExhausted {
                    attempts: attempt,
                    unconfirmed,
                    last_error: Box::new(err),
                });
            }

            let delay = backoff.next_delay();
            if sent {
                tracing::warn!(attempt, error = %err, ?delay, "signer may already have sent the call, resubmitting");
            } else {
                tracing::warn!(attempt, error = %err, ?delay, "submission failed before the signer ran, retrying");
            }
            thread::sleep(delay);
            attempt += 1;
        }
    }
}

// ── Backoff ────────────────────────────────────────────────────────────

/// Doubling delays capped at `max_delay`.
///
/// With jitter each delay is drawn from `[d / 2, d)`.
struct Backoff {
    next: Duration,
    max: Duration,
    jitter: Option<RandomState>,
    step: u32,
}

impl Backoff {
    fn new(config: &RetryConfig) -> Self {
        Self {
            next: config.initial_delay,
            max: config.max_delay,
            jitter: config.jitter.then(RandomState::new),
            step: 0,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.next.min(self.max);
        self.next = self.next.saturating_mul(2);
        self.step += 1;
        match &self.jitter {
            Some(state) => spread(delay, state.hash_one(self.step)),
            None => delay,
        }
    }
}

fn spread(delay: Duration, seed: u64) -> Duration {
    let half = delay / 2;
    let span = u64::try_from((delay - half).as_nanos()).unwrap_or(u64::MAX);
    if span == 0 {
        return delay;
    }
    half + Duration::from_nanos(seed % span)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io;

    use super::*;
    use callbook_core::reconstruct;

    /// Plays back canned outcomes, one per submission.
    struct Scripted {
        outcomes: VecDeque<Result<&'static str, SubmitError>>,
        calls: u32,
    }

    impl Scripted {
        fn new(outcomes: Vec<Result<&'static str, SubmitError>>) -> Self {
            Self {
                outcomes: outcomes.into(),
                calls: 0,
            }
        }
    }

    impl Submitter for Scripted {
        fn submit(
            &mut self,
            _call: &CallDescriptor,
            _rpc_override: Option<&str>,
        ) -> Result<PendingAction, SubmitError> {
            self.calls += 1;
            let handle = self
                .outcomes
                .pop_front()
                .expect("more submissions than scripted outcomes")?;
            Ok(PendingAction {
                handle: handle.into(),
                program: "scripted".into(),
                args: Vec::new(),
                dry_run: false,
            })
        }
    }

    fn call() -> CallDescriptor {
        reconstruct(r#"send me c "f()""#, &|t: &str| t.to_string()).unwrap()
    }

    fn timed_out() -> SubmitError {
        SubmitError::Timeout {
            program: "cast".into(),
            timeout: Duration::from_millis(1),
        }
    }

    fn interrupted_spawn() -> SubmitError {
        SubmitError::Spawn {
            program: "cast".into(),
            source: io::Error::new(io::ErrorKind::Interrupted, "signal"),
        }
    }

    fn config(max_attempts: u32, resubmit_after_timeout: bool) -> RetryConfig {
        let mut config = RetryConfig::default();
        config.max_attempts = max_attempts;
        config.initial_delay = Duration::from_millis(1);
        config.jitter = false;
        config.resubmit_after_timeout = resubmit_after_timeout;
        config
    }

    #[test]
    fn timeout_is_not_resubmitted_by_default() {
        let inner = Scripted::new(vec![Err(timed_out()), Ok("0xsecond")]);
        let mut submitter = RetrySubmitter::new(inner, config(3, false));
        assert!(matches!(
            submitter.submit(&call(), None),
            Err(SubmitError::Timeout { .. })
        ));
        assert_eq!(submitter.inner().calls, 1);
    }

    #[test]
    fn timeout_is_resubmitted_when_allowed() {
        let inner = Scripted::new(vec![Err(timed_out()), Ok("0xsecond")]);
        let mut submitter = RetrySubmitter::new(inner, config(3, true));
        let action = submitter.submit(&call(), None).unwrap();
        assert_eq!(action.handle, "0xsecond");
        assert_eq!(submitter.into_inner().calls, 2);
    }

    #[test]
    fn failure_before_the_signer_ran_is_retried() {
        let inner = Scripted::new(vec![Err(interrupted_spawn()), Ok("0xtx")]);
        let mut submitter = RetrySubmitter::new(inner, config(2, false));
        assert_eq!(submitter.submit(&call(), None).unwrap().handle, "0xtx");
        assert_eq!(submitter.inner().calls, 2);
    }

    #[test]
    fn rejection_ends_the_loop() {
        let rejected = SubmitError::Rejected {
            status: Some(1),
            stderr: "nonce too low".into(),
        };
        let inner = Scripted::new(vec![Err(interrupted_spawn()), Err(rejected)]);
        let mut submitter = RetrySubmitter::new(inner, config(5, true));
        match submitter.submit(&call(), None) {
            Err(SubmitError::Rejected { stderr, .. }) => assert_eq!(stderr, "nonce too low"),
            other => panic!("expected Rejected, got {other:?}"),
        }
        assert_eq!(submitter.inner().calls, 2);
    }

    #[test]
    fn exhaustion_counts_attempts_that_may_have_sent() {
        let inner = Scripted::new(vec![
            Err(interrupted_spawn()),
            Err(timed_out()),
            Err(timed_out()),
        ]);
        let mut submitter = RetrySubmitter::new(inner, config(3, true));
        match submitter.submit(&call(), None) {
            Err(SubmitError::RetriesExhausted {
                attempts,
                unconfirmed,
                last_error,
            }) => {
                assert_eq!((attempts, unconfirmed), (3, 2));
                assert!(matches!(*last_error, SubmitError::Timeout { .. }));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
    }

    #[test]
    fn zero_attempts_never_submits() {
        let mut submitter = RetrySubmitter::new(Scripted::new(Vec::new()), config(0, true));
        assert!(matches!(
            submitter.submit(&call(), None),
            Err(SubmitError::InvalidConfig(_))
        ));
        assert_eq!(submitter.inner().calls, 0);
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let mut config = config(10, false);
        config.initial_delay = Duration::from_millis(100);
        config.max_delay = Duration::from_millis(350);

        let mut plain = Backoff::new(&config);
        let delays: Vec<_> = (0..4).map(|_| plain.next_delay().as_millis()).collect();
        assert_eq!(delays, [100, 200, 350, 350]);

        config.jitter = true;
        let mut jittered = Backoff::new(&config);
        for expected in [100, 200, 350, 350] {
            let d = jittered.next_delay();
            let full = Duration::from_millis(expected);
            assert!(d >= full / 2 && d <= full, "{d:?} outside [{:?}, {full:?}]", full / 2);
        }
    }
}
