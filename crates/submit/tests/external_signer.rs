//! Integration tests for the external signer, using `sh` as a stand-in for
//! the real signing program.

#![cfg(unix)]

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use callbook_core::{CallDescriptor, reconstruct};
use callbook_submit::{
    ExternalSigner, RetryConfig, RetrySubmitter, SignerConfig, SubmitError, Submitter,
};

const ADDR: &str = "0x00000000000000000000000000000000000000aa";

fn call(text: &str) -> CallDescriptor {
    let resolve = |t: &str| {
        if t == "token" {
            ADDR.to_string()
        } else {
            t.to_string()
        }
    };
    reconstruct(text, &resolve).unwrap()
}

/// A signer that runs `script` under `sh -c`. The generated arguments land
/// in `$1..`, so `$2` is the contract address.
fn shell_signer(script: &str, timeout: Duration) -> ExternalSigner {
    let mut config = SignerConfig::default();
    config.program = "sh".into();
    config.args = vec!["-c".into(), script.into(), "signer".into()];
    config.timeout = timeout;
    ExternalSigner::new(config).unwrap()
}

#[test]
fn stdout_becomes_the_handle() {
    let mut signer = shell_signer(r#"echo "  pending-$2  ""#, Duration::from_secs(10));
    let action = signer
        .submit(&call(r#"send me token "transfer(address,uint256)" 0xbeef 5"#), None)
        .unwrap();
    assert_eq!(action.handle, format!("pending-{ADDR}"));
    assert!(!action.dry_run);
    assert_eq!(action.program, "sh");
    assert_eq!(&action.args[3..6], ["send", ADDR, "transfer(address,uint256)"]);
}

#[test]
fn arguments_arrive_unsplit() {
    // `$#` counts arguments after the script name.
    let mut signer = shell_signer(r#"echo "$# $4""#, Duration::from_secs(10));
    let action = signer
        .submit(&call(r#"call me token "f(string)" "two words""#), None)
        .unwrap();
    // send, address, signature, arg, --account, me
    assert_eq!(action.handle, "6 two words");
}

#[test]
fn nonzero_exit_is_rejected_with_stderr() {
    let mut signer = shell_signer("echo 'execution reverted' >&2; exit 3", Duration::from_secs(10));
    match signer.submit(&call(r#"call me token "f()""#), None) {
        Err(SubmitError::Rejected { status, stderr }) => {
            assert_eq!(status, Some(3));
            assert_eq!(stderr, "execution reverted");
        }
        other => panic!("expected Rejected, got {other:?}"),
    }
}

#[test]
fn empty_stdout_is_an_error() {
    let mut signer = shell_signer("true", Duration::from_secs(10));
    assert!(matches!(
        signer.submit(&call(r#"call me token "f()""#), None),
        Err(SubmitError::EmptyResponse)
    ));
}

#[test]
fn slow_signer_is_killed_on_timeout() {
    let mut signer = shell_signer("sleep 5; echo late", Duration::from_millis(200));
    let started = Instant::now();
    let err = signer
        .submit(&call(r#"call me token "f()""#), None)
        .unwrap_err();
    assert!(matches!(err, SubmitError::Timeout { .. }), "{err:?}");
    assert!(err.is_retryable());
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
fn background_child_holding_stdout_cannot_outlast_timeout() {
    // The signer exits at once but leaves `sleep` holding its pipes open.
    let mut signer = shell_signer("echo 0xtx; sleep 5 &", Duration::from_millis(300));
    let started = Instant::now();
    let err = signer
        .submit(&call(r#"call me token "f()""#), None)
        .unwrap_err();
    assert!(matches!(err, SubmitError::Timeout { .. }), "{err:?}");
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn missing_program_fails_to_spawn() {
    let mut config = SignerConfig::default();
    config.program = "/nonexistent/callbook-signer".into();
    let mut signer = ExternalSigner::new(config).unwrap();
    match signer.submit(&call(r#"call me token "f()""#), None) {
        Err(SubmitError::Spawn { program, source }) => {
            assert_eq!(program, "/nonexistent/callbook-signer");
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("expected Spawn, got {other:?}"),
    }
}

#[test]
fn unresolved_contract_never_spawns() {
    let mut signer = shell_signer("exit 99", Duration::from_secs(10));
    assert!(matches!(
        signer.submit(&call(r#"call me ghost "f()""#), None),
        Err(SubmitError::Unresolved { .. })
    ));
}

// ── Retry through a real signer ────────────────────────────────────────

/// Number of times a counting signer has run.
fn runs(log: &Path) -> usize {
    fs::read_to_string(log).map_or(0, |text| text.lines().count())
}

fn retry(max_attempts: u32, resubmit_after_timeout: bool) -> RetryConfig {
    let mut retry = RetryConfig::default();
    retry.max_attempts = max_attempts;
    retry.initial_delay = Duration::from_millis(1);
    retry.jitter = false;
    retry.resubmit_after_timeout = resubmit_after_timeout;
    retry
}

#[test]
fn rejected_call_is_never_resubmitted() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("runs");
    let script = format!("echo run >> '{}'; echo 'nonce too low' >&2; exit 1", log.display());
    let signer = shell_signer(&script, Duration::from_secs(10));
    let mut submitter = RetrySubmitter::new(signer, retry(3, true));

    assert!(matches!(
        submitter.submit(&call(r#"send me token "f()""#), None),
        Err(SubmitError::Rejected { .. })
    ));
    assert_eq!(runs(&log), 1);
}

#[test]
fn timed_out_signer_runs_once_unless_resubmission_is_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("runs");
    let script = format!("echo run >> '{}'; sleep 5", log.display());
    let signer = shell_signer(&script, Duration::from_millis(200));
    let mut submitter = RetrySubmitter::new(signer, retry(3, false));

    assert!(matches!(
        submitter.submit(&call(r#"send me token "f()""#), None),
        Err(SubmitError::Timeout { .. })
    ));
    assert_eq!(runs(&log), 1);
}

#[test]
fn timeouts_are_resubmitted_when_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let log = dir.path().join("runs");
    let script = format!("echo run >> '{}'; sleep 5", log.display());
    let signer = shell_signer(&script, Duration::from_millis(200));
    let mut submitter = RetrySubmitter::new(signer, retry(2, true));

    match submitter.submit(&call(r#"send me token "f()""#), None) {
        Err(SubmitError::RetriesExhausted {
            attempts,
            unconfirmed,
            last_error,
        }) => {
            assert_eq!((attempts, unconfirmed), (2, 2));
            assert!(matches!(*last_error, SubmitError::Timeout { .. }));
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(runs(&log), 2);
}
