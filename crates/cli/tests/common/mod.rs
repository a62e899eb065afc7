//! Shared helpers for `callbook` CLI integration tests.

#![allow(unreachable_pub)]

use std::path::Path;
use std::process::{Command, Output};

use assert_cmd::cargo;
use serde_json::Value;

/// A `callbook` command bound to `home`, with JSON output.
pub fn callbook(home: &Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("callbook"));
    cmd.arg("--home")
        .arg(home)
        .args(["--output", "json"])
        .env_remove("CALLBOOK_HOME")
        .env_remove("RUST_LOG");
    cmd
}

/// Run `callbook <args>` and parse stdout as JSON.
pub fn run_json(home: &Path, args: &[&str]) -> (Output, Value) {
    let output = callbook(home).args(args).output().expect("run callbook");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let json = serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("stdout is not JSON ({e}): {stdout}"));
    (output, json)
}

/// Run a command that must succeed and return its JSON.
#[allow(dead_code)]
pub fn ok_json(home: &Path, args: &[&str]) -> Value {
    let (output, json) = run_json(home, args);
    assert!(
        output.status.success(),
        "callbook {args:?} failed: {json}\nstderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    json
}

/// Run a command that must fail and return its error envelope.
#[allow(dead_code)]
pub fn err_json(home: &Path, args: &[&str]) -> Value {
    let (output, json) = run_json(home, args);
    assert!(!output.status.success(), "callbook {args:?} unexpectedly succeeded: {json}");
    assert_eq!(json["success"], false, "not an error envelope: {json}");
    json
}

/// A literal address made of 40 copies of `c`.
#[allow(dead_code)]
pub fn addr(c: char) -> String {
    format!("0x{}", c.to_string().repeat(40))
}
