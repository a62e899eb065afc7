//! Output formatting and error rendering.
//!
//! Successful results go to stdout, either as JSON or as plain text.
//! Failures are rendered on stderr (pretty) or as a JSON envelope on stdout.
//! Malformed invocations get an ariadne report over the expanded template
//! text.

use std::fmt;
use std::io::{self, IsTerminal};

use ariadne::{Color, Config, Fmt, Label, Report, ReportKind, Source};
use callbook_core::{CoreError, StoreError};
use callbook_submit::SubmitError;
use serde_json::{Value, json};

// ── Output format ───────────────────────────────────────────────────────

/// Output format for command results and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    /// Human-readable output.
    Pretty,
    /// Machine-readable JSON.
    Json,
}

impl Format {
    /// Resolve `Auto` to a concrete format based on whether stdout is a TTY.
    pub(crate) fn resolve_or_detect(explicit: Option<&str>) -> Self {
        match explicit {
            Some("json") => Format::Json,
            Some("pretty") => Format::Pretty,
            // Default: pretty for interactive terminals, JSON for pipes
            _ => {
                if io::stdout().is_terminal() {
                    Format::Pretty
                } else {
                    Format::Json
                }
            }
        }
    }
}

/// Print a JSON value to stdout.
pub(crate) fn print_json(value: &Value) {
    let text = serde_json::to_string_pretty(value).expect("JSON value serialization cannot fail");
    println!("{text}");
}

/// Print a one-line status message in pretty mode.
pub(crate) fn status(msg: impl fmt::Display) {
    eprintln!("{}", msg.to_string().fg(Color::Green));
}

// ── Error context ───────────────────────────────────────────────────────

/// Context attached to reconstruction failures so the renderer can show the
/// expanded text.
#[derive(Debug, Clone)]
pub(crate) struct Expanded {
    pub(crate) template: String,
    pub(crate) text: String,
}

impl fmt::Display for Expanded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template '{}' did not expand to a valid call", self.template)
    }
}

fn core_error(err: &anyhow::Error) -> Option<&CoreError> {
    err.chain().find_map(|e| e.downcast_ref::<CoreError>())
}

fn submit_error(err: &anyhow::Error) -> Option<&SubmitError> {
    err.chain().find_map(|e| e.downcast_ref::<SubmitError>())
}

// ── JSON envelope ───────────────────────────────────────────────────────

/// Build the `{success: false, ...}` envelope for a failed command.
pub(crate) fn error_envelope(err: &anyhow::Error) -> Value {
    let mut out = json!({
        "success": false,
        "error": "command_failed",
        "message": format!("{err:#}"),
    });

    if let Some(core) = core_error(err) {
        out["error"] = json!(core.kind());
        match core {
            CoreError::Duplicate { kind, key } | CoreError::NotFound { kind, key } => {
                out["entity"] = json!(kind.to_string());
                out["key"] = json!(key);
            }
            CoreError::Validation { field, value, .. } => {
                out["field"] = json!(field);
                out["value"] = json!(value);
            }
            CoreError::Arity {
                template,
                parameters,
                expected,
                actual,
            } => {
                out["template"] = json!(template);
                out["parameters"] = json!(parameters);
                out["expected"] = json!(expected);
                out["actual"] = json!(actual);
            }
            CoreError::MalformedInvocation { reason, span } => {
                out["reason"] = json!(reason.to_string());
                out["expected"] = json!(reason.expected());
                out["actual"] = json!(reason.actual());
                out["span"] = json!(span);
                if let Some(expanded) = err.downcast_ref::<Expanded>() {
                    out["template"] = json!(expanded.template);
                    out["text"] = json!(expanded.text);
                }
            }
            CoreError::Store(store) => {
                if let StoreError::InvalidDocument { kind, .. } = store {
                    out["document"] = json!(kind.to_string());
                }
            }
            _ => {}
        }
    } else if let Some(submit) = submit_error(err) {
        out["error"] = json!("submit_failed");
        out["retryable"] = json!(submit.is_retryable());
        if let SubmitError::Rejected { status, stderr } = submit {
            out["status"] = json!(status);
            out["stderr"] = json!(stderr);
        }
    }
    out
}

// ── Pretty rendering ────────────────────────────────────────────────────

fn render_malformed_pretty(err: &anyhow::Error, expanded: &Expanded, core: &CoreError) {
    let CoreError::MalformedInvocation { reason, span } = core else {
        return;
    };
    let filename = expanded.template.as_str();
    let text = &expanded.text;

    // Clamp span to source length to avoid panics on truncated input.
    let start = span.start.min(text.len());
    let end = span.end.min(text.len()).max(start);

    let config = Config::default().with_compact(false);
    let mut cache = (filename, Source::from(text.as_str()));
    let report = Report::build(ReportKind::Error, (filename, start..end))
        .with_code(core.kind())
        .with_message(err.to_string())
        .with_config(config)
        .with_label(
            Label::new((filename, start..end))
                .with_message(reason.to_string())
                .with_color(Color::Red),
        )
        .with_note(format!(
            "expected {}, found {}",
            reason.expected(),
            reason.actual()
        ))
        .finish();
    report.eprint(&mut cache).ok();
}

fn render_pretty(err: &anyhow::Error) {
    let core = core_error(err);
    if let (Some(expanded), Some(core)) = (err.downcast_ref::<Expanded>(), core) {
        render_malformed_pretty(err, expanded, core);
        return;
    }

    eprintln!("{}: {err:#}", "error".fg(Color::Red));
    match core {
        Some(CoreError::Arity { parameters, .. }) if !parameters.is_empty() => {
            eprintln!("  = note: parameters: {}", parameters.join(", "));
        }
        Some(CoreError::Validation {
            field: "contract", ..
        }) => {
            eprintln!("  = help: register it with `callbook alias add <alias> <address>`");
        }
        _ => {}
    }
}

// ── Unified entry point ─────────────────────────────────────────────────

/// Report a failed command in the given format.
pub(crate) fn render_error(err: &anyhow::Error, format: Format) {
    match format {
        Format::Pretty => render_pretty(err),
        Format::Json => print_json(&error_envelope(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callbook_core::{EntityKind, MalformedReason, Span};

    #[test]
    fn generic_errors_use_command_failed() {
        let err = anyhow::anyhow!("boom");
        let env = error_envelope(&err);
        assert_eq!(env["success"], false);
        assert_eq!(env["error"], "command_failed");
        assert_eq!(env["message"], "boom");
    }

    #[test]
    fn core_errors_are_classified_through_context() {
        let err = anyhow::Error::new(CoreError::NotFound {
            kind: EntityKind::Alias,
            key: "usdc".into(),
        })
        .context("failed to update alias");
        let env = error_envelope(&err);
        assert_eq!(env["error"], "not_found");
        assert_eq!(env["entity"], "alias");
        assert_eq!(env["key"], "usdc");
        assert!(env["message"].as_str().unwrap().starts_with("failed to update alias"));
    }

    #[test]
    fn malformed_envelope_carries_span_and_text() {
        let err = anyhow::Error::new(CoreError::MalformedInvocation {
            reason: MalformedReason::MissingFlagValue {
                flag: "--value".into(),
            },
            span: Span::new(13, 20),
        })
        .context(Expanded {
            template: "t".into(),
            text: "call w c f() --value".into(),
        });
        let env = error_envelope(&err);
        assert_eq!(env["error"], "malformed_invocation");
        assert_eq!(env["span"]["start"], 13);
        assert_eq!(env["span"]["end"], 20);
        assert_eq!(env["expected"], "--value <value>");
        assert_eq!(env["text"], "call w c f() --value");
    }

    #[test]
    fn submit_errors_report_retryability() {
        let err = anyhow::Error::new(SubmitError::Rejected {
            status: Some(1),
            stderr: "reverted".into(),
        });
        let env = error_envelope(&err);
        assert_eq!(env["error"], "submit_failed");
        assert_eq!(env["retryable"], false);
        assert_eq!(env["stderr"], "reverted");
    }
}
