//! Data directory resolution and the optional `config.json`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use callbook_submit::SubmitConfig;
use serde::Deserialize;

/// Directory name used under the user's home when nothing else is given.
const DEFAULT_DIR_NAME: &str = ".callbook";

/// File name of the settings file inside the data directory.
pub(crate) const CONFIG_FILE: &str = "config.json";

/// Pick the data directory: `--home` / `CALLBOOK_HOME` (already merged by
/// clap) or `~/.callbook`.
pub(crate) fn resolve_home(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_DIR_NAME))
        .context("could not determine the home directory; pass --home or set CALLBOOK_HOME")
}

/// Settings read from `<home>/config.json`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct Settings {
    /// Endpoint used when neither the command line nor the template sets one.
    pub(crate) rpc_url: Option<String>,
    pub(crate) signer: SignerSettings,
    pub(crate) retry: RetrySettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct SignerSettings {
    pub(crate) program: Option<String>,
    pub(crate) args: Vec<String>,
    pub(crate) timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct RetrySettings {
    pub(crate) max_attempts: Option<u32>,
    pub(crate) initial_delay_ms: Option<u64>,
    pub(crate) max_delay_ms: Option<u64>,
    pub(crate) jitter: Option<bool>,
    pub(crate) resubmit_after_timeout: Option<bool>,
}

impl Settings {
    /// Load `<home>/config.json`, or defaults when the file does not exist.
    pub(crate) fn load(home: &Path) -> Result<Self> {
        let path = home.join(CONFIG_FILE);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to read {}", path.display()));
            }
        };
        serde_json::from_str(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Submission settings with file values layered over the defaults.
    pub(crate) fn submit_config(&self) -> SubmitConfig {
        let mut config = SubmitConfig::default();

        if let Some(program) = &self.signer.program {
            config.signer.program = program.clone();
        }
        config.signer.args = self.signer.args.clone();
        if let Some(secs) = self.signer.timeout_secs {
            config.signer.timeout = Duration::from_secs(secs);
        }

        if let Some(n) = self.retry.max_attempts {
            config.retry.max_attempts = n;
        }
        if let Some(ms) = self.retry.initial_delay_ms {
            config.retry.initial_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = self.retry.max_delay_ms {
            config.retry.max_delay = Duration::from_millis(ms);
        }
        if let Some(jitter) = self.retry.jitter {
            config.retry.jitter = jitter;
        }
        if let Some(resubmit) = self.retry.resubmit_after_timeout {
            config.retry.resubmit_after_timeout = resubmit;
        }
        config
    }

    /// Endpoint for a call: the command line wins, then the template's own
    /// `--rpc-url`, then the configured default.
    ///
    /// Returns the value to pass as an override, or `None` to keep whatever
    /// the template carries.
    pub(crate) fn rpc_override<'a>(
        &'a self,
        cli: Option<&'a str>,
        template: Option<&str>,
    ) -> Option<&'a str> {
        match (cli, template) {
            (Some(url), _) => Some(url),
            (None, Some(_)) => None,
            (None, None) => self.rpc_url.as_deref(),
        }
    }
}
