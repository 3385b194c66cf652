use std::{collections::BTreeMap, process::Command};
use tracing::debug;

/// Answers "which machine is this?".
///
/// Implementations return a possibly empty string and never fail; an empty
/// answer simply matches no host profile.
pub trait HostnameSource {
    fn current_hostname(&self) -> String;
}

/// A hostname chosen up front (`--host`, `SSWENV_HOST`, tests).
#[derive(Debug, Clone)]
pub struct FixedHostname(String);

impl FixedHostname {
    pub fn new(host: impl Into<String>) -> Self {
        Self(host.into())
    }
}

impl HostnameSource for FixedHostname {
    fn current_hostname(&self) -> String {
        self.0.clone()
    }
}

/// Platform lookup: `HOSTNAME`, then `COMPUTERNAME`, then the `hostname`
/// command. The value is passed through as-is apart from the command's line
/// terminator; no short-name or case normalization happens here.
#[derive(Debug, Clone)]
pub struct SystemHostname {
    vars: BTreeMap<String, String>,
    command: Option<String>,
}

impl SystemHostname {
    pub fn new(vars: BTreeMap<String, String>) -> Self {
        Self {
            vars,
            command: Some("hostname".to_string()),
        }
    }

    /// Disable the command fallback.
    pub fn without_command(mut self) -> Self {
        self.command = None;
        self
    }
}

impl HostnameSource for SystemHostname {
    fn current_hostname(&self) -> String {
        for key in ["HOSTNAME", "COMPUTERNAME"] {
            if let Some(h) = self.vars.get(key).filter(|h| !h.is_empty()) {
                debug!(source = key, host = %h, "hostname from environment");
                return h.clone();
            }
        }

        let from_cmd = self.command.as_deref().and_then(try_hostname_cmd);
        match from_cmd {
            Some(h) => {
                debug!(host = %h, "hostname from command");
                h
            }
            None => {
                debug!("hostname unavailable; continuing with empty hostname");
                String::new()
            }
        }
    }
}

fn try_hostname_cmd(program: &str) -> Option<String> {
    let out = Command::new(program).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let s = String::from_utf8_lossy(&out.stdout);
    let s = strip_line_terminator(&s);
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn strip_line_terminator(s: &str) -> &str {
    s.strip_suffix("\r\n")
        .or_else(|| s.strip_suffix('\n'))
        .unwrap_or(s)
}
