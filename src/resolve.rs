use serde::Serialize;
use tracing::debug;

use crate::{
    host::HostnameSource,
    model::{BaseConfig, EnvMap, HostTable},
};

/// Base settings with at most one host profile superimposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    host: String,
    matched: Option<String>,
    env: EnvMap,
}

impl ResolvedConfig {
    pub fn env(&self) -> &EnvMap {
        &self.env
    }

    /// Hostname the resolution was performed for.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Label of the applied profile, if any matched.
    pub fn matched(&self) -> Option<&str> {
        self.matched.as_deref()
    }
}

/// Copy `base`, then apply the overrides of the first profile in `hosts`
/// whose matcher equals `hostname`. Later profiles are never consulted.
pub fn resolve(base: &BaseConfig, hosts: &HostTable, hostname: &str) -> ResolvedConfig {
    let mut env = base.env().clone();

    let matched = match hosts.first_match(hostname) {
        Some(profile) => {
            debug!(
                host = hostname,
                profile = profile.label(),
                overrides = profile.overrides.len(),
                "host profile matched"
            );
            env.merge_from(&profile.overrides);
            Some(profile.label().to_string())
        }
        None => {
            debug!(host = hostname, "no host profile matched; using base settings");
            None
        }
    };

    ResolvedConfig {
        host: hostname.to_string(),
        matched,
        env,
    }
}

/// Query `source` once and resolve against its answer.
pub fn resolve_with(
    base: &BaseConfig,
    hosts: &HostTable,
    source: &dyn HostnameSource,
) -> ResolvedConfig {
    let hostname = source.current_hostname();
    resolve(base, hosts, &hostname)
}
