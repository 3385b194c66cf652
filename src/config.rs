//! On-disk configuration layout.
//!
//! A config file holds the base settings, the host table, and the optional
//! toolkit setup step. Retired entries and profiles stay in the file with
//! `enabled = false`; they are parsed and reported but never resolved.

use regex::Regex;
use serde::{
    de::{MapAccess, Visitor},
    Deserialize, Deserializer,
};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::LazyLock,
};
use tracing::warn;

use crate::model::{BaseConfig, ConfigKey, EnvMap, HostMatcher, HostProfile, HostTable};

pub const SCHEMA_VERSION: u32 = 1;

/// Stub written when no config file exists yet.
pub const DEFAULT_CONFIG: &str = include_str!("../assets/config.toml");

// Exported keys must be usable as shell variable names.
static KEY_RULES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("key pattern is valid"));

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] toml::de::Error),

    #[error("unsupported schema_version {found} (expected {})", SCHEMA_VERSION)]
    UnsupportedSchema { found: u32 },

    #[error("{scope}: invalid key {key:?} (expected a shell variable name)")]
    InvalidKey { scope: String, key: String },

    #[error("host #{index}: matcher must not be empty")]
    EmptyMatcher { index: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Shell {
    Zsh,
    Bash,
    Fish,
    Pwsh,
    Csh,
}

impl Shell {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zsh" => Some(Shell::Zsh),
            "bash" | "sh" => Some(Shell::Bash),
            "fish" => Some(Shell::Fish),
            "pwsh" | "powershell" => Some(Shell::Pwsh),
            "csh" | "tcsh" => Some(Shell::Csh),
            _ => None,
        }
    }

    /// Guess from a `$SHELL`-style path such as `/bin/tcsh`.
    pub fn from_login_shell(path: &str) -> Option<Self> {
        let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        let name = name.strip_suffix(".exe").unwrap_or(name);
        Self::parse(name)
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shell::Zsh => "zsh",
            Shell::Bash => "bash",
            Shell::Fish => "fish",
            Shell::Pwsh => "pwsh",
            Shell::Csh => "csh",
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub sswenv: Meta,

    #[serde(default)]
    pub base: EntryList,

    #[serde(default, rename = "host")]
    pub hosts: Vec<HostSpec>,

    #[serde(default)]
    pub toolkit: Option<ToolkitSpec>,
}

#[derive(Debug, Deserialize)]
pub struct Meta {
    pub schema_version: u32,

    #[serde(default = "default_shell")]
    pub default_shell: Shell,
}

fn default_shell() -> Shell {
    Shell::Bash
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct HostSpec {
    pub matcher: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub env: EntryList,
}

impl HostSpec {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.matcher)
    }
}

/// External setup script sourced after the variables are exported.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolkitSpec {
    pub setup: String,

    #[serde(default = "default_true")]
    pub quiet: bool,

    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// A value is either a bare string or `{ value = "...", enabled = false }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EntrySpec {
    Plain(String),
    Detailed {
        value: String,
        #[serde(default = "default_true")]
        enabled: bool,
    },
}

impl EntrySpec {
    pub fn value(&self) -> &str {
        match self {
            EntrySpec::Plain(v) => v,
            EntrySpec::Detailed { value, .. } => value,
        }
    }

    pub fn enabled(&self) -> bool {
        match self {
            EntrySpec::Plain(_) => true,
            EntrySpec::Detailed { enabled, .. } => *enabled,
        }
    }
}

/// TOML table kept in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryList(Vec<(String, EntrySpec)>);

impl EntryList {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &EntrySpec)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn retired(&self) -> impl Iterator<Item = (&str, &EntrySpec)> {
        self.iter().filter(|(_, e)| !e.enabled())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn to_env(&self, scope: &str) -> Result<EnvMap, ConfigError> {
        let mut env = EnvMap::new();
        for (k, e) in self.iter() {
            let key = checked_key(scope, k)?;
            if e.enabled() {
                env.set(key, e.value());
            }
        }
        Ok(env)
    }
}

impl<'de> Deserialize<'de> for EntryList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntryListVisitor;

        impl<'de> Visitor<'de> for EntryListVisitor {
            type Value = EntryList;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a table of KEY = value entries")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::new();
                while let Some((k, v)) = map.next_entry::<String, EntrySpec>()? {
                    out.push((k, v));
                }
                Ok(EntryList(out))
            }
        }

        deserializer.deserialize_map(EntryListVisitor)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let cfg: Config = toml::from_str(data)?;

        if cfg.sswenv.schema_version != SCHEMA_VERSION {
            return Err(ConfigError::UnsupportedSchema {
                found: cfg.sswenv.schema_version,
            });
        }

        // INVARIANT: surface bad keys and matchers at load time, including
        // those in retired entries.
        cfg.base_config()?;
        cfg.build_hosts()?;

        Ok(cfg)
    }
}

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    pub fn base_config(&self) -> Result<BaseConfig, ConfigError> {
        Ok(BaseConfig::new(self.base.to_env("base")?))
    }

    /// Enabled host profiles in declaration order. Duplicate matchers are
    /// kept (the earlier one wins at resolution) and logged.
    pub fn host_table(&self) -> Result<HostTable, ConfigError> {
        let table = self.build_hosts()?;
        for dup in table.duplicate_matchers() {
            warn!(matcher = dup, "host matcher declared more than once; the first profile wins");
        }
        Ok(table)
    }

    pub fn retired_hosts(&self) -> impl Iterator<Item = &HostSpec> {
        self.hosts.iter().filter(|h| !h.enabled)
    }

    pub fn active_toolkit(&self) -> Option<&ToolkitSpec> {
        self.toolkit.as_ref().filter(|t| t.enabled)
    }

    fn build_hosts(&self) -> Result<HostTable, ConfigError> {
        let mut profiles = Vec::new();

        for (index, spec) in self.hosts.iter().enumerate() {
            let matcher = HostMatcher::new(spec.matcher.as_str())
                .map_err(|_| ConfigError::EmptyMatcher { index })?;
            let overrides = spec.env.to_env(&format!("host {}", spec.label()))?;

            if !spec.enabled {
                continue;
            }

            let mut profile = HostProfile::new(matcher, overrides);
            if let Some(name) = &spec.name {
                profile = profile.with_name(name);
            }
            profiles.push(profile);
        }

        Ok(HostTable::new(profiles))
    }
}

fn checked_key(scope: &str, key: &str) -> Result<ConfigKey, ConfigError> {
    let invalid = || ConfigError::InvalidKey {
        scope: scope.to_string(),
        key: key.to_string(),
    };
    if !KEY_RULES.is_match(key) {
        return Err(invalid());
    }
    ConfigKey::new(key).map_err(|_| invalid())
}
