use serde::ser::{Serialize, SerializeMap, Serializer};
use std::{borrow::Borrow, collections::HashMap, fmt};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("configuration key must not be empty")]
    EmptyKey,

    #[error("host matcher must not be empty")]
    EmptyMatcher,
}

/// Name of a single configuration entry (an environment variable name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigKey(String);

impl ConfigKey {
    pub fn new(key: impl Into<String>) -> Result<Self, ModelError> {
        let key = key.into();
        if key.is_empty() {
            return Err(ModelError::EmptyKey);
        }
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ConfigKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Ordered key/value mapping.
///
/// Iteration follows insertion order. Setting a key that is already present
/// replaces its value without moving it.
#[derive(Debug, Clone, Default)]
pub struct EnvMap {
    entries: Vec<(ConfigKey, String)>,
    index: HashMap<ConfigKey, usize>,
}

impl EnvMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the previous value when `key` was already present.
    pub fn set(&mut self, key: ConfigKey, value: impl Into<String>) -> Option<String> {
        let value = value.into();
        match self.index.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].1, value)),
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&slot| self.entries[slot].1.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConfigKey, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Superimpose `other` on top of `self`; `other` wins on collision.
    pub fn merge_from(&mut self, other: &EnvMap) {
        for (k, v) in other.iter() {
            self.set(k.clone(), v);
        }
    }
}

impl PartialEq for EnvMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for EnvMap {}

impl FromIterator<(ConfigKey, String)> for EnvMap {
    fn from_iter<I: IntoIterator<Item = (ConfigKey, String)>>(iter: I) -> Self {
        let mut map = EnvMap::new();
        for (k, v) in iter {
            map.set(k, v);
        }
        map
    }
}

impl Serialize for EnvMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self.iter() {
            map.serialize_entry(k.as_str(), v)?;
        }
        map.end()
    }
}

/// Settings applied on every host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseConfig {
    env: EnvMap,
}

impl BaseConfig {
    pub fn new(env: EnvMap) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &EnvMap {
        &self.env
    }
}

/// Exact hostname a profile applies to. Never empty, so an empty hostname
/// can never select a profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostMatcher(String);

impl HostMatcher {
    pub fn new(matcher: impl Into<String>) -> Result<Self, ModelError> {
        let matcher = matcher.into();
        if matcher.is_empty() {
            return Err(ModelError::EmptyMatcher);
        }
        Ok(Self(matcher))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-sensitive equality, no trimming or domain stripping.
    pub fn matches(&self, hostname: &str) -> bool {
        self.0 == hostname
    }
}

impl fmt::Display for HostMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One recognized machine's deviation from the base settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProfile {
    pub matcher: HostMatcher,
    pub name: Option<String>,
    pub overrides: EnvMap,
}

impl HostProfile {
    pub fn new(matcher: HostMatcher, overrides: EnvMap) -> Self {
        Self {
            matcher,
            name: None,
            overrides,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(self.matcher.as_str())
    }
}

/// Host profiles in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostTable {
    profiles: Vec<HostProfile>,
}

impl HostTable {
    pub fn new(profiles: Vec<HostProfile>) -> Self {
        Self { profiles }
    }

    pub fn iter(&self) -> impl Iterator<Item = &HostProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Earliest profile whose matcher equals `hostname`.
    pub fn first_match(&self, hostname: &str) -> Option<&HostProfile> {
        self.profiles.iter().find(|p| p.matcher.matches(hostname))
    }

    /// Matchers declared more than once, each reported once, in order of
    /// their second appearance.
    pub fn duplicate_matchers(&self) -> Vec<&str> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut dups = Vec::new();
        for p in &self.profiles {
            let count = seen.entry(p.matcher.as_str()).or_insert(0);
            *count += 1;
            if *count == 2 {
                dups.push(p.matcher.as_str());
            }
        }
        dups
    }
}
