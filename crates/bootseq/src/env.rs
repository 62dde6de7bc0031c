//! Access to environment input.
//!
//! Both the target resolver and the configuration synthesizer read the
//! environment through [`EnvSource`] so tests can supply a fixed map.

use std::collections::BTreeMap;

/// Read-only view of environment variables.
pub trait EnvSource {
    /// Returns the raw value of `key`, if set.
    fn raw(&self, key: &str) -> Option<String>;

    /// Returns the trimmed value of `key`, treating blank values as unset.
    fn value(&self, key: &str) -> Option<String> {
        self.raw(key)
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
    }
}

/// Environment of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemEnv;

impl EnvSource for SystemEnv {
    fn raw(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed environment, mainly for tests and dry runs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MapEnv {
    vars: BTreeMap<String, String>,
}

impl MapEnv {
    /// Builds an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the environment with `key` set to `value`.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets `key` to `value`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Removes `key`.
    pub fn remove(&mut self, key: &str) {
        self.vars.remove(key);
    }
}

impl<K, V> FromIterator<(K, V)> for MapEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl EnvSource for MapEnv {
    fn raw(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_count_as_unset() {
        let env = MapEnv::new().with("POSTGRES_HOST", "   ");
        assert_eq!(env.value("POSTGRES_HOST"), None);
    }

    #[test]
    fn values_are_trimmed() {
        let env: MapEnv = [("PROJECT_NAME", " docs \n")].into_iter().collect();
        assert_eq!(env.value("PROJECT_NAME").as_deref(), Some("docs"));
    }
}
