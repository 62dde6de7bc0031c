//! Versioned boot profile: dependency targets, degradation signatures and the
//! backend initializer.
//!
//! Service variants differ in which readiness paths they trust and which
//! environment variables carry their addresses. Keeping that knowledge in a
//! profile document turns drift between variants into a config diff.

use std::collections::HashSet;
use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::endpoint::ReadinessCheck;
use crate::signature::{DegradationSignature, SignatureError, SignatureSet};

/// Profile schema version understood by this release.
pub const PROFILE_VERSION: u32 = 1;

/// Default number of readiness attempts per target.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Default delay between readiness attempts, in milliseconds.
pub const DEFAULT_DELAY_MS: u64 = 2_000;

/// Default timeout for a single readiness attempt, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// Provider selection read from the environment.
///
/// `variable` holds the selected provider, `default` applies when it is
/// unset, and the selection holds when the value is one of `any_of`
/// (compared case-insensitively).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ProviderSelection {
    /// Variable naming the selected provider.
    pub variable: String,
    /// Provider assumed when the variable is unset.
    pub default: String,
    /// Providers that satisfy the selection.
    pub any_of: Vec<String>,
}

impl ProviderSelection {
    /// Selection satisfied when `variable` (defaulting to `default`) is one
    /// of `any_of`.
    #[must_use]
    pub fn new(variable: impl Into<String>, default: impl Into<String>, any_of: &[&str]) -> Self {
        Self {
            variable: variable.into(),
            default: default.into(),
            any_of: any_of.iter().map(|&provider| provider.to_owned()).collect(),
        }
    }

    /// Whether `value`, the variable's current value, satisfies the selection.
    #[must_use]
    pub fn holds(&self, value: Option<&str>) -> bool {
        let chosen = value.unwrap_or(&self.default);
        self.any_of
            .iter()
            .any(|provider| provider.eq_ignore_ascii_case(chosen))
    }
}

/// Declaration of one dependency the sequencer waits for.
///
/// The host comes from `host_env`, then from the URL in `url_env`, then from
/// `default_host`. A target none of these locate is skipped. The port comes
/// from `port_env`, then from the URL, then from `default_port`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct TargetSpec {
    /// Logical name used in the boot log.
    pub name: String,
    /// Environment variable holding the dependency host.
    #[serde(default)]
    pub host_env: Option<String>,
    /// Environment variable holding the dependency port.
    #[serde(default)]
    pub port_env: Option<String>,
    /// Environment variable holding a URL that names host and port.
    #[serde(default)]
    pub url_env: Option<String>,
    /// Host used when no variable supplies one.
    #[serde(default)]
    pub default_host: Option<String>,
    /// Port used when no variable supplies one.
    pub default_port: u16,
    /// Selections that enable the target; any one suffices. Empty means the
    /// target is always enabled.
    #[serde(default)]
    pub enabled_when: Vec<ProviderSelection>,
    /// Readiness check applied to each attempt.
    #[serde(default = "default_check")]
    pub check: ReadinessCheck,
    /// Maximum number of attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between attempts, in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    /// Timeout for one attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl TargetSpec {
    /// Declares a target located by a host and a port variable, with the
    /// default attempt budget.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        host_env: impl Into<String>,
        port_env: impl Into<String>,
        default_port: u16,
        check: ReadinessCheck,
    ) -> Self {
        Self {
            name: name.into(),
            host_env: Some(host_env.into()),
            port_env: Some(port_env.into()),
            url_env: None,
            default_host: None,
            default_port,
            enabled_when: Vec::new(),
            check,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay_ms: DEFAULT_DELAY_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// Declares a target located by a URL variable.
    #[must_use]
    pub fn from_url(
        name: impl Into<String>,
        url_env: impl Into<String>,
        default_port: u16,
        check: ReadinessCheck,
    ) -> Self {
        Self {
            host_env: None,
            port_env: None,
            url_env: Some(url_env.into()),
            ..Self::new(name, String::new(), String::new(), default_port, check)
        }
    }

    /// Uses `host` when no variable supplies one.
    #[must_use]
    pub fn with_default_host(mut self, host: impl Into<String>) -> Self {
        self.default_host = Some(host.into());
        self
    }

    /// Enables the target only while one of its selections holds.
    #[must_use]
    pub fn only_when(mut self, selection: ProviderSelection) -> Self {
        self.enabled_when.push(selection);
        self
    }

    /// Whether the target applies, reading selections through `lookup`.
    #[must_use]
    pub fn is_enabled(&self, lookup: impl Fn(&str) -> Option<String>) -> bool {
        self.enabled_when.is_empty()
            || self
                .enabled_when
                .iter()
                .any(|selection| selection.holds(lookup(&selection.variable).as_deref()))
    }

    fn locatable(&self) -> bool {
        [&self.host_env, &self.url_env, &self.default_host]
            .into_iter()
            .flatten()
            .any(|value| !value.trim().is_empty())
    }
}

/// Command run once to initialize the server's storage backends.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InitializerSpec {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    #[serde(default)]
    pub args: Vec<String>,
}

/// Versioned boot profile.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Profile {
    /// Schema version; must equal [`PROFILE_VERSION`].
    pub version: u32,
    /// Dependencies probed in declaration order.
    #[serde(default)]
    pub targets: Vec<TargetSpec>,
    /// Signatures of forgivable initialization failures.
    #[serde(default)]
    pub degradations: Vec<DegradationSignature>,
    /// Optional backend initializer.
    #[serde(default)]
    pub initializer: Option<InitializerSpec>,
}

impl Profile {
    /// Built-in profile used when no profile file is present.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            version: PROFILE_VERSION,
            targets: vec![
                TargetSpec::new(
                    "postgres",
                    "POSTGRES_HOST",
                    "POSTGRES_PORT",
                    5432,
                    ReadinessCheck::Tcp,
                )
                .with_default_host("postgres")
                .only_when(ProviderSelection::new(
                    "STORAGE_PROVIDER",
                    "postgres",
                    &["postgres"],
                ))
                .only_when(ProviderSelection::new(
                    "VECTOR_PROVIDER",
                    "qdrant",
                    &["pgvector"],
                )),
                TargetSpec::from_url(
                    "qdrant",
                    "QDRANT_URL",
                    6333,
                    ReadinessCheck::http("/readyz", 200),
                )
                .with_default_host("qdrant")
                .only_when(ProviderSelection::new(
                    "VECTOR_PROVIDER",
                    "qdrant",
                    &["qdrant"],
                )),
                TargetSpec::new("redis", "REDIS_HOST", "REDIS_PORT", 6379, ReadinessCheck::Tcp),
            ],
            degradations: vec![
                DegradationSignature::new("vector", "extension \"vector\" is not available"),
                DegradationSignature::new("vector", "extension \"vector\" does not exist"),
                DegradationSignature::new(
                    "vector",
                    "could not open extension control file \"/usr/share/postgresql",
                ),
            ],
            initializer: None,
        }
    }

    /// Parses and validates a profile from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ProfileError> {
        let profile: Self = serde_json::from_str(text).map_err(ProfileError::Parse)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Loads the profile at `path`, falling back to [`Profile::builtin`] when
    /// the file does not exist.
    pub fn load_or_builtin(path: &Utf8Path) -> Result<ProfileSource, ProfileError> {
        match fs::read_to_string(path) {
            Ok(text) => {
                let profile = Self::from_json(&text).map_err(|error| error.at(path))?;
                Ok(ProfileSource::File {
                    path: path.to_path_buf(),
                    profile,
                })
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                Ok(ProfileSource::Builtin(Self::builtin()))
            }
            Err(source) => Err(ProfileError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Checks the structural invariants of the profile.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.version != PROFILE_VERSION {
            return Err(ProfileError::UnsupportedVersion {
                found: self.version,
                expected: PROFILE_VERSION,
            });
        }
        let mut seen = HashSet::new();
        for target in &self.targets {
            let name = target.name.trim();
            if name.is_empty() {
                return Err(ProfileError::UnnamedTarget);
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(ProfileError::DuplicateTarget(name.to_owned()));
            }
            if !target.locatable() {
                return Err(ProfileError::MissingHostVariable(name.to_owned()));
            }
            if target.max_attempts == 0 {
                return Err(ProfileError::ZeroAttempts(name.to_owned()));
            }
            if target.timeout_ms == 0 {
                return Err(ProfileError::ZeroTimeout(name.to_owned()));
            }
        }
        if let Some(initializer) = &self.initializer
            && initializer.program.trim().is_empty()
        {
            return Err(ProfileError::EmptyInitializer);
        }
        self.signature_set()?;
        Ok(())
    }

    /// Builds the validated signature set declared by the profile.
    pub fn signature_set(&self) -> Result<SignatureSet, ProfileError> {
        SignatureSet::from_signatures(&self.degradations).map_err(ProfileError::Signature)
    }
}

/// Where the active profile came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSource {
    /// Profile read from disk.
    File {
        /// Path the profile was read from.
        path: Utf8PathBuf,
        /// Parsed profile.
        profile: Profile,
    },
    /// Compiled-in profile.
    Builtin(Profile),
}

impl ProfileSource {
    /// Consumes the source and returns the profile.
    #[must_use]
    pub fn into_profile(self) -> Profile {
        match self {
            Self::File { profile, .. } | Self::Builtin(profile) => profile,
        }
    }

    /// Human-readable origin for the boot log.
    #[must_use]
    pub fn origin(&self) -> String {
        match self {
            Self::File { path, .. } => path.to_string(),
            Self::Builtin(_) => String::from("builtin"),
        }
    }
}

/// Errors raised while loading or validating a profile.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The profile file exists but could not be read.
    #[error("failed to read profile '{path}': {source}")]
    Read {
        /// Profile path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The profile is not valid JSON for the schema.
    #[error("failed to parse profile: {0}")]
    Parse(#[source] serde_json::Error),
    /// A validation error attributed to a profile file.
    #[error("invalid profile '{path}': {source}")]
    Invalid {
        /// Profile path.
        path: Utf8PathBuf,
        /// Validation failure.
        #[source]
        source: Box<ProfileError>,
    },
    /// The schema version is not supported.
    #[error("unsupported profile version {found} (expected {expected})")]
    UnsupportedVersion {
        /// Version declared by the document.
        found: u32,
        /// Version understood by this release.
        expected: u32,
    },
    /// A target has no name.
    #[error("profile declares a target without a name")]
    UnnamedTarget,
    /// Two targets share a name.
    #[error("profile declares target '{0}' more than once")]
    DuplicateTarget(String),
    /// A target does not say where its host comes from.
    #[error("target '{0}' names no host variable, URL variable or default host")]
    MissingHostVariable(String),
    /// A target would never be attempted.
    #[error("target '{0}' must allow at least one attempt")]
    ZeroAttempts(String),
    /// A target would fail every attempt before connecting.
    #[error("target '{0}' must allow a non-zero attempt timeout")]
    ZeroTimeout(String),
    /// The initializer program is blank.
    #[error("profile initializer names no program")]
    EmptyInitializer,
    /// A degradation signature is malformed or too broad.
    #[error("invalid degradation signature: {0}")]
    Signature(#[source] SignatureError),
}

impl ProfileError {
    fn at(self, path: &Utf8Path) -> Self {
        match self {
            error @ (Self::Read { .. } | Self::Invalid { .. }) => error,
            other => Self::Invalid {
                path: path.to_path_buf(),
                source: Box::new(other),
            },
        }
    }
}

fn default_check() -> ReadinessCheck {
    ReadinessCheck::Tcp
}

const fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

const fn default_delay_ms() -> u64 {
    DEFAULT_DELAY_MS
}

const fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}
