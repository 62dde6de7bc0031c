//! Error signatures that identify an optional capability as unavailable.
//!
//! A signature pairs a capability name (such as `vector`) with a substring
//! that appears in the initialization error raised when the backend refuses
//! to enable that capability. Matching is case-insensitive and deliberately
//! narrow: patterns that are too short or built only from generic failure
//! vocabulary are rejected when the set is built, so an unrelated fatal error
//! can never be mistaken for a missing optional feature.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum pattern length, in characters, accepted for a signature.
pub const MIN_PATTERN_LEN: usize = 12;

/// Words that on their own describe any failure and so never identify one.
const GENERIC_WORDS: &[&str] = &[
    "error",
    "errors",
    "failed",
    "failure",
    "fatal",
    "exception",
    "unavailable",
    "not",
    "available",
    "unknown",
    "could",
    "cannot",
    "unable",
    "the",
    "a",
    "an",
    "is",
    "to",
];

/// Declarative signature for an "optional capability unavailable" failure.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct DegradationSignature {
    /// Capability the backend refused to enable, e.g. `vector`.
    pub capability: String,
    /// Substring identifying the refusal in the error message.
    pub pattern: String,
}

impl DegradationSignature {
    /// Creates a new signature.
    #[must_use]
    pub fn new(capability: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            pattern: pattern.into(),
        }
    }

    /// Returns true when `message` contains the signature pattern.
    #[must_use]
    pub fn matches(&self, message: &str) -> bool {
        message
            .to_lowercase()
            .contains(&normalise_pattern(&self.pattern))
    }
}

impl fmt::Display for DegradationSignature {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.capability, self.pattern)
    }
}

impl FromStr for DegradationSignature {
    type Err = SignatureError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (capability, pattern) = input
            .split_once(':')
            .ok_or_else(|| SignatureError::MissingCapability(input.to_owned()))?;
        let signature = Self::new(normalise_key(capability), pattern.trim());
        validate(&signature)?;
        Ok(signature)
    }
}

/// Errors produced when a signature is malformed or too broad.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    /// Capability separator (`:`) was missing.
    #[error("signature '{0}' is missing the capability separator ':'")]
    MissingCapability(String),
    /// The capability name was blank.
    #[error("signature for pattern '{0}' names no capability")]
    EmptyCapability(String),
    /// The pattern is shorter than [`MIN_PATTERN_LEN`].
    #[error("signature pattern '{pattern}' is shorter than {min} characters")]
    TooShort {
        /// Offending pattern.
        pattern: String,
        /// Minimum accepted length.
        min: usize,
    },
    /// The pattern only contains generic failure words.
    #[error("signature pattern '{0}' only contains generic failure words")]
    Generic(String),
}

/// Validated, normalised set of degradation signatures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureSet {
    signatures: Vec<DegradationSignature>,
}

impl SignatureSet {
    /// Builds a set from declarations, keeping the last entry per key.
    pub fn from_signatures<'a, I>(signatures: I) -> Result<Self, SignatureError>
    where
        I: IntoIterator<Item = &'a DegradationSignature>,
    {
        let mut merged: Vec<DegradationSignature> = Vec::new();
        for declared in signatures {
            validate(declared)?;
            let signature = DegradationSignature::new(
                normalise_key(&declared.capability),
                normalise_pattern(&declared.pattern),
            );
            merged.retain(|existing| existing != &signature);
            merged.push(signature);
        }
        Ok(Self { signatures: merged })
    }

    /// Returns the first signature matching `message`, if any.
    #[must_use]
    pub fn matching(&self, message: &str) -> Option<&DegradationSignature> {
        self.signatures
            .iter()
            .find(|signature| signature.matches(message))
    }

    /// Returns the number of signatures in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Returns true when the set has no signatures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

fn validate(signature: &DegradationSignature) -> Result<(), SignatureError> {
    let pattern = normalise_pattern(&signature.pattern);
    if normalise_key(&signature.capability).is_empty() {
        return Err(SignatureError::EmptyCapability(pattern));
    }
    if pattern.chars().count() < MIN_PATTERN_LEN {
        return Err(SignatureError::TooShort {
            pattern,
            min: MIN_PATTERN_LEN,
        });
    }
    let only_generic = pattern
        .split(|ch: char| !ch.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .all(|word| GENERIC_WORDS.contains(&word));
    if only_generic {
        return Err(SignatureError::Generic(pattern));
    }
    Ok(())
}

fn normalise_key(key: &str) -> String {
    key.trim().to_lowercase()
}

fn normalise_pattern(pattern: &str) -> String {
    pattern.trim().to_lowercase()
}
