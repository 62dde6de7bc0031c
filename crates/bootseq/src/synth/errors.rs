use std::fmt;
use std::io;
use std::num::ParseIntError;

use camino::Utf8PathBuf;
use thiserror::Error;

/// A required parameter absent from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingParameter {
    /// Environment variable that must be set.
    pub variable: String,
    /// Provider selection that requires it.
    pub required_by: String,
}

impl fmt::Display for MissingParameter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} (required by {})", self.variable, self.required_by)
    }
}

/// Misconfigurations detected while resolving the runtime configuration.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// Selected providers lack required parameters.
    #[error("missing required configuration: {}", join(missing))]
    MissingParameters {
        /// Every missing parameter, in resolution order.
        missing: Vec<MissingParameter>,
    },
    /// A provider selection names an unknown provider.
    #[error("{variable}='{value}' is not a known provider (expected one of: {expected})")]
    UnknownProvider {
        /// Selection variable.
        variable: String,
        /// Offending value.
        value: String,
        /// Accepted values.
        expected: String,
    },
    /// A numeric parameter did not parse.
    #[error("{variable}='{value}' is not a valid number: {source}")]
    InvalidNumber {
        /// Variable name.
        variable: String,
        /// Offending value.
        value: String,
        /// Parse failure.
        #[source]
        source: ParseIntError,
    },
    /// A value would break the line-oriented document format.
    #[error("{variable} must not contain line breaks")]
    MultilineValue {
        /// Variable name.
        variable: String,
    },
}

impl SynthesisError {
    /// Variables reported missing, empty for other errors.
    #[must_use]
    pub fn missing_variables(&self) -> Vec<&str> {
        match self {
            Self::MissingParameters { missing } => missing
                .iter()
                .map(|parameter| parameter.variable.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn join(missing: &[MissingParameter]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors raised while writing the runtime configuration document.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The document path has no parent directory.
    #[error("document path '{path}' has no parent directory")]
    MissingParent {
        /// Document path.
        path: Utf8PathBuf,
    },
    /// Creating the parent directory failed.
    #[error("failed to create directory '{path}': {source}")]
    CreateDirectory {
        /// Directory path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing or persisting the document failed.
    #[error("failed to write runtime configuration '{path}': {source}")]
    Persist {
        /// Document path.
        path: Utf8PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}
