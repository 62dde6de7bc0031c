use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::{Host, Url};

/// Status code expected from HTTP readiness paths when the profile omits one.
pub const DEFAULT_EXPECTED_STATUS: u16 = 200;

/// Declarative readiness check for a dependency target.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReadinessCheck {
    /// The target is ready once a TCP connection succeeds.
    Tcp,
    /// The target is ready once `GET path` answers with `expected_status`.
    Http {
        /// Readiness path, e.g. `/readyz`.
        path: String,
        /// Status code that signals readiness.
        #[serde(default = "default_expected_status")]
        expected_status: u16,
    },
}

impl ReadinessCheck {
    /// Builds an HTTP check against `path` expecting `expected_status`.
    #[must_use]
    pub fn http(path: impl Into<String>, expected_status: u16) -> Self {
        Self::Http {
            path: path.into(),
            expected_status,
        }
    }
}

const fn default_expected_status() -> u16 {
    DEFAULT_EXPECTED_STATUS
}

/// Network address of a dependency paired with its readiness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeEndpoint {
    host: String,
    port: u16,
    check: ReadinessCheck,
}

impl ProbeEndpoint {
    /// Builds an endpoint probed with a bare TCP connect.
    #[must_use]
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::new(host, port, ReadinessCheck::Tcp)
    }

    /// Builds an endpoint probed with the supplied check.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, check: ReadinessCheck) -> Self {
        Self {
            host: host.into(),
            port,
            check,
        }
    }

    /// Host name or address of the dependency.
    #[must_use]
    pub fn host(&self) -> &str {
        self.host.as_str()
    }

    /// Port of the dependency.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Readiness check applied to the endpoint.
    #[must_use]
    pub const fn check(&self) -> &ReadinessCheck {
        &self.check
    }

    /// Builds the URL requested by HTTP readiness checks.
    ///
    /// Returns `None` for TCP endpoints.
    pub fn readiness_url(&self) -> Result<Option<Url>, EndpointError> {
        let ReadinessCheck::Http { path, .. } = &self.check else {
            return Ok(None);
        };
        let base = Url::parse(&format!("http://{}:{}/", self.bracketed_host(), self.port))
            .map_err(|source| EndpointError::InvalidUrl {
                endpoint: self.to_string(),
                source,
            })?;
        let url = base
            .join(path.trim_start_matches('/'))
            .map_err(|source| EndpointError::InvalidUrl {
                endpoint: self.to_string(),
                source,
            })?;
        Ok(Some(url))
    }

    fn bracketed_host(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

impl fmt::Display for ProbeEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.check {
            ReadinessCheck::Tcp => write!(formatter, "tcp://{}:{}", self.bracketed_host(), self.port),
            ReadinessCheck::Http { path, .. } => write!(
                formatter,
                "http://{}:{}/{}",
                self.bracketed_host(),
                self.port,
                path.trim_start_matches('/')
            ),
        }
    }
}

/// Host and port named by a service URL such as `http://qdrant:6333`.
///
/// The port is the URL's explicit port or its scheme's default, when known.
pub fn url_authority(text: &str) -> Result<(String, Option<u16>), EndpointError> {
    let url = Url::parse(text).map_err(|source| EndpointError::UnparsableUrl {
        value: text.to_owned(),
        source,
    })?;
    let host = match url.host() {
        Some(Host::Domain(domain)) => domain.to_owned(),
        Some(Host::Ipv4(address)) => address.to_string(),
        Some(Host::Ipv6(address)) => address.to_string(),
        None => {
            return Err(EndpointError::MissingHost {
                value: text.to_owned(),
            });
        }
    };
    Ok((host, url.port_or_known_default()))
}

/// Errors raised while deriving readiness URLs.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// A service URL did not parse.
    #[error("'{value}' is not a valid URL: {source}")]
    UnparsableUrl {
        /// Offending value.
        value: String,
        /// Underlying URL error.
        #[source]
        source: url::ParseError,
    },
    /// A service URL names no host.
    #[error("URL '{value}' names no host")]
    MissingHost {
        /// Offending value.
        value: String,
    },
    /// The host, port and path did not form a valid URL.
    #[error("invalid readiness URL for '{endpoint}': {source}")]
    InvalidUrl {
        /// Endpoint that failed to render.
        endpoint: String,
        /// Underlying URL error.
        #[source]
        source: url::ParseError,
    },
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn display_tcp_endpoint() {
        let endpoint = ProbeEndpoint::tcp("postgres", 5432);
        assert_eq!(endpoint.to_string(), "tcp://postgres:5432");
    }

    #[test]
    fn http_url_joins_readiness_path() {
        let endpoint = ProbeEndpoint::new("qdrant", 6333, ReadinessCheck::http("/readyz", 200));
        let url = endpoint
            .readiness_url()
            .expect("url should build")
            .expect("http endpoints have a url");
        assert_eq!(url.as_str(), "http://qdrant:6333/readyz");
    }

    #[test]
    fn ipv6_hosts_are_bracketed() {
        let endpoint = ProbeEndpoint::new("::1", 8080, ReadinessCheck::http("health", 204));
        let url = endpoint
            .readiness_url()
            .expect("url should build")
            .expect("http endpoints have a url");
        assert_eq!(url.as_str(), "http://[::1]:8080/health");
    }

    #[rstest]
    #[case("http://vectors:6333", "vectors", Some(6333))]
    #[case("https://qdrant.example.com", "qdrant.example.com", Some(443))]
    #[case("http://[::1]:6334/", "::1", Some(6334))]
    fn service_urls_yield_host_and_port(
        #[case] text: &str,
        #[case] host: &str,
        #[case] port: Option<u16>,
    ) {
        assert_eq!(
            url_authority(text).expect("valid URL"),
            (host.to_owned(), port)
        );
    }

    #[rstest]
    #[case("vectors:6333")]
    #[case("not a url")]
    #[case("unix:/run/qdrant.sock")]
    fn unusable_service_urls_are_rejected(#[case] text: &str) {
        assert!(url_authority(text).is_err(), "{text}");
    }

    #[test]
    fn http_check_defaults_expected_status() {
        let check: ReadinessCheck =
            serde_json::from_str(r#"{"kind":"http","path":"/readyz"}"#).expect("parse check");
        assert_eq!(check, ReadinessCheck::http("/readyz", DEFAULT_EXPECTED_STATUS));
    }
}
