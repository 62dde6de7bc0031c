//! Readiness checks against a single endpoint.

use std::io;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use bootseq_config::{EndpointError, ProbeEndpoint, ReadinessCheck};
use reqwest::blocking::Client;
use thiserror::Error;

/// Reasons a single readiness attempt failed.
#[derive(Debug, Error)]
pub enum ProbeFailure {
    /// The host name did not resolve.
    #[error("failed to resolve {endpoint}: {source}")]
    Resolve {
        /// Endpoint being probed.
        endpoint: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The TCP connection was refused or timed out.
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        /// Endpoint being probed.
        endpoint: String,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The readiness URL could not be built.
    #[error(transparent)]
    Url(#[from] EndpointError),
    /// The HTTP request failed before a response arrived.
    #[error("readiness request to {endpoint} failed: {source}")]
    Request {
        /// Endpoint being probed.
        endpoint: String,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// The readiness path answered with an unexpected status.
    #[error("{endpoint} answered {actual}, expected {expected}")]
    UnexpectedStatus {
        /// Endpoint being probed.
        endpoint: String,
        /// Status the profile expects.
        expected: u16,
        /// Status received.
        actual: u16,
    },
}

/// A side-effect-free readiness check.
pub trait ReadinessProbe {
    /// Performs one attempt against `endpoint`, bounded by `timeout`.
    fn check(&self, endpoint: &ProbeEndpoint, timeout: Duration) -> Result<(), ProbeFailure>;
}

impl<T> ReadinessProbe for Box<T>
where
    T: ReadinessProbe + ?Sized,
{
    fn check(&self, endpoint: &ProbeEndpoint, timeout: Duration) -> Result<(), ProbeFailure> {
        (**self).check(endpoint, timeout)
    }
}

/// Probe that performs real TCP connects and HTTP requests.
#[derive(Debug, Clone)]
pub struct NetworkProbe {
    client: Client,
}

impl NetworkProbe {
    /// Builds a probe with a blocking HTTP client that does not follow
    /// redirects, so the status compared is the one the path returned.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { client })
    }
}

impl ReadinessProbe for NetworkProbe {
    fn check(&self, endpoint: &ProbeEndpoint, timeout: Duration) -> Result<(), ProbeFailure> {
        match endpoint.check() {
            ReadinessCheck::Tcp => connect(endpoint, timeout),
            ReadinessCheck::Http {
                expected_status, ..
            } => self.get(endpoint, *expected_status, timeout),
        }
    }
}

impl NetworkProbe {
    fn get(
        &self,
        endpoint: &ProbeEndpoint,
        expected: u16,
        timeout: Duration,
    ) -> Result<(), ProbeFailure> {
        let Some(url) = endpoint.readiness_url()? else {
            return connect(endpoint, timeout);
        };
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .map_err(|source| ProbeFailure::Request {
                endpoint: endpoint.to_string(),
                source,
            })?;
        let actual = response.status().as_u16();
        if actual == expected {
            Ok(())
        } else {
            Err(ProbeFailure::UnexpectedStatus {
                endpoint: endpoint.to_string(),
                expected,
                actual,
            })
        }
    }
}

fn connect(endpoint: &ProbeEndpoint, timeout: Duration) -> Result<(), ProbeFailure> {
    let addresses = (endpoint.host(), endpoint.port())
        .to_socket_addrs()
        .map_err(|source| ProbeFailure::Resolve {
            endpoint: endpoint.to_string(),
            source,
        })?;
    connect_any(addresses, timeout).map_err(|source| ProbeFailure::Connect {
        endpoint: endpoint.to_string(),
        source,
    })
}

/// Connects to each resolved address in turn; a name may resolve to an
/// address family the backend does not listen on.
fn connect_any(
    addresses: impl IntoIterator<Item = SocketAddr>,
    timeout: Duration,
) -> io::Result<()> {
    let mut last_error = None;
    for address in addresses {
        match TcpStream::connect_timeout(&address, timeout) {
            Ok(_) => return Ok(()),
            Err(error) => last_error = Some(error),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved address")
    }))
}
