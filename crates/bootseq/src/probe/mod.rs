//! Readiness prober.
//!
//! Each dependency target is attempted up to its attempt budget, sleeping
//! between attempts. Exhausting a budget is reported and the boot carries on;
//! the initialization stage fails on its own if a backend is really missing.
//! Targets not selected by the environment, or with no host from a host
//! variable, a URL variable or a default, are skipped without an attempt.
//! Targets are probed one after another in profile order.

use std::sync::Arc;
use std::time::Duration;

use bootseq_config::{EndpointError, ProbeEndpoint, TargetSpec, url_authority};
use thiserror::Error;

use crate::env::EnvSource;
use crate::health::BootReporter;

mod check;
mod sleeper;

pub use check::{NetworkProbe, ProbeFailure, ReadinessProbe};
pub use sleeper::{CancellableSleeper, Interrupted, SLEEP_SLICE, Sleeper};

/// One external backend to wait for, resolved against the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyTarget {
    name: String,
    endpoint: Option<ProbeEndpoint>,
    max_attempts: u32,
    delay: Duration,
    timeout: Duration,
}

impl DependencyTarget {
    /// Builds a target directly; `endpoint` is `None` for unconfigured targets.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        endpoint: Option<ProbeEndpoint>,
        max_attempts: u32,
        delay: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint,
            max_attempts,
            delay,
            timeout,
        }
    }

    /// Resolves a profile declaration against the environment.
    ///
    /// Disabled targets and targets with no host resolve without an endpoint.
    pub fn resolve(spec: &TargetSpec, env: &dyn EnvSource) -> Result<Self, TargetError> {
        let endpoint = if spec.is_enabled(|variable| env.value(variable)) {
            locate(spec, env)?
        } else {
            None
        };
        Ok(Self::new(
            spec.name.trim(),
            endpoint,
            spec.max_attempts,
            Duration::from_millis(spec.delay_ms),
            Duration::from_millis(spec.timeout_ms),
        ))
    }

    /// Logical name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Address and check, when configured.
    #[must_use]
    pub const fn endpoint(&self) -> Option<&ProbeEndpoint> {
        self.endpoint.as_ref()
    }

    /// Attempt budget.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Timeout for one attempt.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn locate(spec: &TargetSpec, env: &dyn EnvSource) -> Result<Option<ProbeEndpoint>, TargetError> {
    let endpoint = |host: String, url_port: Option<u16>| -> Result<_, TargetError> {
        let port = resolve_port(spec, env)?
            .or(url_port)
            .unwrap_or(spec.default_port);
        Ok(Some(ProbeEndpoint::new(host, port, spec.check.clone())))
    };

    if let Some(host) = spec.host_env.as_deref().and_then(|variable| env.value(variable)) {
        return endpoint(host, None);
    }
    let url = spec
        .url_env
        .as_deref()
        .and_then(|variable| env.value(variable).map(|value| (variable, value)));
    if let Some((variable, value)) = url {
        let (host, port) = url_authority(&value).map_err(|source| TargetError::InvalidUrl {
            target: spec.name.clone(),
            variable: variable.to_owned(),
            source,
        })?;
        return endpoint(host, port);
    }
    match spec.default_host.as_deref().map(str::trim) {
        Some(host) if !host.is_empty() => endpoint(host.to_owned(), None),
        _ => Ok(None),
    }
}

fn resolve_port(spec: &TargetSpec, env: &dyn EnvSource) -> Result<Option<u16>, TargetError> {
    let Some(variable) = spec.port_env.as_deref() else {
        return Ok(None);
    };
    env.value(variable)
        .map(|value| {
            value
                .parse::<u16>()
                .map_err(|source| TargetError::InvalidPort {
                    target: spec.name.clone(),
                    variable: variable.to_owned(),
                    value,
                    source,
                })
        })
        .transpose()
}

/// Resolves every profile target, in declaration order.
pub fn resolve_targets(
    specs: &[TargetSpec],
    env: &dyn EnvSource,
) -> Result<Vec<DependencyTarget>, TargetError> {
    specs
        .iter()
        .map(|spec| DependencyTarget::resolve(spec, env))
        .collect()
}

/// Errors raised while resolving targets from the environment.
#[derive(Debug, Error)]
pub enum TargetError {
    /// A port variable did not hold a valid port number.
    #[error("target '{target}': {variable}='{value}' is not a valid port: {source}")]
    InvalidPort {
        /// Target being resolved.
        target: String,
        /// Port variable name.
        variable: String,
        /// Offending value.
        value: String,
        /// Parse failure.
        #[source]
        source: std::num::ParseIntError,
    },
    /// A URL variable did not name a host.
    #[error("target '{target}': {variable}: {source}")]
    InvalidUrl {
        /// Target being resolved.
        target: String,
        /// URL variable name.
        variable: String,
        /// Parse failure.
        #[source]
        source: EndpointError,
    },
}

/// Result of probing one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The target has no configured address.
    Skipped,
    /// The target answered on attempt `attempts`.
    Ready {
        /// Attempts performed, including the successful one.
        attempts: u32,
    },
    /// The attempt budget ran out.
    Exhausted {
        /// Attempts performed.
        attempts: u32,
        /// Message of the final failure.
        last_error: String,
    },
}

/// Outcome for a named target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    /// Target name.
    pub target: String,
    /// What happened.
    pub outcome: ProbeOutcome,
}

/// Errors that stop probing altogether.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbeError {
    /// A termination signal arrived while waiting.
    #[error("probing '{target}' interrupted by signal {signal}")]
    Interrupted {
        /// Target being waited on.
        target: String,
        /// Signal received.
        signal: i32,
    },
}

/// Bounded-retry prober.
pub struct Prober<P, S> {
    probe: P,
    sleeper: S,
    reporter: Arc<dyn BootReporter>,
}

impl<P, S> Prober<P, S>
where
    P: ReadinessProbe,
    S: Sleeper,
{
    /// Builds a prober from its collaborators.
    pub fn new(probe: P, sleeper: S, reporter: Arc<dyn BootReporter>) -> Self {
        Self {
            probe,
            sleeper,
            reporter,
        }
    }

    /// Probes every target in order.
    pub fn probe_all(&self, targets: &[DependencyTarget]) -> Result<Vec<ProbeReport>, ProbeError> {
        targets
            .iter()
            .map(|target| {
                self.probe_target(target).map(|outcome| ProbeReport {
                    target: target.name().to_owned(),
                    outcome,
                })
            })
            .collect()
    }

    /// Probes a single target until it is ready or its budget runs out.
    pub fn probe_target(&self, target: &DependencyTarget) -> Result<ProbeOutcome, ProbeError> {
        let Some(endpoint) = target.endpoint() else {
            self.reporter.probe_skipped(target);
            return Ok(ProbeOutcome::Skipped);
        };

        let mut last_failure = None;
        for attempt in 1..=target.max_attempts() {
            match self.probe.check(endpoint, target.timeout()) {
                Ok(()) => {
                    self.reporter.probe_ready(target, attempt);
                    return Ok(ProbeOutcome::Ready { attempts: attempt });
                }
                Err(failure) => {
                    self.reporter.probe_failed(target, attempt, &failure);
                    last_failure = Some(failure);
                }
            }
            if attempt < target.max_attempts() {
                self.sleeper
                    .sleep(target.delay())
                    .map_err(|Interrupted { signal }| ProbeError::Interrupted {
                        target: target.name().to_owned(),
                        signal,
                    })?;
            }
        }

        let last_error = last_failure
            .map(|failure| failure.to_string())
            .unwrap_or_default();
        self.reporter
            .probe_exhausted(target, target.max_attempts(), &last_error);
        Ok(ProbeOutcome::Exhausted {
            attempts: target.max_attempts(),
            last_error,
        })
    }
}
