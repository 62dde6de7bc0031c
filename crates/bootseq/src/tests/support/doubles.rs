//! Scripted collaborators for the prober, guard and handoff stages.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bootseq_config::ProbeEndpoint;
use camino::{Utf8Path, Utf8PathBuf};

use crate::guard::{BackendInitializer, InitError};
use crate::probe::{Interrupted, ProbeFailure, ReadinessProbe, Sleeper};
use crate::process::{ExecPlan, Handoff, HandoffError, ProcessReplacer};

/// Probe whose hosts become ready after a scripted number of attempts.
///
/// Hosts without a script never become ready. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProbe {
    ready_on: Arc<Mutex<HashMap<String, u32>>>,
    attempts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProbe {
    /// Makes `host` answer from attempt `attempt` onwards.
    pub fn ready_on(&self, host: &str, attempt: u32) {
        self.ready_on
            .lock()
            .expect("probe script mutex poisoned")
            .insert(host.to_owned(), attempt);
    }

    /// Hosts checked so far, in order.
    #[must_use]
    pub fn attempts(&self) -> Vec<String> {
        self.attempts
            .lock()
            .expect("probe attempts mutex poisoned")
            .clone()
    }
}

impl ReadinessProbe for ScriptedProbe {
    fn check(&self, endpoint: &ProbeEndpoint, _timeout: Duration) -> Result<(), ProbeFailure> {
        let mut attempts = self.attempts.lock().expect("probe attempts mutex poisoned");
        attempts.push(endpoint.host().to_owned());
        let made = attempts
            .iter()
            .filter(|host| host.as_str() == endpoint.host())
            .count();
        let threshold = self
            .ready_on
            .lock()
            .expect("probe script mutex poisoned")
            .get(endpoint.host())
            .copied();
        match threshold {
            Some(ready) if made >= usize::try_from(ready).expect("attempt fits usize") => Ok(()),
            _ => Err(ProbeFailure::Connect {
                endpoint: endpoint.to_string(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
        }
    }
}

/// Sleeper that records requested delays without sleeping.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    sleeps: Arc<Mutex<Vec<Duration>>>,
    interrupt_with: Arc<Mutex<Option<i32>>>,
}

impl RecordingSleeper {
    /// Makes every following sleep report `signal`.
    pub fn interrupt_with(&self, signal: i32) {
        *self
            .interrupt_with
            .lock()
            .expect("sleeper mutex poisoned") = Some(signal);
    }

    /// Delays requested so far.
    #[must_use]
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("sleeper mutex poisoned").clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        self.sleeps
            .lock()
            .expect("sleeper mutex poisoned")
            .push(duration);
        match *self.interrupt_with.lock().expect("sleeper mutex poisoned") {
            Some(signal) => Err(Interrupted { signal }),
            None => Ok(()),
        }
    }
}

/// Initializer that succeeds or fails with a fixed message.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInitializer {
    failure: Arc<Mutex<Option<String>>>,
    documents: Arc<Mutex<Vec<Utf8PathBuf>>>,
}

impl ScriptedInitializer {
    /// Makes every call fail with `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().expect("initializer mutex poisoned") = Some(message.to_owned());
    }

    /// Documents passed to the initializer, one per call.
    #[must_use]
    pub fn calls(&self) -> Vec<Utf8PathBuf> {
        self.documents
            .lock()
            .expect("initializer mutex poisoned")
            .clone()
    }
}

impl BackendInitializer for ScriptedInitializer {
    fn initialize(&self, document: &Utf8Path) -> Result<(), InitError> {
        self.documents
            .lock()
            .expect("initializer mutex poisoned")
            .push(document.to_path_buf());
        match self
            .failure
            .lock()
            .expect("initializer mutex poisoned")
            .clone()
        {
            Some(message) => Err(InitError::new(message)),
            None => Ok(()),
        }
    }
}

/// Replacer that records the plan instead of executing it.
#[derive(Debug, Clone, Default)]
pub struct RecordingReplacer {
    plans: Arc<Mutex<Vec<ExecPlan>>>,
}

impl RecordingReplacer {
    /// Plans handed over so far.
    #[must_use]
    pub fn plans(&self) -> Vec<ExecPlan> {
        self.plans.lock().expect("replacer mutex poisoned").clone()
    }
}

impl ProcessReplacer for RecordingReplacer {
    fn replace(&self, plan: &ExecPlan) -> Result<Handoff, HandoffError> {
        self.plans
            .lock()
            .expect("replacer mutex poisoned")
            .push(plan.clone());
        Ok(Handoff::Replaced)
    }
}
