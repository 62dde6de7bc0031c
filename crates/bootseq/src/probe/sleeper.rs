use std::thread;
use std::time::{Duration, Instant};

use crate::process::TerminationFlag;

/// Granularity at which [`CancellableSleeper`] checks for termination.
pub const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Sleep interrupted by a termination signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interrupted {
    /// Signal that ended the wait.
    pub signal: i32,
}

/// Waits between readiness attempts.
pub trait Sleeper {
    /// Blocks for `duration` unless a termination signal arrives first.
    fn sleep(&self, duration: Duration) -> Result<(), Interrupted>;
}

impl<T> Sleeper for Box<T>
where
    T: Sleeper + ?Sized,
{
    fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        (**self).sleep(duration)
    }
}

/// Sleeper that wakes up early when the termination flag is raised.
#[derive(Debug, Clone)]
pub struct CancellableSleeper {
    flag: TerminationFlag,
}

impl CancellableSleeper {
    /// Builds a sleeper observing `flag`.
    #[must_use]
    pub fn new(flag: TerminationFlag) -> Self {
        Self { flag }
    }
}

impl Sleeper for CancellableSleeper {
    fn sleep(&self, duration: Duration) -> Result<(), Interrupted> {
        let deadline = Instant::now() + duration;
        loop {
            if let Some(signal) = self.flag.raised() {
                return Err(Interrupted { signal });
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(());
            }
            thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }
}
