//! RB-007: Poll loop: retry a probe until it succeeds or a bound is hit.
//!
//! The first probe always runs. After each failed probe the loop checks its
//! bounds (elapsed time, attempt count) and only then sleeps, so a probe
//! that succeeds immediately never sleeps and a timed-out loop never sleeps
//! after its last attempt. Probes are strictly sequential.

use super::clock::Clock;
use super::error::RunbookError;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// How a poll loop finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Succeeded { attempts: u32 },
    TimedOut { attempts: u32, reason: GiveUp },
}

/// Which bound ended polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GiveUp {
    Deadline(Duration),
    Attempts(u32),
}

pub struct PollLoop<'a> {
    clock: &'a dyn Clock,
    interval: Duration,
    /// Zero means no deadline
    timeout: Duration,
    /// Zero means no attempt bound
    max_attempts: u32,
}

impl<'a> PollLoop<'a> {
    pub fn new(clock: &'a dyn Clock, interval: Duration, timeout: Duration) -> Self {
        Self {
            clock,
            interval,
            timeout,
            max_attempts: 0,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Drive `probe` until it returns true or a bound is reached.
    /// Errors from the probe end the loop immediately.
    pub fn run<F>(&self, mut probe: F) -> Result<PollOutcome, RunbookError>
    where
        F: FnMut() -> Result<bool, RunbookError>,
    {
        let started: Option<Instant> = (!self.timeout.is_zero()).then(|| self.clock.now());
        let mut attempts = 0u32;

        loop {
            attempts = attempts.saturating_add(1);
            if probe()? {
                debug!(attempts, "probe succeeded");
                return Ok(PollOutcome::Succeeded { attempts });
            }

            if let Some(started) = started {
                let elapsed = self.clock.now().saturating_duration_since(started);
                if elapsed >= self.timeout {
                    debug!(attempts, ?elapsed, "poll deadline reached");
                    return Ok(PollOutcome::TimedOut {
                        attempts,
                        reason: GiveUp::Deadline(elapsed),
                    });
                }
            }

            if self.max_attempts > 0 && attempts >= self.max_attempts {
                debug!(attempts, "poll attempts exhausted");
                return Ok(PollOutcome::TimedOut {
                    attempts,
                    reason: GiveUp::Attempts(attempts),
                });
            }

            trace!(attempts, interval = ?self.interval, "probe failed, sleeping");
            self.clock.sleep(self.interval);
        }
    }
}
