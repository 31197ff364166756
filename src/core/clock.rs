//! RB-004: Clock capability for poll loops.
//!
//! Production code uses the monotonic system clock and a real sleep; tests
//! substitute a fake so timeout behaviour is deterministic.

use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Monotonic wall clock with blocking sleep.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}
