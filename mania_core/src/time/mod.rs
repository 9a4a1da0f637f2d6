pub mod clock;

use std::time::Instant;

pub use clock::{Clock, ClockPhase, ClockSample};

/// Milliseconds. Chart times, logical time and injected wall time all use this unit.
pub type Millis = i64;

/// Source of monotonic wall time fed to [`Clock`]. Tests drive time by hand instead.
pub trait TimeSource {
    fn now(&self) -> Millis;
}

/// Milliseconds elapsed since construction, from [`Instant`].
#[derive(Debug, Clone, Copy)]
pub struct MonotonicSource {
    origin: Instant,
}

impl MonotonicSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicSource {
    fn now(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}
