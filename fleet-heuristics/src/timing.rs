//! Small timing helper used to report how long a phase took without
//! threading `std::time::Instant` bookkeeping through every call site.

use std::time::{Duration, Instant};

/// Measures the duration of a closure and reports it through a callback.
pub struct Timer;

impl Timer {
    /// Runs `action`, then calls `report` with the elapsed duration, and
    /// returns `action`'s result.
    pub fn measure_duration_with_callback<T>(
        action: impl FnOnce() -> T,
        report: impl FnOnce(Duration),
    ) -> T {
        let start = Instant::now();
        let result = action();
        report(start.elapsed());
        result
    }
}

/// A wall-clock budget with a fixed start instant, used by the pipeline
/// orchestrator and the LNS/QUBO refiners to bound total running time.
#[derive(Clone, Copy, Debug)]
pub struct Budget {
    start: Instant,
    limit: Duration,
}

impl Budget {
    /// Creates a new budget starting now.
    pub fn new(limit: Duration) -> Self {
        Self { start: Instant::now(), limit }
    }

    /// Returns the elapsed time since the budget started.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Returns the remaining time, or `Duration::ZERO` if exhausted.
    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.elapsed())
    }

    /// Returns `true` once the limit has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.elapsed() >= self.limit
    }
}
