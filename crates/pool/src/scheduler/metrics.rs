use std::time::Duration;

use serde::Serialize;

/// Counters collected over a single run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunMetrics {
    /// Parallelism after clamping to the task count.
    pub effective_parallelism: usize,
    /// Number of `start()` calls that succeeded.
    pub tasks_started: usize,
    /// Tasks removed from the running set after reporting not-running.
    pub tasks_reaped: usize,
    /// Tasks sent a stop signal by the scheduler.
    pub tasks_stopped: usize,
    /// Completed poll ticks.
    pub ticks: u64,
    /// Largest running-set size observed.
    pub peak_running: usize,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
}

impl RunMetrics {
    pub(crate) fn new(effective_parallelism: usize) -> Self {
        Self {
            effective_parallelism,
            ..Self::default()
        }
    }

    pub(crate) fn record_start(&mut self, running: usize) {
        self.tasks_started += 1;
        self.peak_running = self.peak_running.max(running);
    }
}
