use std::time::Duration;

use tracing::debug;

use crate::scheduler::conditional::Predicate;
use crate::scheduler::metrics::RunMetrics;
use crate::scheduler::stop::StopHandle;
use crate::scheduler::task::Runnable;
use crate::scheduler::types::SchedulerConfig;

/// Runs a fixed set of [`Runnable`]s with bounded parallelism.
///
/// The scheduler keeps at most `max_parallel` tasks running, polls them on a
/// fixed interval, and starts the next queued task as soon as one finishes.
/// Registered conditionals are evaluated every tick; the first one that
/// returns `false` stops every running task and ends the run.
pub struct PoolScheduler {
    pub(super) config: SchedulerConfig,
    /// Gating conditions, evaluated in registration order. Persist across runs.
    pub(super) conditionals: Vec<Box<dyn Predicate>>,
    /// Tasks started by the current (or last failed) run and not yet reaped.
    pub(super) running: Vec<Box<dyn Runnable>>,
    pub(super) stop: StopHandle,
    pub(super) last_metrics: Option<RunMetrics>,
}

impl PoolScheduler {
    /// Create a scheduler with default settings.
    pub fn new() -> Self {
        Self::from_config(SchedulerConfig::default())
    }

    pub fn from_config(config: SchedulerConfig) -> Self {
        Self {
            config,
            conditionals: Vec::new(),
            running: Vec::new(),
            stop: StopHandle::new(),
            last_metrics: None,
        }
    }

    /// Parallelism used by [`run`](Self::run).
    pub fn with_max_parallel(mut self, max_parallel: i64) -> Self {
        self.config.max_parallel = max_parallel;
        self
    }

    /// Poll interval used when a run does not specify one.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Grace period given to running tasks when a run is vetoed or aborted.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.config.stop_timeout = timeout;
        self
    }

    /// Register a condition that must keep returning `true` for runs to continue.
    pub fn add_conditional(&mut self, predicate: impl Predicate + 'static) -> &mut Self {
        self.add_boxed_conditional(Box::new(predicate))
    }

    /// [`add_conditional`](Self::add_conditional) for an already boxed predicate.
    pub fn add_boxed_conditional(&mut self, predicate: Box<dyn Predicate>) -> &mut Self {
        self.conditionals.push(predicate);
        debug!(count = self.conditionals.len(), "conditional registered");
        self
    }

    /// Drop every registered conditional.
    pub fn clear_conditionals(&mut self) {
        self.conditionals.clear();
    }

    pub fn conditional_count(&self) -> usize {
        self.conditionals.len()
    }

    /// Number of tasks the scheduler currently believes are running.
    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Handle for aborting a run from another task.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Metrics of the most recent run, including failed ones.
    pub fn last_run_metrics(&self) -> Option<&RunMetrics> {
        self.last_metrics.as_ref()
    }
}

impl Default for PoolScheduler {
    fn default() -> Self {
        Self::new()
    }
}
