use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Poll interval used when a run does not specify one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Grace period given to each task when the scheduler stops it.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// How a run ended. Errors are reported separately through `PoolError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Queue drained and every started task reported not-running.
    Completed,
    /// A conditional returned false; running tasks were stopped.
    Vetoed,
    /// A [`StopHandle`](crate::StopHandle) requested the run to end.
    Aborted,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Vetoed => "vetoed",
            RunOutcome::Aborted => "aborted",
        }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheduler settings used by [`PoolScheduler::run`](crate::PoolScheduler::run)
/// and for stopping tasks on veto or abort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Requested parallelism. Sign is ignored; clamped to the task count.
    pub max_parallel: i64,
    pub poll_interval: Duration,
    pub stop_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            max_parallel: cpus as i64,
            poll_interval: DEFAULT_POLL_INTERVAL,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }
}

/// Effective parallelism for `task_count` tasks: `min(|requested|, task_count)`,
/// never zero while tasks exist.
pub fn clamp_parallelism(requested: i64, task_count: usize) -> usize {
    let wanted = usize::try_from(requested.unsigned_abs()).unwrap_or(usize::MAX);
    wanted.min(task_count).max(task_count.min(1))
}
