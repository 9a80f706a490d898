use std::time::Duration;

use async_trait::async_trait;

use crate::error::LaunchError;

/// One externally executing unit of work the pool can start, probe, and stop.
///
/// The scheduler calls `start` at most once per task, probes `is_running`
/// once per poll tick, and calls `stop` only on tasks it still believes are
/// running. All calls come from the single control task driving the run.
#[async_trait]
pub trait Runnable: Send {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Begin asynchronous execution. Must not block until completion.
    fn start(&mut self) -> Result<(), LaunchError>;

    /// Non-blocking liveness probe.
    fn is_running(&mut self) -> bool;

    /// Request termination, forcing it if the task is still alive after `timeout`.
    async fn stop(&mut self, timeout: Duration);
}

#[async_trait]
impl<R: Runnable + ?Sized> Runnable for Box<R> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn start(&mut self) -> Result<(), LaunchError> {
        (**self).start()
    }

    fn is_running(&mut self) -> bool {
        (**self).is_running()
    }

    async fn stop(&mut self, timeout: Duration) {
        (**self).stop(timeout).await
    }
}
