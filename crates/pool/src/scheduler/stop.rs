use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::info;

/// Cloneable handle that aborts an in-progress run from outside the poll loop,
/// e.g. from a signal handler task.
///
/// The run that observes the request stops its running tasks with the
/// scheduler's stop timeout and returns [`RunOutcome::Aborted`](crate::RunOutcome::Aborted).
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    inner: Arc<StopState>,
}

#[derive(Debug, Default)]
struct StopState {
    requested: AtomicBool,
    notify: Notify,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the current (or next) run to stop all running tasks and return.
    pub fn request_stop(&self) {
        info!("pool stop requested");
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Clear the request. Returns whether one was pending.
    pub(crate) fn take(&self) -> bool {
        self.inner.requested.swap(false, Ordering::SeqCst)
    }

    /// Sleep for `interval`, waking early if a stop is requested.
    /// Returns `true` when a stop request is pending.
    pub(crate) async fn sleep(&self, interval: Duration) -> bool {
        let deadline = tokio::time::sleep(interval);
        tokio::pin!(deadline);

        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_requested() {
                return true;
            }

            tokio::select! {
                _ = &mut deadline => return self.is_requested(),
                _ = notified => {}
            }
        }
    }
}
