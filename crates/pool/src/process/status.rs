use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle state of a [`ProcessTask`](super::ProcessTask).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskState {
    Pending,
    Running { pid: Option<u32> },
    /// Exited on its own. `code` is `None` when killed by a signal.
    Exited { code: Option<i32> },
    /// Stopped by the pool; `forced` when the grace period ran out.
    Stopped { forced: bool, code: Option<i32> },
    LaunchFailed { reason: String },
}

/// Point-in-time view of a task's progress.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    pub name: String,
    #[serde(flatten)]
    pub state: TaskState,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskStatus {
    fn pending(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: TaskState::Pending,
            started_at: None,
            finished_at: None,
        }
    }

    /// Exited on its own with code 0.
    pub fn succeeded(&self) -> bool {
        matches!(self.state, TaskState::Exited { code: Some(0) })
    }

    pub fn is_finished(&self) -> bool {
        !matches!(self.state, TaskState::Pending | TaskState::Running { .. })
    }

    /// Time between start and finish, if both happened.
    pub fn duration(&self) -> Option<chrono::Duration> {
        Some(self.finished_at? - self.started_at?)
    }
}

/// Shared view of a task's [`TaskStatus`] that stays readable after the task
/// has been handed to the scheduler.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    inner: Arc<RwLock<TaskStatus>>,
}

impl StatusHandle {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            inner: Arc::new(RwLock::new(TaskStatus::pending(name))),
        }
    }

    pub fn snapshot(&self) -> TaskStatus {
        match self.inner.read() {
            Ok(status) => status.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn state(&self) -> TaskState {
        self.snapshot().state
    }

    pub(crate) fn mark_running(&self, pid: Option<u32>) {
        if let Ok(mut status) = self.inner.write() {
            status.state = TaskState::Running { pid };
            status.started_at = Some(Utc::now());
        }
    }

    pub(crate) fn mark_finished(&self, state: TaskState) {
        if let Ok(mut status) = self.inner.write() {
            status.state = state;
            status.finished_at = Some(Utc::now());
        }
    }
}
