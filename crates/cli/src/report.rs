use procpool::{RunMetrics, RunOutcome, StatusHandle, TaskState, TaskStatus};
use serde::Serialize;

/// Exit code used when the run was aborted by a signal.
pub const EXIT_ABORTED: i32 = 130;

/// End-of-run report: how the run ended and what happened to each task.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub outcome: Option<RunOutcome>,
    pub error: Option<String>,
    pub metrics: Option<RunMetrics>,
    pub tasks: Vec<TaskStatus>,
}

impl RunSummary {
    pub fn collect(
        result: Result<RunOutcome, String>,
        statuses: &[StatusHandle],
        metrics: Option<&RunMetrics>,
    ) -> Self {
        let (outcome, error) = match result {
            Ok(outcome) => (Some(outcome), None),
            Err(e) => (None, Some(e)),
        };
        Self {
            outcome,
            error,
            metrics: metrics.cloned(),
            tasks: statuses.iter().map(StatusHandle::snapshot).collect(),
        }
    }

    /// 0 when every task exited successfully, 130 on abort, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            Some(RunOutcome::Aborted) => EXIT_ABORTED,
            Some(RunOutcome::Completed) if self.tasks.iter().all(TaskStatus::succeeded) => 0,
            _ => 1,
        }
    }

    pub fn print_table(&self) {
        let width = self.tasks.iter().map(|t| t.name.len()).max().unwrap_or(4).max(4);

        println!();
        println!("{:<width$}  {:<10}  {:>6}  {:>10}", "TASK", "STATE", "CODE", "DURATION");
        for task in &self.tasks {
            let (state, code) = describe(&task.state);
            let duration = task
                .duration()
                .map(|d| format!("{}ms", d.num_milliseconds()))
                .unwrap_or_else(|| "-".to_string());
            println!("{:<width$}  {:<10}  {:>6}  {:>10}", task.name, state, code, duration);
        }

        match (&self.outcome, &self.error) {
            (Some(outcome), _) => println!("\nrun {outcome}"),
            (None, Some(error)) => println!("\nrun failed: {error}"),
            (None, None) => {}
        }
        if let Some(m) = &self.metrics {
            println!(
                "started={} stopped={} peak_running={} elapsed={}ms",
                m.tasks_started,
                m.tasks_stopped,
                m.peak_running,
                m.elapsed.as_millis()
            );
        }
    }
}

fn describe(state: &TaskState) -> (&'static str, String) {
    let code = |c: &Option<i32>| c.map_or_else(|| "-".to_string(), |c| c.to_string());
    match state {
        TaskState::Pending => ("pending", "-".into()),
        TaskState::Running { .. } => ("running", "-".into()),
        TaskState::Exited { code: c } => ("exited", code(c)),
        TaskState::Stopped { forced: true, code: c } => ("killed", code(c)),
        TaskState::Stopped { forced: false, code: c } => ("stopped", code(c)),
        TaskState::LaunchFailed { .. } => ("failed", "-".into()),
    }
}
