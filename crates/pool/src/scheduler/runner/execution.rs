use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{LaunchError, PoolError};
use crate::scheduler::metrics::RunMetrics;
use crate::scheduler::task::Runnable;
use crate::scheduler::types::{clamp_parallelism, RunOutcome};

use super::PoolScheduler;

type TaskQueue = VecDeque<Box<dyn Runnable>>;

impl PoolScheduler {
    /// Run `tasks` with the configured parallelism and poll interval.
    pub async fn run<I, R>(&mut self, tasks: I) -> Result<RunOutcome, PoolError>
    where
        I: IntoIterator<Item = R>,
        R: Runnable + 'static,
    {
        let max_parallel = self.config.max_parallel;
        self.run_parallel(tasks, max_parallel, None).await
    }

    /// Run `tasks` with at most `max_parallel` of them running at once.
    ///
    /// Tasks start in submission order. The sign of `max_parallel` is ignored
    /// and the value is clamped to the task count (zero becomes one).
    /// `poll_interval` of `None` uses the scheduler's configured interval.
    ///
    /// Returns once every task has finished, a conditional vetoes the run, or
    /// a [`StopHandle`](crate::StopHandle) aborts it. A launch failure or a
    /// failing conditional is returned as an error; tasks already started stay
    /// running and can be stopped with
    /// [`stop_all_current_processes`](Self::stop_all_current_processes).
    pub async fn run_parallel<I, R>(
        &mut self,
        tasks: I,
        max_parallel: i64,
        poll_interval: Option<Duration>,
    ) -> Result<RunOutcome, PoolError>
    where
        I: IntoIterator<Item = R>,
        R: Runnable + 'static,
    {
        let mut queue: TaskQueue = tasks
            .into_iter()
            .map(|task| Box::new(task) as Box<dyn Runnable>)
            .collect();

        if queue.is_empty() {
            return Err(PoolError::InvalidArgument("cannot run zero tasks".into()));
        }

        let poll = poll_interval.unwrap_or(self.config.poll_interval);
        if poll.is_zero() {
            return Err(PoolError::InvalidArgument(
                "poll interval must be greater than zero".into(),
            ));
        }

        if !self.running.is_empty() {
            warn!(
                leftover = self.running.len(),
                "tasks from a previous run are still held, stopping them first"
            );
            let timeout = self.config.stop_timeout;
            self.stop_all_current_processes(timeout).await;
        }

        let run_id = Uuid::new_v4();
        let parallelism = clamp_parallelism(max_parallel, queue.len());
        let mut metrics = RunMetrics::new(parallelism);
        let started_at = Instant::now();

        info!(
            run_id = %run_id,
            tasks = queue.len(),
            max_parallel = parallelism,
            poll_ms = poll.as_millis() as u64,
            conditionals = self.conditionals.len(),
            "starting pool run"
        );

        let result = self.drive(&mut queue, parallelism, poll, &mut metrics).await;

        metrics.elapsed = started_at.elapsed();
        match &result {
            Ok(outcome) => info!(
                run_id = %run_id,
                outcome = %outcome,
                started = metrics.tasks_started,
                stopped = metrics.tasks_stopped,
                elapsed_ms = metrics.elapsed.as_millis() as u64,
                "pool run finished"
            ),
            Err(e) => warn!(
                run_id = %run_id,
                error = %e,
                still_running = self.running.len(),
                not_started = queue.len(),
                "pool run failed"
            ),
        }
        self.last_metrics = Some(metrics);

        result
    }

    /// Stop every task in the running set, giving each `timeout` to exit
    /// before it is forced. The running set is cleared afterwards regardless
    /// of how individual tasks ended. A no-op when nothing is running.
    pub async fn stop_all_current_processes(&mut self, timeout: Duration) {
        if self.running.is_empty() {
            debug!("no running tasks to stop");
            return;
        }

        info!(
            count = self.running.len(),
            timeout_ms = timeout.as_millis() as u64,
            "stopping running tasks"
        );

        futures::future::join_all(self.running.iter_mut().map(|task| task.stop(timeout))).await;
        self.running.clear();
    }

    /// Fill the initial batch, then poll until the run terminates.
    async fn drive(
        &mut self,
        queue: &mut TaskQueue,
        parallelism: usize,
        poll: Duration,
        metrics: &mut RunMetrics,
    ) -> Result<RunOutcome, PoolError> {
        if self.stop.take() {
            info!("stop requested before any task was started");
            return Ok(RunOutcome::Aborted);
        }

        for _ in 0..parallelism {
            if let Some(task) = queue.pop_front() {
                self.launch(task, metrics)?;
            }
        }

        loop {
            if self.stop.sleep(poll).await {
                self.stop.take();
                info!(running = self.running.len(), not_started = queue.len(), "run aborted");
                self.drain(metrics).await;
                return Ok(RunOutcome::Aborted);
            }
            metrics.ticks += 1;

            if let Some(index) = self.first_veto()? {
                info!(
                    conditional = index,
                    running = self.running.len(),
                    not_started = queue.len(),
                    "conditional vetoed run"
                );
                self.drain(metrics).await;
                return Ok(RunOutcome::Vetoed);
            }

            self.reap_and_refill(queue, metrics)?;

            if queue.is_empty() && self.running.is_empty() {
                return Ok(RunOutcome::Completed);
            }
        }
    }

    /// Evaluate conditionals in order. Returns the index of the first one that
    /// returned `false`; later conditionals are not evaluated.
    fn first_veto(&mut self) -> Result<Option<usize>, PoolError> {
        for (index, conditional) in self.conditionals.iter_mut().enumerate() {
            match conditional.evaluate() {
                Ok(true) => {}
                Ok(false) => return Ok(Some(index)),
                Err(source) => return Err(PoolError::Predicate { index, source }),
            }
        }
        Ok(None)
    }

    /// Remove finished tasks, starting the next queued task right after each
    /// removal. Tasks started during this pass are first probed next tick.
    fn reap_and_refill(
        &mut self,
        queue: &mut TaskQueue,
        metrics: &mut RunMetrics,
    ) -> Result<(), LaunchError> {
        let mut index = 0;
        let mut unchecked = self.running.len();

        while unchecked > 0 {
            unchecked -= 1;

            if self.running[index].is_running() {
                index += 1;
                continue;
            }

            let finished = self.running.remove(index);
            metrics.tasks_reaped += 1;
            debug!(task = finished.name(), "task finished");

            if let Some(next) = queue.pop_front() {
                self.launch(next, metrics)?;
            }
        }

        Ok(())
    }

    fn launch(
        &mut self,
        mut task: Box<dyn Runnable>,
        metrics: &mut RunMetrics,
    ) -> Result<(), LaunchError> {
        task.start()?;
        debug!(task = task.name(), "task started");
        self.running.push(task);
        metrics.record_start(self.running.len());
        Ok(())
    }

    async fn drain(&mut self, metrics: &mut RunMetrics) {
        metrics.tasks_stopped += self.running.len();
        let timeout = self.config.stop_timeout;
        self.stop_all_current_processes(timeout).await;
    }
}
