#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::error::{LaunchError, PoolError};
    use crate::scheduler::conditional::fallible;
    use crate::scheduler::runner::PoolScheduler;
    use crate::scheduler::task::Runnable;
    use crate::scheduler::types::RunOutcome;

    const POLL: Duration = Duration::from_millis(10);
    const STOP_TIMEOUT: Duration = Duration::from_millis(250);
    const FOREVER: u32 = u32::MAX;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Started(String),
        Stopped(String, Duration),
    }

    /// Shared record of everything the scheduler did to the mock tasks.
    #[derive(Default)]
    struct Probe {
        events: Mutex<Vec<Event>>,
        live: AtomicUsize,
        peak_live: AtomicUsize,
    }

    impl Probe {
        fn started(&self) -> Vec<String> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    Event::Started(name) => Some(name.clone()),
                    _ => None,
                })
                .collect()
        }

        fn stopped(&self) -> Vec<(String, Duration)> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .filter_map(|e| match e {
                    Event::Stopped(name, timeout) => Some((name.clone(), *timeout)),
                    _ => None,
                })
                .collect()
        }

        fn live(&self) -> usize {
            self.live.load(Ordering::SeqCst)
        }

        fn peak_live(&self) -> usize {
            self.peak_live.load(Ordering::SeqCst)
        }
    }

    /// Mock task that reports running for a fixed number of liveness probes.
    struct MockTask {
        name: String,
        polls_left: u32,
        started: bool,
        finished: bool,
        fail_start: bool,
        probe: Arc<Probe>,
    }

    impl MockTask {
        fn new(name: &str, polls: u32, probe: &Arc<Probe>) -> Self {
            Self {
                name: name.to_string(),
                polls_left: polls,
                started: false,
                finished: false,
                fail_start: false,
                probe: Arc::clone(probe),
            }
        }

        fn failing(name: &str, probe: &Arc<Probe>) -> Self {
            Self {
                fail_start: true,
                ..Self::new(name, 0, probe)
            }
        }

        fn finish(&mut self) {
            if self.started && !self.finished {
                self.finished = true;
                self.probe.live.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    #[async_trait]
    impl Runnable for MockTask {
        fn name(&self) -> &str {
            &self.name
        }

        fn start(&mut self) -> Result<(), LaunchError> {
            if self.fail_start {
                return Err(LaunchError::Rejected {
                    task: self.name.clone(),
                    reason: "mock refused".into(),
                });
            }
            if self.started {
                return Err(LaunchError::AlreadyStarted(self.name.clone()));
            }
            self.started = true;
            self.probe
                .events
                .lock()
                .unwrap()
                .push(Event::Started(self.name.clone()));
            let live = self.probe.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.probe.peak_live.fetch_max(live, Ordering::SeqCst);
            Ok(())
        }

        fn is_running(&mut self) -> bool {
            if !self.started || self.finished {
                return false;
            }
            if self.polls_left == 0 {
                self.finish();
                return false;
            }
            self.polls_left -= 1;
            true
        }

        async fn stop(&mut self, timeout: Duration) {
            self.probe
                .events
                .lock()
                .unwrap()
                .push(Event::Stopped(self.name.clone(), timeout));
            self.finish();
        }
    }

    fn tasks(count: usize, polls: u32, probe: &Arc<Probe>) -> Vec<MockTask> {
        (0..count)
            .map(|i| MockTask::new(&format!("t{i}"), polls, probe))
            .collect()
    }

    fn names(range: std::ops::Range<usize>) -> Vec<String> {
        range.map(|i| format!("t{i}")).collect()
    }

    fn scheduler() -> PoolScheduler {
        PoolScheduler::new()
            .with_poll_interval(POLL)
            .with_stop_timeout(STOP_TIMEOUT)
    }

    #[tokio::test(start_paused = true)]
    async fn five_tasks_two_parallel() {
        let probe = Arc::new(Probe::default());
        let mut pool = scheduler();

        let outcome = pool
            .run_parallel(tasks(5, 3, &probe), 2, Some(POLL))
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(probe.started(), names(0..5));
        assert!(probe.peak_live() <= 2, "peak live was {}", probe.peak_live());
        assert_eq!(probe.live(), 0, "run returned before every task finished");
        assert!(probe.stopped().is_empty());
        assert_eq!(pool.running_count(), 0);

        let metrics = pool.last_run_metrics().unwrap();
        assert_eq!(metrics.tasks_started, 5);
        assert_eq!(metrics.tasks_reaped, 5);
        assert_eq!(metrics.peak_running, 2);
        assert_eq!(metrics.effective_parallelism, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn whole_batch_starts_in_order_before_first_tick() {
        let probe = Arc::new(Probe::default());
        let seen_at_first_tick = Arc::new(Mutex::new(None));
        let mut pool = scheduler();

        let p = Arc::clone(&probe);
        let seen = Arc::clone(&seen_at_first_tick);
        pool.add_conditional(move || {
            seen.lock().unwrap().get_or_insert_with(|| p.started());
            true
        });

        let outcome = pool
            .run_parallel(tasks(4, 1, &probe), 10, Some(POLL))
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(seen_at_first_tick.lock().unwrap().clone(), Some(names(0..4)));
        assert_eq!(pool.last_run_metrics().unwrap().effective_parallelism, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn max_parallel_one_runs_sequentially() {
        let probe = Arc::new(Probe::default());
        let mut pool = scheduler();

        pool.run_parallel(tasks(4, 2, &probe), 1, Some(POLL))
            .await
            .unwrap();

        assert_eq!(probe.started(), names(0..4));
        assert_eq!(probe.peak_live(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn negative_max_parallel_uses_absolute_value() {
        let probe = Arc::new(Probe::default());
        let mut pool = scheduler();

        let outcome = pool
            .run_parallel(tasks(5, 2, &probe), -2, Some(POLL))
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(probe.started().len(), 5);
        assert_eq!(probe.peak_live(), 2);
        assert_eq!(pool.last_run_metrics().unwrap().effective_parallelism, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_max_parallel_runs_one_at_a_time() {
        let probe = Arc::new(Probe::default());
        let mut pool = scheduler();

        pool.run_parallel(tasks(3, 1, &probe), 0, Some(POLL))
            .await
            .unwrap();

        assert_eq!(probe.started(), names(0..3));
        assert_eq!(probe.peak_live(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_task_list_is_rejected() {
        let mut pool = scheduler();

        let err = pool
            .run_parallel(Vec::<MockTask>::new(), 2, Some(POLL))
            .await
            .unwrap_err();

        assert!(matches!(err, PoolError::InvalidArgument(ref m) if m == "cannot run zero tasks"));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_poll_interval_is_rejected_before_starting() {
        let probe = Arc::new(Probe::default());
        let mut pool = scheduler();

        let err = pool
            .run_parallel(tasks(2, 1, &probe), 2, Some(Duration::ZERO))
            .await
            .unwrap_err();

        assert!(matches!(err, PoolError::InvalidArgument(_)));
        assert!(probe.started().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn veto_stops_running_tasks_and_starts_nothing_more() {
        let probe = Arc::new(Probe::default());
        let evaluations = Arc::new(AtomicUsize::new(0));
        let mut pool = scheduler();

        let count = Arc::clone(&evaluations);
        pool.add_conditional(move || count.fetch_add(1, Ordering::SeqCst) < 2);

        let outcome = pool
            .run_parallel(tasks(5, FOREVER, &probe), 2, Some(POLL))
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Vetoed);
        assert_eq!(evaluations.load(Ordering::SeqCst), 3);
        assert_eq!(probe.started(), names(0..2));
        assert_eq!(
            probe.stopped(),
            vec![("t0".to_string(), STOP_TIMEOUT), ("t1".to_string(), STOP_TIMEOUT)]
        );
        assert_eq!(probe.live(), 0);
        assert_eq!(pool.running_count(), 0);
        assert_eq!(pool.last_run_metrics().unwrap().tasks_stopped, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn veto_after_refill_stops_the_replacement() {
        let probe = Arc::new(Probe::default());
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut pool = scheduler();

        let count = Arc::clone(&ticks);
        pool.add_conditional(move || count.fetch_add(1, Ordering::SeqCst) < 3);

        // t0 finishes on the first probe, t1 and t2 never finish.
        let mut batch = vec![MockTask::new("t0", 0, &probe)];
        batch.extend((1..4).map(|i| MockTask::new(&format!("t{i}"), FOREVER, &probe)));

        let outcome = pool.run_parallel(batch, 2, Some(POLL)).await.unwrap();

        assert_eq!(outcome, RunOutcome::Vetoed);
        assert_eq!(probe.started(), names(0..3));
        let stopped: Vec<String> = probe.stopped().into_iter().map(|(n, _)| n).collect();
        assert_eq!(stopped, vec!["t1".to_string(), "t2".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn conditionals_short_circuit_on_first_veto() {
        let probe = Arc::new(Probe::default());
        let third_calls = Arc::new(AtomicUsize::new(0));
        let mut pool = scheduler();

        let calls = Arc::clone(&third_calls);
        pool.add_conditional(|| true)
            .add_conditional(|| false)
            .add_conditional(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                true
            });

        let outcome = pool
            .run_parallel(tasks(2, FOREVER, &probe), 2, Some(POLL))
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Vetoed);
        assert_eq!(third_calls.load(Ordering::SeqCst), 0);
        assert_eq!(pool.conditional_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn conditionals_persist_across_runs() {
        let probe = Arc::new(Probe::default());
        let evaluations = Arc::new(AtomicUsize::new(0));
        let mut pool = scheduler();

        let count = Arc::clone(&evaluations);
        pool.add_conditional(move || {
            count.fetch_add(1, Ordering::SeqCst);
            true
        });

        pool.run_parallel(tasks(1, 0, &probe), 1, Some(POLL)).await.unwrap();
        let after_first = evaluations.load(Ordering::SeqCst);
        pool.run_parallel(tasks(1, 0, &probe), 1, Some(POLL)).await.unwrap();

        assert!(after_first >= 1);
        assert!(evaluations.load(Ordering::SeqCst) > after_first);

        pool.clear_conditionals();
        assert_eq!(pool.conditional_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_all_on_empty_running_set_is_noop() {
        let mut pool = scheduler();
        pool.stop_all_current_processes(STOP_TIMEOUT).await;
        pool.stop_all_current_processes(STOP_TIMEOUT).await;
        assert_eq!(pool.running_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn launch_failure_propagates_and_leaves_started_tasks_stoppable() {
        let probe = Arc::new(Probe::default());
        let mut pool = scheduler();

        let batch = vec![
            MockTask::new("t0", FOREVER, &probe),
            MockTask::new("t1", FOREVER, &probe),
            MockTask::failing("t2", &probe),
            MockTask::new("t3", FOREVER, &probe),
        ];

        let err = pool.run_parallel(batch, 3, Some(POLL)).await.unwrap_err();

        match err {
            PoolError::Launch(e) => assert_eq!(e.task(), "t2"),
            other => panic!("expected launch error, got {other:?}"),
        }
        assert_eq!(pool.running_count(), 2);
        assert!(probe.stopped().is_empty());

        pool.stop_all_current_processes(STOP_TIMEOUT).await;
        assert_eq!(probe.stopped().len(), 2);
        assert_eq!(probe.live(), 0);
        assert_eq!(pool.running_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn launch_failure_during_refill_propagates() {
        let probe = Arc::new(Probe::default());
        let mut pool = scheduler();

        let batch = vec![
            MockTask::new("t0", 0, &probe),
            MockTask::failing("t1", &probe),
        ];

        let err = pool.run_parallel(batch, 1, Some(POLL)).await.unwrap_err();

        assert!(matches!(err, PoolError::Launch(LaunchError::Rejected { .. })));
        assert_eq!(probe.started(), names(0..1));
        assert_eq!(pool.running_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn conditional_error_propagates_without_stopping() {
        let probe = Arc::new(Probe::default());
        let mut pool = scheduler();
        pool.add_conditional(|| true)
            .add_conditional(fallible(|| anyhow::bail!("metrics endpoint down")));

        let err = pool
            .run_parallel(tasks(2, FOREVER, &probe), 2, Some(POLL))
            .await
            .unwrap_err();

        assert!(matches!(err, PoolError::Predicate { index: 1, .. }));
        assert!(probe.stopped().is_empty());
        assert_eq!(pool.running_count(), 2);

        pool.stop_all_current_processes(STOP_TIMEOUT).await;
        assert_eq!(probe.live(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn leftover_tasks_are_stopped_before_next_run() {
        let probe = Arc::new(Probe::default());
        let mut pool = scheduler();

        let batch = vec![
            MockTask::new("t0", FOREVER, &probe),
            MockTask::failing("t1", &probe),
        ];
        assert!(pool.run_parallel(batch, 2, Some(POLL)).await.is_err());
        assert_eq!(pool.running_count(), 1);

        let outcome = pool
            .run_parallel(vec![MockTask::new("t2", 0, &probe)], 1, Some(POLL))
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(probe.stopped(), vec![("t0".to_string(), STOP_TIMEOUT)]);
        assert_eq!(probe.live(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_handle_aborts_run() {
        let probe = Arc::new(Probe::default());
        let mut pool = scheduler();
        let handle = pool.stop_handle();

        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(55)).await;
            handle.request_stop();
        });

        let outcome = pool
            .run_parallel(tasks(4, FOREVER, &probe), 2, Some(POLL))
            .await
            .unwrap();
        trigger.await.unwrap();

        assert_eq!(outcome, RunOutcome::Aborted);
        assert_eq!(probe.started(), names(0..2));
        assert_eq!(probe.stopped().len(), 2);
        assert_eq!(probe.live(), 0);
        assert!(!pool.stop_handle().is_requested());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_requested_before_run_starts_nothing() {
        let probe = Arc::new(Probe::default());
        let mut pool = scheduler();
        pool.stop_handle().request_stop();

        let outcome = pool
            .run_parallel(tasks(3, 0, &probe), 3, Some(POLL))
            .await
            .unwrap();
        assert_eq!(outcome, RunOutcome::Aborted);
        assert!(probe.started().is_empty());

        // The request is consumed; the next run proceeds normally.
        let outcome = pool
            .run_parallel(tasks(3, 0, &probe), 3, Some(POLL))
            .await
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(probe.started().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn run_uses_configured_defaults() {
        let probe = Arc::new(Probe::default());
        let mut pool = scheduler().with_max_parallel(-3);

        let batch: Vec<Box<dyn Runnable>> = tasks(6, 1, &probe)
            .into_iter()
            .map(|t| Box::new(t) as Box<dyn Runnable>)
            .collect();
        let outcome = pool.run(batch).await.unwrap();

        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(probe.started(), names(0..6));
        assert_eq!(probe.peak_live(), 3);
        assert_eq!(pool.config().poll_interval, POLL);
    }
}
