//! Bounded-parallelism task scheduler.
//!
//! [`PoolScheduler`] starts at most `max_parallel` [`Runnable`]s, probes them
//! on a fixed poll interval, and starts the next queued task as soon as a
//! running one finishes. Registered [`Predicate`]s gate every tick; a veto
//! stops all running tasks with a grace period and ends the run.

pub mod conditional;
pub mod metrics;
pub mod runner;
pub mod stop;
pub mod task;
pub mod types;

pub use conditional::{fallible, Deadline, Fallible, Predicate, StopFile};
pub use metrics::RunMetrics;
pub use runner::PoolScheduler;
pub use stop::StopHandle;
pub use task::Runnable;
pub use types::{
    clamp_parallelism, RunOutcome, SchedulerConfig, DEFAULT_POLL_INTERVAL, DEFAULT_STOP_TIMEOUT,
};
