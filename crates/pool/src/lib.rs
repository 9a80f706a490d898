pub mod config;
pub mod error;
pub mod process;
pub mod scheduler;

pub use config::{ConditionsConfig, PoolConfig, PoolSection, TaskConfig};
pub use error::{LaunchError, PoolError};
pub use process::{ProcessTask, StatusHandle, TaskState, TaskStatus};
pub use scheduler::{
    fallible, Deadline, PoolScheduler, Predicate, RunMetrics, RunOutcome, Runnable,
    SchedulerConfig, StopFile, StopHandle, DEFAULT_POLL_INTERVAL, DEFAULT_STOP_TIMEOUT,
};
