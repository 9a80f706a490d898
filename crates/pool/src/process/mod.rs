//! OS-process implementation of [`Runnable`](crate::Runnable).

pub mod output;
pub mod status;
mod task;

pub use output::prefix_for;
pub use status::{StatusHandle, TaskState, TaskStatus};
pub use task::ProcessTask;
