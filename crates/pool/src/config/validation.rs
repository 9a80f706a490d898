use std::collections::HashSet;

use super::types::PoolConfig;
use crate::error::PoolError;

impl PoolConfig {
    /// Validate the config: tasks present, names unique, timings usable.
    pub fn validate(&self) -> Result<(), PoolError> {
        self.validate_tasks_present()?;
        self.validate_task_entries()?;
        self.validate_poll_interval()?;
        Ok(())
    }

    fn validate_tasks_present(&self) -> Result<(), PoolError> {
        if self.tasks.is_empty() {
            return Err(PoolError::Config("no tasks configured".into()));
        }
        Ok(())
    }

    /// Ensure every task has a name and command, and names are unique.
    fn validate_task_entries(&self) -> Result<(), PoolError> {
        let mut seen = HashSet::new();
        for (index, task) in self.tasks.iter().enumerate() {
            if task.name.trim().is_empty() {
                return Err(PoolError::Config(format!("task #{index} has an empty name")));
            }
            if task.command.trim().is_empty() {
                return Err(PoolError::Config(format!(
                    "task '{}' has an empty command",
                    task.name
                )));
            }
            // `sh -c cmd a1` binds a1 to $0, so extra args would be silently dropped.
            if task.shell && !task.args.is_empty() {
                return Err(PoolError::Config(format!(
                    "task '{}' sets both shell = true and args; put the arguments in command",
                    task.name
                )));
            }
            if !seen.insert(task.name.as_str()) {
                return Err(PoolError::Config(format!(
                    "duplicate task name '{}'",
                    task.name
                )));
            }
        }
        Ok(())
    }

    fn validate_poll_interval(&self) -> Result<(), PoolError> {
        if self.pool.poll_interval_ms == 0 {
            return Err(PoolError::Config(
                "pool.poll_interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}
