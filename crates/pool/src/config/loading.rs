use std::path::Path;
use std::time::Duration;

use crate::error::PoolError;
use crate::process::{prefix_for, ProcessTask};
use crate::scheduler::conditional::{Deadline, Predicate, StopFile};
use crate::scheduler::types::SchedulerConfig;

use super::types::{PoolConfig, TaskConfig};

impl PoolConfig {
    /// Parse config from a TOML string, apply env overrides, and validate.
    pub fn from_toml(toml_str: &str) -> Result<Self, PoolError> {
        let mut config = Self::parse(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load, override, and validate config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PoolError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse TOML only: no env overrides, no validation.
    pub fn parse(toml_str: &str) -> Result<Self, PoolError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Read and parse a file and apply env overrides, leaving validation to
    /// the caller so further overrides (e.g. CLI flags) can be layered first.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PoolError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config = Self::parse(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Scheduler settings derived from the `[pool]` section.
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            max_parallel: self.pool.max_parallel,
            poll_interval: Duration::from_millis(self.pool.poll_interval_ms),
            stop_timeout: Duration::from_millis(self.pool.stop_timeout_ms),
        }
    }

    /// Build the configured tasks in file order.
    pub fn build_tasks(&self) -> Vec<ProcessTask> {
        let width = self.tasks.iter().map(|t| t.name.len()).max().unwrap_or(0);

        self.tasks
            .iter()
            .enumerate()
            .map(|(index, task)| {
                let mut process = task.to_process();
                if self.pool.prefix_output {
                    process = process.output_prefix(prefix_for(&task.name, index, width));
                }
                process
            })
            .collect()
    }

    /// Build the predicates described by `[conditions]`.
    pub fn build_conditions(&self) -> Vec<Box<dyn Predicate>> {
        let mut conditions: Vec<Box<dyn Predicate>> = Vec::new();
        if let Some(path) = &self.conditions.stop_file {
            conditions.push(Box::new(StopFile::new(path)));
        }
        if let Some(secs) = self.conditions.deadline_secs {
            conditions.push(Box::new(Deadline::after(Duration::from_secs(secs))));
        }
        conditions
    }

    /// JSON description of what a run would do, for dry runs.
    pub fn plan_summary(&self) -> serde_json::Value {
        let effective = crate::scheduler::types::clamp_parallelism(
            self.pool.max_parallel,
            self.tasks.len(),
        );
        serde_json::json!({
            "pool": {
                "max_parallel": self.pool.max_parallel,
                "effective_parallelism": effective,
                "poll_interval_ms": self.pool.poll_interval_ms,
                "stop_timeout_ms": self.pool.stop_timeout_ms,
                "prefix_output": self.pool.prefix_output,
            },
            "tasks": self.tasks.iter().map(|t| serde_json::json!({
                "name": t.name,
                "command": t.to_process().command_line(),
                "cwd": t.cwd,
            })).collect::<Vec<_>>(),
            "conditions": {
                "stop_file": self.conditions.stop_file,
                "deadline_secs": self.conditions.deadline_secs,
            },
        })
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Apply environment variable overrides.
    ///
    /// Convention: `PROCPOOL_KEY` overrides `pool.key`.
    /// - `PROCPOOL_MAX_PARALLEL` -> `pool.max_parallel`
    /// - `PROCPOOL_POLL_INTERVAL_MS` -> `pool.poll_interval_ms`
    /// - `PROCPOOL_STOP_TIMEOUT_MS` -> `pool.stop_timeout_ms`
    /// - `PROCPOOL_PREFIX_OUTPUT` -> `pool.prefix_output`
    ///
    /// Values that fail to parse are ignored.
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("PROCPOOL_MAX_PARALLEL").and_then(|v| v.parse().ok()) {
            self.pool.max_parallel = v;
        }
        if let Some(v) = lookup("PROCPOOL_POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.pool.poll_interval_ms = v;
        }
        if let Some(v) = lookup("PROCPOOL_STOP_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.pool.stop_timeout_ms = v;
        }
        if let Some(v) = lookup("PROCPOOL_PREFIX_OUTPUT").and_then(|v| parse_flag(&v)) {
            self.pool.prefix_output = v;
        }
    }
}

impl TaskConfig {
    fn to_process(&self) -> ProcessTask {
        let process = if self.shell {
            ProcessTask::shell(&self.name, &self.command)
        } else {
            ProcessTask::new(&self.name, &self.command)
        };
        let process = process.args(self.args.iter().cloned()).envs(self.env.clone());
        match &self.cwd {
            Some(dir) => process.current_dir(dir),
            None => process,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
