use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::scheduler::types::{DEFAULT_POLL_INTERVAL, DEFAULT_STOP_TIMEOUT};

// ── Top-level config ────────────────────────────────────────────────

/// Full configuration for a pool run.
///
/// Parsed from `procpool.toml` with support for environment variable overrides.
/// Defines the scheduler limits, the ordered task list, and optional run conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Scheduler limits and timings.
    #[serde(default)]
    pub pool: PoolSection,

    /// Tasks to run, started in file order.
    #[serde(default)]
    pub tasks: Vec<TaskConfig>,

    /// Conditions that end the run early.
    #[serde(default)]
    pub conditions: ConditionsConfig,
}

// ── Section configs ─────────────────────────────────────────────────

/// `[pool]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSection {
    /// Maximum concurrently running tasks. Sign is ignored, clamped to the task count.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: i64,

    /// Milliseconds between liveness polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Grace period in milliseconds before a stopped task is killed.
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,

    /// Relay task output behind a colored name prefix.
    #[serde(default = "default_prefix_output")]
    pub prefix_output: bool,
}

fn default_max_parallel() -> i64 {
    std::thread::available_parallelism()
        .map(|n| n.get() as i64)
        .unwrap_or(4)
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_stop_timeout_ms() -> u64 {
    DEFAULT_STOP_TIMEOUT.as_millis() as u64
}

fn default_prefix_output() -> bool {
    true
}

impl Default for PoolSection {
    fn default() -> Self {
        Self {
            max_parallel: default_max_parallel(),
            poll_interval_ms: default_poll_interval_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
            prefix_output: default_prefix_output(),
        }
    }
}

/// One `[[tasks]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    /// Unique name used in logs and output prefixes.
    pub name: String,

    /// Program to execute, or a full command line when `shell = true`.
    pub command: String,

    /// Arguments for `command`. Not allowed together with `shell`.
    #[serde(default)]
    pub args: Vec<String>,

    /// Run `command` through `sh -c`.
    #[serde(default)]
    pub shell: bool,

    /// Extra environment variables for the process.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Working directory. Relative paths resolve against the caller's cwd.
    pub cwd: Option<PathBuf>,
}

/// `[conditions]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionsConfig {
    /// The run is vetoed once this file exists.
    pub stop_file: Option<PathBuf>,

    /// The run is vetoed after this many seconds.
    pub deadline_secs: Option<u64>,
}
