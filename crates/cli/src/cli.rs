use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use procpool::PoolConfig;

/// Run a list of commands with bounded parallelism.
///
/// Tasks come from a TOML file and start in file order; at most
/// `--max-parallel` run at once. Ctrl+C or SIGTERM stops running tasks
/// gracefully.
#[derive(Parser, Debug)]
#[command(name = "procpool", version, about)]
pub struct CliArgs {
    /// Path to the pool configuration file.
    #[arg(long, env = "PROCPOOL_CONFIG", default_value = "procpool.toml")]
    pub config: PathBuf,

    /// Maximum concurrently running tasks (sign ignored, clamped to task count).
    #[arg(long, allow_negative_numbers = true)]
    pub max_parallel: Option<i64>,

    /// Milliseconds between liveness polls.
    #[arg(long)]
    pub poll_ms: Option<u64>,

    /// Grace period in milliseconds before stopped tasks are killed.
    #[arg(long)]
    pub stop_timeout_ms: Option<u64>,

    /// Stop the run once this file exists.
    #[arg(long)]
    pub stop_file: Option<PathBuf>,

    /// Stop the run after this many seconds.
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Inherit task output instead of relaying it with name prefixes.
    #[arg(long)]
    pub no_prefix: bool,

    /// Print the resolved plan as JSON and exit without running anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the final summary as JSON.
    #[arg(long)]
    pub json: bool,
}

impl CliArgs {
    /// Load `--config`, layer env and flag overrides, then validate once.
    pub fn load_config(&self) -> anyhow::Result<PoolConfig> {
        let mut config = PoolConfig::load(&self.config)
            .with_context(|| format!("failed to load config from {}", self.config.display()))?;
        self.apply_to(&mut config);
        config.validate().context("invalid configuration")?;
        Ok(config)
    }

    /// Apply flag overrides on top of the file/env config.
    pub fn apply_to(&self, config: &mut PoolConfig) {
        if let Some(n) = self.max_parallel {
            config.pool.max_parallel = n;
        }
        if let Some(ms) = self.poll_ms {
            config.pool.poll_interval_ms = ms;
        }
        if let Some(ms) = self.stop_timeout_ms {
            config.pool.stop_timeout_ms = ms;
        }
        if let Some(path) = &self.stop_file {
            config.conditions.stop_file = Some(path.clone());
        }
        if let Some(secs) = self.deadline_secs {
            config.conditions.deadline_secs = Some(secs);
        }
        if self.no_prefix {
            config.pool.prefix_output = false;
        }
    }
}
