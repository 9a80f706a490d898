//! `procpool`: run the tasks of a TOML config with bounded parallelism.

mod cli;
mod report;
mod signals;

use clap::Parser;
use procpool::{PoolScheduler, StatusHandle};

use crate::cli::CliArgs;
use crate::report::RunSummary;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let config = args.load_config()?;

    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&config.plan_summary())?);
        return Ok(());
    }

    let tasks = config.build_tasks();
    let statuses: Vec<StatusHandle> = tasks.iter().map(|t| t.status()).collect();

    let mut pool = PoolScheduler::from_config(config.scheduler_config());
    for condition in config.build_conditions() {
        pool.add_boxed_conditional(condition);
    }

    let stop = pool.stop_handle();
    tokio::spawn(async move {
        signals::escalate(signals::shutdown_signal, stop).await;
        std::process::exit(report::EXIT_ABORTED);
    });

    tracing::info!(
        tasks = statuses.len(),
        config = %args.config.display(),
        "starting process pool"
    );

    let result = match pool.run(tasks).await {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            tracing::error!(error = %e, "run failed, stopping started tasks");
            let timeout = pool.config().stop_timeout;
            pool.stop_all_current_processes(timeout).await;
            Err(e.to_string())
        }
    };

    let summary = RunSummary::collect(result, &statuses, pool.last_run_metrics());
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        summary.print_table();
    }

    std::process::exit(summary.exit_code());
}
