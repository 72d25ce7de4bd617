use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{error, info};
use voucher_core::{
    setup_logger, DedupRegistry, ProxyPool, ResultSink, RunMetrics, TargetCounter, Worker,
    WorkerPool,
};
use voucher_runner::client::UpstreamClient;
use voucher_runner::config::AppConfig;
use voucher_runner::handle::HandleGenerator;
use voucher_runner::jobs::{AcquireWorker, ValidateWorker};
use voucher_runner::output::{read_targets, FileResultWriter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    #[arg(short, long)]
    export_metrics: Option<String>,
    #[arg(long, default_value = "30")]
    metrics_interval: u64,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Acquire fresh codes until the goal count is met.
    Generate {
        /// Override the configured goal count.
        #[arg(long)]
        goal: Option<i64>,
        /// Override the configured concurrency limit.
        #[arg(long)]
        concurrency: Option<usize>,
    },
    /// Validate every code in the target file.
    Check {
        /// Override the configured concurrency limit.
        #[arg(long)]
        concurrency: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = setup_logger();
    // Keep guard alive for file logging
    std::mem::forget(_log_guard);
    dotenv().ok();

    let args = Args::parse();
    info!("Loading config from: {}", args.config);

    let mut config = match AppConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {:#}", e);
            return Ok(());
        }
    };

    match &args.command {
        Command::Generate { goal, concurrency } => {
            if let Some(goal) = goal {
                config.goal_count = *goal;
            }
            if let Some(concurrency) = concurrency {
                config.concurrency_limit = *concurrency;
            }
        }
        Command::Check { concurrency } => {
            if let Some(concurrency) = concurrency {
                config.concurrency_limit = *concurrency;
            }
        }
    }

    let run = config.to_run_config();

    let proxies = if run.use_proxies {
        let pool = ProxyPool::load(&run.proxy_file)?;
        if pool.is_empty() {
            info!("Proxy pool is empty; egress is direct.");
        }
        Arc::new(pool)
    } else {
        Arc::new(ProxyPool::empty())
    };

    let metrics = Arc::new(RunMetrics::new());
    let writer = Arc::new(FileResultWriter::new(
        run.service.results_dir.clone(),
        run.service.redeem_url_prefix.clone(),
    ));
    let (sink, sink_handle) = ResultSink::spawn(writer);

    let client = Arc::new(UpstreamClient::new(
        run.service.clone(),
        run.auth_token.clone(),
        proxies,
    ));
    let retry = run.retry_config();

    let workers: Vec<Box<dyn Worker>> = match &args.command {
        Command::Generate { .. } => {
            let counter = Arc::new(TargetCounter::new(run.goal_count));
            let registry = Arc::new(DedupRegistry::new());
            let handles = Arc::new(HandleGenerator::new());

            info!(
                "Seeking {} unique codes with {} workers.",
                run.goal_count, run.concurrency_limit
            );

            (0..run.concurrency_limit)
                .map(|_| {
                    Box::new(AcquireWorker::new(
                        client.clone(),
                        retry,
                        counter.clone(),
                        registry.clone(),
                        metrics.clone(),
                        sink.clone(),
                        handles.clone(),
                        run.service.redeem_url_prefix.clone(),
                    )) as Box<dyn Worker>
                })
                .collect()
        }
        Command::Check { .. } => {
            let codes = read_targets(&run.target_file, &run.service.redeem_url_prefix)?;
            if codes.is_empty() {
                error!("No codes found in {}", run.target_file);
                return Ok(());
            }

            info!(
                "Checking {} codes with concurrency limit {}.",
                codes.len(),
                run.concurrency_limit
            );

            codes
                .into_iter()
                .map(|code| {
                    Box::new(ValidateWorker::new(
                        code,
                        client.clone(),
                        retry,
                        metrics.clone(),
                        sink.clone(),
                    )) as Box<dyn Worker>
                })
                .collect()
        }
    };

    let metrics_task = if let Some(ref metrics_path) = args.export_metrics {
        let path = metrics_path.clone();
        let interval_secs = args.metrics_interval;
        let metrics = metrics.clone();
        Some(tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                if let Err(e) = metrics.export_to_file(&path).await {
                    error!("Metrics export failed: {}", e);
                } else {
                    info!("Metrics exported to {}", path);
                }
            }
        }))
    } else {
        None
    };

    WorkerPool::run(workers, run.concurrency_limit).await;

    // Release the last sender so the consumer can drain and exit.
    drop(sink);
    if let Err(e) = sink_handle.await {
        error!("Result sink consumer failed: {:?}", e);
    }

    if let Some(task) = metrics_task {
        task.abort();
    }

    if let Some(metrics_path) = args.export_metrics {
        match metrics.export_to_file(&metrics_path).await {
            Ok(_) => info!("Final metrics exported to {}", metrics_path),
            Err(e) => error!("Failed to export final metrics: {}", e),
        }
    }

    info!("Run summary: {}", metrics.to_json());

    Ok(())
}
