//! reqcycle — drives request lifecycles across concurrent workers.
//!
//! Registers the built-in interceptors on a [`RequestService`], runs each
//! worker through `--requests` start/end cycles on its own execution
//! context, and prints a JSON summary. Exits non-zero if any request id was
//! handed out twice or a worker saw the registry misbehave.
//!
//! Usage:
//!   reqcycle                                   # 8 workers x 1000 requests
//!   reqcycle --workers 64 --requests 10000     # Heavier run
//!   reqcycle --fail-every 10                   # Every 10th request ends with a failure
//!   reqcycle --id-strategy sequential          # Salted counter ids instead of UUIDs
//!   reqcycle --thread-contexts --trace-requests --verbose

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::Parser;
use reqcycle_core::{
    IdStrategy, RegistryConfig, RequestService, StatsInterceptor, TracingInterceptor,
};
use reqcycle_protocol::{ExecutionContext, RequestFailure, RequestId};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "reqcycle", about = "reqcycle — request lifecycle registry driver")]
struct Cli {
    /// Number of concurrent workers
    #[arg(long, default_value = "8")]
    workers: u64,

    /// Requests started and ended by each worker
    #[arg(long, default_value = "1000")]
    requests: u64,

    /// End every Nth request with a failure (0 disables)
    #[arg(long, default_value = "0")]
    fail_every: u64,

    /// Request id strategy: uuid or sequential
    #[arg(long, default_value = "uuid")]
    id_strategy: IdStrategy,

    /// Key requests by OS thread instead of by worker number
    #[arg(long)]
    thread_contexts: bool,

    /// Log every request start/end through the tracing interceptor
    #[arg(long)]
    trace_requests: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Write logs to a file (defaults to ./reqcycle.log if no path given)
    #[arg(long, default_missing_value = "DEFAULT", num_args = 0..=1)]
    log_file: Option<String>,
}

#[derive(Debug, Default)]
struct WorkerReport {
    ids: Vec<RequestId>,
    failed: u64,
    interceptor_errors: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Summary {
    workers: u64,
    requests_per_worker: u64,
    total_requests: usize,
    distinct_ids: usize,
    duplicates: usize,
    failed_requests: u64,
    interceptor_errors: u64,
    active_after_run: usize,
    elapsed_ms: u64,
    stats: reqcycle_core::RequestStats,
}

fn init_tracing(cli: &Cli) -> anyhow::Result<()> {
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if let Some(ref log_file_arg) = cli.log_file {
        let log_path = if log_file_arg == "DEFAULT" {
            PathBuf::from("reqcycle.log")
        } else {
            PathBuf::from(log_file_arg)
        };

        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)
            .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .init();

        eprintln!("Logging to {}", log_path.display());
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

/// Run one worker's start/end cycles on its own execution context.
fn run_worker(
    service: &RequestService,
    ctx: ExecutionContext,
    requests: u64,
    fail_every: u64,
) -> anyhow::Result<WorkerReport> {
    let mut report = WorkerReport::default();

    for n in 1..=requests {
        let id = match service.start_request(&ctx) {
            Ok(id) => id,
            Err(e) => {
                let Some(id) = e.request_id() else {
                    return Err(e).context(format!("start failed on {ctx}"));
                };
                report.interceptor_errors += 1;
                id.clone()
            }
        };

        if service.current_request_id(&ctx).as_ref() != Some(&id) {
            bail!("{ctx}: current request is not the one just started ({id})");
        }

        let failure = (fail_every > 0 && n % fail_every == 0)
            .then(|| RequestFailure::msg(format!("simulated failure #{n} on {ctx}")));
        if failure.is_some() {
            report.failed += 1;
        }

        let ended = match service.end_request(&ctx, failure) {
            Ok(ended) => ended,
            Err(e) => {
                report.interceptor_errors += 1;
                e.request_id().cloned()
            }
        };
        if ended.as_ref() != Some(&id) {
            bail!("{ctx}: ending {id} returned {ended:?}");
        }
        if service.end_request(&ctx, None)?.is_some() {
            bail!("{ctx}: request {id} ended twice");
        }

        report.ids.push(id);
    }

    Ok(report)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let config = RegistryConfig::default().with_id_strategy(cli.id_strategy);
    let service = Arc::new(RequestService::with_config(config));

    let stats = Arc::new(StatsInterceptor::new());
    let _stats_handle = service.register_request_interceptor(Some(stats.clone()))?;
    let _trace_handle = if cli.trace_requests {
        Some(service.register_request_interceptor(Some(Arc::new(TracingInterceptor)))?)
    } else {
        None
    };

    info!(
        "Running {} worker(s) x {} request(s) ({} ids, {} contexts)",
        cli.workers,
        cli.requests,
        cli.id_strategy,
        if cli.thread_contexts { "thread" } else { "worker" }
    );

    let started = Instant::now();
    let mut tasks = Vec::with_capacity(cli.workers as usize);
    for worker in 0..cli.workers {
        let service = service.clone();
        let (requests, fail_every, thread_contexts) =
            (cli.requests, cli.fail_every, cli.thread_contexts);
        tasks.push(tokio::task::spawn_blocking(move || {
            let ctx = if thread_contexts {
                ExecutionContext::current()
            } else {
                ExecutionContext::worker(worker)
            };
            run_worker(&service, ctx, requests, fail_every)
        }));
    }

    let mut seen = HashSet::new();
    let mut total = 0usize;
    let mut failed_requests = 0;
    let mut interceptor_errors = 0;
    let mut worker_failed = false;
    for task in tasks {
        match task.await.context("worker task panicked")? {
            Ok(report) => {
                total += report.ids.len();
                failed_requests += report.failed;
                interceptor_errors += report.interceptor_errors;
                seen.extend(report.ids);
            }
            Err(e) => {
                error!("Worker failed: {e:#}");
                worker_failed = true;
            }
        }
    }

    let summary = Summary {
        workers: cli.workers,
        requests_per_worker: cli.requests,
        total_requests: total,
        distinct_ids: seen.len(),
        duplicates: total - seen.len(),
        failed_requests,
        interceptor_errors,
        active_after_run: service.active_request_count(),
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        stats: stats.snapshot(),
    };
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if summary.duplicates > 0 {
        error!("{} duplicate request id(s) handed out", summary.duplicates);
        std::process::exit(1);
    }
    if worker_failed {
        std::process::exit(1);
    }
    Ok(())
}
