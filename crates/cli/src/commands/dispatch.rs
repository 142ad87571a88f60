//! `dispatch` command implementation.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use contracts::{Task, TaskResponse};
use dispatcher::{create_router, Router};
use observability::DispatchStats;

use crate::cli::DispatchArgs;
use crate::error::CliError;

/// Execute the `dispatch` command
pub async fn run_dispatch(args: &DispatchArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.metrics_port != 0 {
        observability::init_metrics(args.metrics_port)?;
    }

    let tasks = build_tasks(args)?;
    let expected = tasks.len();

    if let Some(ref dir) = args.output_dir {
        std::fs::create_dir_all(dir)
            .map_err(CliError::from)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let router = create_router(&config)
        .await
        .context("Failed to create router")?;

    let replicas = router.replica_count().await;
    info!(
        function = %router.function(),
        replicas,
        workers = config.router.workers,
        tasks = expected,
        "Dispatching"
    );

    if replicas == 0 {
        warn!("No replicas configured - tasks will wait until the timeout");
    }

    let started = Instant::now();
    let responses = router.responses();
    let mut stats = DispatchStats::new();

    // Both queues are bounded: submit and collect concurrently
    let run = async {
        let submit = async { router.submit(tasks).await.map_err(anyhow::Error::from) };
        let collect = collect_responses(&responses, expected, args.output_dir.as_deref(), &mut stats);
        tokio::try_join!(submit, collect).map(|(_, failed)| failed)
    };

    let outcome = tokio::select! {
        result = run => Ok(result),
        _ = deadline(args.timeout) => Err(Stopped::Timeout),
        _ = tokio::signal::ctrl_c() => {
            warn!("Received Ctrl+C, stopping dispatch");
            Err(Stopped::Interrupted)
        }
    };

    let per_replica = router_metrics_line(&router).await;
    router.shutdown().await;

    let received = stats.total as usize;
    let failed = match outcome {
        Ok(result) => result?,
        Err(Stopped::Timeout) => return Err(CliError::Timeout { received, expected }.into()),
        Err(Stopped::Interrupted) => {
            return Err(CliError::Interrupted { received, expected }.into())
        }
    };

    print_summary(&per_replica, &stats, started.elapsed());

    match failed.into_iter().next() {
        Some(first) => Err(first.into()),
        None => Ok(()),
    }
}

/// Receive `expected` responses; returns one error per failed task
async fn collect_responses(
    responses: &async_channel::Receiver<TaskResponse>,
    expected: usize,
    output_dir: Option<&Path>,
    stats: &mut DispatchStats,
) -> Result<Vec<CliError>> {
    let mut failed = Vec::new();
    for _ in 0..expected {
        let Ok(response) = responses.recv().await else {
            break;
        };
        report(&response, output_dir)?;
        if let Some(ref err) = response.error {
            failed.push(CliError::task_failed(response.sequence(), err.to_string()));
        }
        stats.update(&response);
    }
    Ok(failed)
}

enum Stopped {
    Timeout,
    Interrupted,
}

/// One task per input line, or `count` copies of `body`
fn build_tasks(args: &DispatchArgs) -> Result<Vec<Task>> {
    let bodies: Vec<String> = match args.input {
        Some(ref path) => std::fs::read_to_string(path)
            .map_err(CliError::from)
            .with_context(|| format!("Failed to read {}", path.display()))?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect(),
        None => vec![args.body.clone(); args.count],
    };

    Ok(bodies
        .into_iter()
        .enumerate()
        .map(|(i, body)| Task::new(i as i64, body))
        .collect())
}

async fn deadline(seconds: u64) {
    if seconds == 0 {
        std::future::pending::<()>().await;
    } else {
        tokio::time::sleep(Duration::from_secs(seconds)).await;
    }
}

fn report(response: &TaskResponse, output_dir: Option<&Path>) -> Result<()> {
    match response.error {
        Some(ref err) => println!(
            "#{} {} error: {}",
            response.sequence(),
            response.address,
            err
        ),
        None => println!(
            "#{} {} {} ({} bytes, {} ms)",
            response.sequence(),
            response.address,
            response.status,
            response.body.len(),
            response.elapsed.as_millis()
        ),
    }

    match invoker::response_log_lines(response) {
        Ok(lines) => {
            for line in lines {
                println!("    {line}");
            }
        }
        Err(e) => warn!(sequence = response.sequence(), error = %e, "Malformed replica logs"),
    }

    if let (Some(dir), None) = (output_dir, &response.error) {
        let path = dir.join(format!("{}.out", response.sequence()));
        std::fs::write(&path, &response.body)
            .map_err(CliError::from)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

async fn router_metrics_line(router: &Router) -> String {
    router
        .metrics()
        .await
        .iter()
        .map(|(name, m)| format!("{name}={}/{}", m.success_count, m.failure_count))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_summary(per_replica: &str, stats: &DispatchStats, elapsed: Duration) {
    println!();
    print!("{}", stats.summary());
    println!("Elapsed: {:.2}s", elapsed.as_secs_f64());
    if !per_replica.is_empty() {
        println!("Replica ok/failed: {per_replica}");
    }
}
