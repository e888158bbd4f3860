//! hadaps-balancer - Glob-driven replication balancer
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use hadaps_balancer::config::{BalancePlan, CliArgs};
use hadaps_balancer::error::BalancerError;
use hadaps_balancer::progress::{print_header, print_summary, ProgressReporter, RunSummary};
use hadaps_balancer::scheduler::{Balancer, Interrupt, RecordingCollector, ReplicationPlanner};
use hadaps_balancer::storage;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            if matches!(e.downcast_ref::<BalancerError>(), Some(BalancerError::Interrupted)) {
                ExitCode::from(130)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let plan = BalancePlan::from_args(&args).context("Invalid configuration")?;

    if plan.config.show_progress {
        print_header(&plan);
    }

    let storage = storage::open(&plan.namespace)
        .with_context(|| format!("Failed to open namespace {}", plan.namespace))?;

    // Ctrl-C interrupts the wait for completions; running operations finish
    let shutdown = Arc::new(AtomicBool::new(false));
    let interrupt = Interrupt::from_flag(Arc::clone(&shutdown));
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let recorder = Arc::new(RecordingCollector::new());
    let reporter = Arc::new(ProgressReporter::new(
        Arc::clone(&recorder),
        plan.config.show_progress,
    ));
    reporter.set_status("Discovering files...");

    let balancer = Balancer::builder()
        .namespace(plan.namespace.clone())
        .generations(plan.generations.clone())
        .patterns(plan.patterns.clone())
        .config(plan.config.clone())
        .storage(storage)
        .operation(Arc::new(ReplicationPlanner::new()))
        .collector(reporter.clone())
        .interrupt(interrupt)
        .build()
        .context("Failed to initialize balancer")?;

    let start = Instant::now();
    let result = balancer.run();

    match &result {
        Ok(()) => reporter.finish("Balance completed"),
        Err(BalancerError::Interrupted) => reporter.finish("Balance interrupted"),
        Err(_) => reporter.finish_and_clear(),
    }
    result.context("Balance failed")?;

    let summary = RunSummary::from_collector(&recorder);
    if plan.config.show_progress {
        print_summary(&summary, start.elapsed());
    }

    if summary.failed > 0 {
        info!(failed = summary.failed, "Balance completed with failures");
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("hadaps_balancer=debug,warn")
    } else {
        EnvFilter::new("hadaps_balancer=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
