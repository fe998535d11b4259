mod cli;
mod config;
mod output;
mod simulate;

use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use source_status::coordinator::CyclePhase;
use source_status::{CoordinatorHandle, StatusRecord};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tracing::{Level, error, info, warn};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{
    cli::{Args, Commands, IdList, LogFormat, OutputFormat},
    config::AppConfig,
    output::{RunReport, print_event, print_report},
    simulate::SimulatedChecker,
};

/// How often `run` checks whether the coordinator has settled.
const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args).await {
        error!("Application error: {:#}", e);
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    init_logging(args.verbose, args.quiet, args.log_format)?;

    let config = AppConfig::load(args.config.as_deref())?;

    match args.command {
        Commands::Run {
            ids,
            wait_secs,
            events,
            output,
        } => {
            run_coordinator(
                config,
                ids,
                Duration::from_secs(wait_secs),
                events,
                output,
            )
            .await?;
        }

        Commands::Config { show } => {
            if show {
                println!("{}", config.show()?);
            } else {
                match AppConfig::default_path() {
                    Some(path) => println!("Default config file: {}", path.display()),
                    None => println!("No per-user config directory on this platform"),
                }
                println!("Use --show to display the effective configuration");
            }
        }
    }

    Ok(())
}

async fn run_coordinator(
    config: AppConfig,
    ids: IdList,
    wait: Duration,
    show_events: bool,
    output: OutputFormat,
) -> Result<()> {
    let checker = Arc::new(SimulatedChecker::new(config.backend.clone()));
    let (handle, task) = source_status::spawn("srcstat", config.coordinator, checker.clone())?;

    let events_task = show_events.then(|| {
        let mut events = handle.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if let Err(e) = print_event(&event, output) {
                            warn!("Failed to print event: {}", e);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Event stream lagged, {} event(s) skipped", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    });

    info!(
        "Enqueueing {} source(s) on coordinator {}",
        ids.as_slice().len(),
        handle.name()
    );
    handle.enqueue(ids.as_slice().iter().copied());

    let settled = tokio::select! {
        settled = wait_until_settled(&handle, wait) => settled?,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping coordinator");
            false
        }
    };

    let state = handle.state().await?;
    let mut snapshot = handle.cache().snapshot();
    let statuses = ids
        .as_slice()
        .iter()
        .map(|id| {
            snapshot
                .remove(id)
                .unwrap_or_else(|| StatusRecord::unknown(*id, "never fetched"))
        })
        .collect();

    handle.dispose();
    task.await?;

    // Dropping the last handle closes the event channel once the printer has
    // drained what was already published.
    drop(handle);
    if let Some(events_task) = events_task {
        events_task.await?;
    }

    info!(
        "Simulated backend answered {} call(s)",
        checker.call_count()
    );

    print_report(
        &RunReport {
            settled,
            state,
            statuses,
        },
        output,
    )
}

/// Wait until the coordinator stops making progress on its own.
///
/// Returns `true` when it went idle, `false` when it stalled or the wait ran out.
async fn wait_until_settled(handle: &CoordinatorHandle, wait: Duration) -> Result<bool> {
    let deadline = Instant::now() + wait;
    loop {
        let state = handle.state().await?;
        if !state.phase.is_active() {
            if state.phase == CyclePhase::Idle {
                return Ok(true);
            }
            warn!(
                "Coordinator stalled after {} consecutive failure(s), {} source(s) unresolved",
                state.consecutive_failures, state.queued
            );
            return Ok(false);
        }
        if Instant::now() >= deadline {
            warn!(
                "Gave up after {:?} with {} source(s) still queued",
                wait, state.queued
            );
            return Ok(false);
        }
        tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
    }
}

fn init_logging(verbose: bool, quiet: bool, format: LogFormat) -> Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => subscriber
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(verbose)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
        LogFormat::Json => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()?,
    }
    Ok(())
}
