//! `ssn` - command-line driver for the submission lifecycle.
//!
//! Each invocation performs one command against one environment: resolve the
//! flow configuration, log in, run the operation, update the local filing
//! store, exit. Nothing stays resident between invocations; the data
//! directory carries all durable state.

mod args;

use anyhow::{Result, bail};
use tracing_subscriber::EnvFilter;

use ssn_config::{ConfigStore, Credentials};
use ssn_engine::{BulkReport, ConfirmOutcome, Orchestrator};
use ssn_store::{ReopenOutcome, StateStore};
use ssn_types::{Period, PeriodKind};

use args::{Cli, Command, FlowCommand, Target};

fn init_tracing(default_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// The flow document's `debug` flag raises the default filter; RUST_LOG
/// still wins when set.
fn default_log_level(config: &ConfigStore, command: &Command) -> &'static str {
    if let Command::Flow { kind, .. } = command
        && config.load(*kind).is_ok_and(|document| document.debug)
    {
        return "debug";
    }
    "warn"
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = args::parse(std::env::args().skip(1))?;
    init_tracing(default_log_level(
        &ConfigStore::new(&cli.config_dir),
        &cli.command,
    ));
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let config = ConfigStore::new(&cli.config_dir);

    match cli.command {
        Command::ShowEnv => {
            println!("{}", config.active()?);
            Ok(())
        }
        Command::SetEnv(environment) => {
            config.apply(environment)?;
            println!("environment set to {environment}");
            Ok(())
        }
        Command::Flow { kind, command } => {
            let engine = build_orchestrator(&config, &cli.data_dir, kind)?;
            run_flow(&engine, kind, command).await
        }
    }
}

fn build_orchestrator(
    config: &ConfigStore,
    data_dir: &std::path::Path,
    kind: PeriodKind,
) -> Result<Orchestrator> {
    let profile = config.profile(kind)?;
    let endpoints = config.endpoints(kind)?;
    let credentials = Credentials::resolve()?;
    let store = StateStore::new(data_dir);
    Ok(Orchestrator::new(&profile, endpoints, credentials, store)?)
}

async fn run_flow(engine: &Orchestrator, kind: PeriodKind, command: FlowCommand) -> Result<()> {
    match command {
        FlowCommand::Upload(Target::One(period)) => {
            let outcome = engine.upload(&period).await?;
            println!(
                "{period}: sent {} operation(s), receipt {}",
                outcome.record_count, outcome.receipt
            );
        }
        FlowCommand::Upload(Target::All) => {
            let report = engine.upload_all(kind).await?;
            print_bulk("uploaded", &report)?;
        }
        FlowCommand::Confirm(Target::One(period)) => match engine.confirm(&period).await? {
            ConfirmOutcome::Confirmed { processed } => {
                println!("{period}: confirmed, archived as {}", processed.display());
            }
            ConfirmOutcome::AlreadyConfirmed => {
                println!("{period}: already confirmed");
            }
        },
        FlowCommand::Confirm(Target::All) => {
            let report = engine.confirm_all(kind).await?;
            print_bulk("confirmed", &report)?;
        }
        FlowCommand::Query(period) => {
            print_query(engine, &period).await?;
        }
        FlowCommand::Fix(period) => {
            let outcome = engine.fix(&period).await?;
            if let Some(message) = outcome.ack.message {
                println!("{period}: {message}");
            }
            match outcome.reopen {
                ReopenOutcome::Relocated { pending } => {
                    println!(
                        "{period}: reopened, correct {} and upload again",
                        pending.display()
                    );
                }
                ReopenOutcome::AwaitingArtifact => {
                    println!("{period}: reopened, regenerate the artifact and upload");
                }
            }
        }
        FlowCommand::Empty(period) => {
            let outcome = engine.declare_empty(&period).await?;
            println!("{period}: declared empty, receipt {}", outcome.receipt);
        }
    }
    Ok(())
}

async fn print_query(engine: &Orchestrator, period: &Period) -> Result<()> {
    let outcome = engine.query(period).await?;
    println!("{period}: local status {}", outcome.local);
    match &outcome.remote {
        Some(report) => {
            println!("{period}: authority reports {}", report.remote);
            if !report.raw.is_null() {
                println!("{}", serde_json::to_string_pretty(&report.raw)?);
            }
        }
        None => println!("{period}: authority unreachable, showing local state only"),
    }
    if outcome.conflict() {
        println!("{period}: WARNING: local and remote state disagree");
    }
    Ok(())
}

fn print_bulk(verb: &str, report: &BulkReport) -> Result<()> {
    for period in &report.succeeded {
        println!("{period}: {verb}");
    }
    for (path, error) in &report.unreadable {
        eprintln!("{}: skipped: {error}", path.display());
    }
    for (period, error) in &report.failed {
        eprintln!("{period}: failed: {error}");
    }
    if report.succeeded.is_empty() && report.is_clean() {
        println!("nothing to do");
    }
    if !report.is_clean() {
        bail!(
            "{} of {} period(s) failed",
            report.failed.len() + report.unreadable.len(),
            report.succeeded.len() + report.failed.len() + report.unreadable.len()
        );
    }
    Ok(())
}
