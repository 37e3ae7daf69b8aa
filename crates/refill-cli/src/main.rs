//! CLI binary for running refill refresh workflows.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use refill_client::HttpBackend;
use refill_engine::{
    AutoApproveGate, ConfirmationGate, ConsoleGate, Orchestrator, RuleSet, RunConfig,
};
use refill_types::RunSummary;

#[derive(Parser)]
#[command(
    name = "refill",
    version,
    about = "Controlled truncate-and-repopulate runs against an analytics workspace"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the run configuration file
    #[arg(short, long, global = true, default_value = "refill.json")]
    config: PathBuf,

    /// Skip the interactive confirmation gate
    #[arg(long, global = true)]
    yes: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Rehearse the refresh: plan, confirm, and report with no backend action
    Dryrun,
    /// Truncate selected data sources, then repopulate pipes, live
    Repopulate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let dry_run = match cli.command {
        Commands::Dryrun => true,
        Commands::Repopulate => false,
    };
    cmd_run(&cli.config, dry_run, cli.yes).await
}

async fn cmd_run(config_path: &std::path::Path, dry_run: bool, auto_approve: bool) -> anyhow::Result<()> {
    let config = RunConfig::load(config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    // Rule construction is the fail-fast point; no backend call happens
    // before this succeeds.
    let rules = RuleSet::from_config(&config)?;

    let backend = HttpBackend::from_env(&config.base_url)
        .context("REFILL_TOKEN is not set")?;

    let gate: Arc<dyn ConfirmationGate> = if auto_approve {
        Arc::new(AutoApproveGate)
    } else {
        Arc::new(ConsoleGate)
    };

    println!("Workspace: {}", config.workspace);
    if dry_run {
        println!("(dry run mode -- no backend action will be taken)");
    }

    let orchestrator = Orchestrator::new(Arc::new(backend), gate, dry_run);
    let summary = orchestrator.run(&config.workspace, &rules).await?;

    print_summary(&summary);

    if summary.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    if summary.aborted {
        println!("\nAborted at confirmation; nothing was changed.");
        return;
    }

    println!("\nRun {} complete", summary.run_id);

    if !summary.completed.is_empty() {
        println!("Completed ({}):", summary.completed.len());
        for item in &summary.completed {
            match (&item.group, &item.detail) {
                (_, Some(detail)) => println!("  {detail}"),
                (Some(group), None) => println!("  {} ({}, {})", item.name, item.kind, group),
                (None, None) => println!("  {} ({})", item.name, item.kind),
            }
        }
    }

    if !summary.skipped.is_empty() {
        println!("Skipped ({}):", summary.skipped.len());
        for c in &summary.skipped {
            println!("  {} ({}): {}", c.name, c.kind, c.reason);
        }
    }

    if !summary.failed.is_empty() {
        println!("Failed ({}):", summary.failed.len());
        for item in &summary.failed {
            println!(
                "  {} ({}): {}",
                item.name,
                item.kind,
                item.detail.as_deref().unwrap_or("unknown error")
            );
        }
    }
}
