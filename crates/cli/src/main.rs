//! BDD Board CLI - Main Entry Point

use std::path::PathBuf;

use anyhow::Context;
use bddboard_common::DashboardConfig;
use clap::{Parser, Subcommand};

use bddboard_cli::commands::{dashboard, features, lint, serve, timeouts};
use bddboard_cli::output;

/// BDD Board CLI - feature progress dashboard
#[derive(Parser)]
#[command(name = "bddboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "bddboard.toml", env = "BDDBOARD_CONFIG", global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconciled feature progress
    Features(features::SourceArgs),

    /// Feature and scenario cards
    Cards(features::SourceArgs),

    /// Score feature files against the quality layers
    Lint(lint::LintArgs),

    /// Summarize registered projects
    Dashboard(dashboard::DashboardArgs),

    /// Show calculated timeouts for this machine
    Timeouts(timeouts::TimeoutsArgs),

    /// Run the HTTP API
    Serve(serve::ServeArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = DashboardConfig::load(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    config.apply_env_overrides();

    match cli.command {
        Commands::Features(args) => features::execute(args, config, cli.format)?,
        Commands::Cards(args) => features::execute_cards(args, config, cli.format)?,
        Commands::Lint(args) => lint::execute(args, config, cli.format)?,
        Commands::Dashboard(args) => dashboard::execute(args, config, cli.format)?,
        Commands::Timeouts(args) => timeouts::execute(args, config, cli.format)?,
        Commands::Serve(args) => serve::execute(args, config).await?,
        Commands::Version => {
            println!("BDD Board CLI v{}", bddboard_common::VERSION);
            println!("Gherkin progress, quality scoring and evidence dashboard");
        }
    }

    Ok(())
}
