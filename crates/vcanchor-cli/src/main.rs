//! vcanchor CLI: request and verify ledger-anchored credentials.
//!
//! Subcommands: issue, verify.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// vcanchor: ledger-anchored predicate credentials.
#[derive(Parser, Debug)]
#[command(name = "vcanchor", version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Request a credential from an issuer node.
    Issue(commands::issue::IssueArgs),
    /// Verify a credential locally, optionally against the ledger.
    Verify(commands::verify::VerifyArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Issue(args) => commands::issue::run(args).await,
        Commands::Verify(args) => commands::verify::run(args).await,
    }
}
