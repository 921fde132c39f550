//! vcanchor issuer node: entry point.
//!
//! Starts the issuer node with configuration from a TOML file, environment
//! variables and command-line overrides.

mod api;
mod config;
mod node;
mod storage;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::{LedgerMode, VcanchorConfig};
use node::IssuerNode;

/// vcanchor issuer node
#[derive(Parser, Debug)]
#[command(name = "vcanchor-node", version, about = "vcanchor issuer node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "vcanchor.toml")]
    config: PathBuf,

    /// Override the API port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Use the in-process ledger instead of the EVM registry.
    #[arg(long)]
    memory_ledger: bool,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Override the log format (text, json).
    #[arg(long)]
    log_format: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        init_tracing(args.log_level.as_deref().unwrap_or("info"), "text");
        let config = VcanchorConfig::default();
        config.save(&args.config)?;
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    let mut config = VcanchorConfig::load(&args.config)?;
    config.apply_env();

    // Apply CLI overrides
    if let Some(api_port) = args.api_port {
        config.api.port = api_port;
    }
    if let Some(ref data_dir) = args.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    if args.memory_ledger {
        config.ledger.mode = LedgerMode::Memory;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }

    init_tracing(&config.logging.level, &config.logging.format);
    tracing::info!("vcanchor issuer node v{}", env!("CARGO_PKG_VERSION"));

    let node = IssuerNode::new(config).await?;

    // Graceful shutdown on SIGINT
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("received shutdown signal"),
            Err(e) => tracing::error!(error = %e, "failed to listen for ctrl-c"),
        }
    };

    if let Err(e) = node.run(shutdown).await {
        tracing::error!(error = %e, "issuer node stopped with an error");
        return Err(e);
    }

    tracing::info!("vcanchor node exited cleanly");
    Ok(())
}
