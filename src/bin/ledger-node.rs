#![forbid(unsafe_code)]
//! Runs a LedgerChain node: ledger, HTTP API, optional auto-mining and
//! neighbor discovery. Stops on Ctrl-C.

use clap::Parser;
use ledgerchain::config::load_config;
use ledgerchain::node::Node;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,
    /// Overrides `network.api_port`
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(port) = cli.port {
        config.network.api_port = port;
    }

    let node = Arc::new(Node::init(config)?);
    node.start().await?;

    Ok(())
}
