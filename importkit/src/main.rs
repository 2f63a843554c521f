//! ImportKit command-line tool.
//!
//! Validates import configurations against the built-in feature catalog
//! and renders the SELECT text each table is imported with.

use anyhow::Result;
use clap::Parser;
use importkit::{Cli, run};
use importkit_core::initialize_payload_validator;
use importkit_core::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.global.verbose, cli.global.quiet)?;

    initialize_payload_validator()
        .map_err(|e| anyhow::anyhow!("Failed to initialize payload validator: {e}"))?;

    if !run(&cli).await? {
        std::process::exit(1);
    }

    Ok(())
}
