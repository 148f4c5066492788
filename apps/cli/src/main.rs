//! Expert base builder CLI.
//!
//! Aggregates researcher profiles from the ORCID registry into a local
//! store, merges CSV overrides, and renders Quarto pages and listings.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
