//! addrsync CLI — reconcile generated addresses against assigned ones.
//!
//! Computes the generated addresses that are not yet assigned and inserts
//! them into the destination collection.

mod commands;
mod stores;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::load_dotenv()?;
    commands::run(cli).await
}
