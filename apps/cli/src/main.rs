//! drivedocs CLI: turn a Drive folder into knowledge-base records.
//!
//! Lists the folder, reads each document, derives title, URL, leader flag
//! and keyword tags, and writes one JSON record per document.

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
