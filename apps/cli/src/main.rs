//! manualkit CLI: turn an ordered set of XML manual fragments into one
//! document, its HTML and Markdown renderings, and retrieval-sized chunks.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli)
}
