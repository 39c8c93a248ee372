//! site2skill CLI: turn a documentation website into a packaged skill.
//!
//! Mirrors the site with wget, converts every page to Markdown with
//! provenance front matter, and bundles the result into a `.skill` archive.

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
