//! CLI entry point for aerial image detection and comparison

use aerial_watch::io::cli::{Cli, run};
use aerial_watch::io::logger::{init_with_level, level_for_verbosity};
use clap::Parser;

fn main() -> aerial_watch::Result<()> {
    let cli = Cli::parse();
    // A logger can only be missing here if one was already installed
    let _ = init_with_level(level_for_verbosity(cli.quiet, cli.verbose));
    run(cli)
}
