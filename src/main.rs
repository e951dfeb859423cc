//! `vuid`: extract "Valid Usage" statements and keep their identifiers stable.

use clap::Parser;

mod cli;

fn main() -> anyhow::Result<()> {
    cli::Cli::parse().run()
}
