//! # Chronicle CLI
//!
//! This is the binary entry point for the `chronicle` command-line tool.
//!
//! Its responsibilities are parsing arguments with `clap`, dispatching to the
//! matching command and reporting the first error. All version, graph and
//! pipeline logic lives in the library crate.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
