//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use chronicle::output::OutputConfig;

use crate::commands;

/// Chronicle - rebuild a game's release history as a git repository
#[derive(Parser, Debug)]
#[command(name = "chronicle")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process every version of the filtered graph and commit it
    Run(commands::run::RunArgs),

    /// List versions in processing order
    Versions(commands::versions::VersionsArgs),

    /// Display the version graph as a tree
    Graph(commands::graph::GraphArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.log_level.as_str()),
        )
        .try_init();
        let output = OutputConfig::from_env_and_flag(&self.color);

        match self.command {
            Commands::Run(args) => commands::run::execute(args, &output),
            Commands::Versions(args) => commands::versions::execute(args, &output),
            Commands::Graph(args) => commands::graph::execute(args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
