//! # Versions Command Implementation
//!
//! Lists the versions of the filtered graph in processing order, one per
//! line, with their semantic version, lineage and predecessors. This is a
//! read-only operation; it resolves semantic versions (and persists them to
//! the semver cache) but never touches a repository.

use anyhow::Result;
use clap::Args;

use chronicle::graph::VersionGraph;
use chronicle::output::OutputConfig;
use chronicle::version::VersionRecord;

use super::{load_config, FilterArgs, Session, SourceArgs};

/// List versions in processing order
#[derive(Args, Debug)]
pub struct VersionsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Ignore the mapping flavour and filters and list every known version
    #[arg(long)]
    pub all: bool,

    /// Print only the ids of the root versions
    #[arg(long)]
    pub roots: bool,
}

/// Execute the `versions` command.
pub fn execute(args: VersionsArgs, output: &OutputConfig) -> Result<()> {
    let config = load_config(&args.source, &args.filters)?;
    let session = Session::open(config)?;
    let view = if args.all {
        session.graph.clone()
    } else {
        session.filtered()?
    };

    if args.roots {
        for root in view.roots() {
            println!("{}", root.id());
        }
        return Ok(());
    }

    for version in view.ordered() {
        println!("{}", format_line(&view, version, output));
    }
    if !view.tags().is_empty() {
        println!("filters: {}", view.tags().join(", "));
    }
    Ok(())
}

/// `{id}  {semver}  {lineage}  <- {predecessors}`
fn format_line(graph: &VersionGraph, version: &VersionRecord, output: &OutputConfig) -> String {
    let previous: Vec<&str> = graph
        .previous_nodes(version)
        .into_iter()
        .map(|p| p.id())
        .collect();
    let parents = if previous.is_empty() {
        "(root)".to_string()
    } else {
        previous.join(", ")
    };
    format!(
        "{:<24} {:<28} {:<8} <- {}",
        version.id(),
        version.semver().to_string(),
        output.lineage(graph.is_mainline(version)),
        parents
    )
}
