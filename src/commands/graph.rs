//! # Graph Command Implementation
//!
//! Displays the filtered version graph as a tree, one tree per root.
//!
//! Each lineage is listed in order. A side lineage is nested under the
//! version it forked from, so every version appears exactly once. Versions
//! with further predecessors are annotated with the versions they merge.
//! This command is read-only.

use anyhow::Result;
use clap::Args;
use ptree::{print_tree, TreeItem};
use std::borrow::Cow;

use chronicle::graph::VersionGraph;
use chronicle::version::VersionRecord;

use super::{load_config, FilterArgs, Session, SourceArgs};

/// Display the version graph as a tree
#[derive(Args, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Maximum nesting of side lineages to display.
    ///
    /// If not specified, displays every lineage. Use 0 to show only the
    /// lineages that start at a root.
    #[arg(long, value_name = "NUM")]
    pub depth: Option<usize>,
}

/// Execute the `graph` command.
pub fn execute(args: GraphArgs) -> Result<()> {
    let config = load_config(&args.source, &args.filters)?;
    let session = Session::open(config)?;
    let view = session.filtered()?;
    let max_depth = args.depth.unwrap_or(usize::MAX);

    for root in view.roots() {
        let tree = TreeNode {
            label: format!("lineage {}", root.branch_name()),
            children: lineage(&view, root, max_depth, 0),
        };
        print_tree(&tree).map_err(|e| anyhow::anyhow!("Failed to display tree: {}", e))?;
    }
    Ok(())
}

/// Versions of one lineage, in order, starting at `start`. Side lineages
/// forking from a version are nested under it.
fn lineage(
    graph: &VersionGraph,
    start: &VersionRecord,
    max_depth: usize,
    depth: usize,
) -> Vec<TreeNode> {
    let mut items = Vec::new();
    let mut current = Some(start);
    while let Some(version) = current {
        let mut continuation = None;
        let mut forks = Vec::new();
        for child in primary_children(graph, version) {
            let same_lineage = graph.is_mainline(child) == graph.is_mainline(version);
            if same_lineage && continuation.is_none() {
                continuation = Some(child);
            } else {
                forks.push(child);
            }
        }

        let children = if depth < max_depth {
            forks
                .into_iter()
                .map(|fork| TreeNode {
                    label: format!("branch {}", fork.branch_name()),
                    children: lineage(graph, fork, max_depth, depth + 1),
                })
                .collect()
        } else {
            Vec::new()
        };
        items.push(TreeNode {
            label: label(graph, version),
            children,
        });
        current = continuation;
    }
    items
}

/// Successors whose primary predecessor is `version`.
fn primary_children<'g>(graph: &'g VersionGraph, version: &VersionRecord) -> Vec<&'g VersionRecord> {
    graph
        .get_next(version)
        .into_iter()
        .filter(|child| {
            graph
                .get_previous(child)
                .is_some_and(|primary| primary.semver() == version.semver())
        })
        .collect()
}

/// `{id} ({semver})`, plus the versions it merges.
fn label(graph: &VersionGraph, version: &VersionRecord) -> String {
    let merged: Vec<&str> = graph
        .previous_nodes(version)
        .into_iter()
        .skip(1)
        .map(|p| p.id())
        .collect();
    let mut label = format!("{} ({})", version.id(), version.semver());
    if !merged.is_empty() {
        label.push_str(&format!(" [merges {}]", merged.join(", ")));
    }
    label
}

/// Tree node structure for ptree visualization
#[derive(Clone)]
struct TreeNode {
    label: String,
    children: Vec<TreeNode>,
}

impl TreeItem for TreeNode {
    type Child = TreeNode;

    fn write_self<W: std::io::Write>(
        &self,
        f: &mut W,
        _style: &ptree::Style,
    ) -> std::io::Result<()> {
        write!(f, "{}", self.label)
    }

    fn children(&self) -> Cow<'_, [Self::Child]> {
        Cow::Borrowed(&self.children)
    }
}
