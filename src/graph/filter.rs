//! # Graph Filters
//!
//! Filters produce new graph views; the parent graph is never modified.
//! Every filter is an instance of [`VersionGraph::derive`]:
//!
//! 1.  Keep the records that satisfy a predicate.
//! 2.  **Reconnect**: for each kept node whose predecessors in the parent
//!     graph were partly removed, walk each removed predecessor's primary
//!     chain until a kept node is reached, and record the combined list as
//!     an override edge of the view.
//! 3.  A kept node whose whole ancestry was removed becomes a designated
//!     root of the view.
//!
//! The view is then validated like any other graph, so a filtered graph is
//! always connected and acyclic.

use std::collections::BTreeSet;

use crate::config::FilterSettings;
use crate::error::Result;
use crate::graph::{GraphParts, VersionGraph};
use crate::mapping::MappingFlavour;
use crate::version::{SemverKey, VersionRecord};

impl VersionGraph {
    /// A view keeping the nodes matching `keep`, tagged with `tag`.
    pub fn derive<F>(&self, keep: F, tag: Option<String>) -> Result<VersionGraph>
    where
        F: Fn(&VersionRecord) -> bool,
    {
        let kept: BTreeSet<SemverKey> = self
            .iter()
            .filter(|v| keep(*v))
            .map(|v| v.semver().clone())
            .collect();

        let mut overrides = std::collections::BTreeMap::new();
        let mut roots: BTreeSet<SemverKey> = self
            .roots
            .iter()
            .filter(|key| kept.contains(*key))
            .cloned()
            .collect();

        for key in &kept {
            let parents = self.previous_keys(key);
            if parents.iter().all(|parent| kept.contains(parent)) {
                if let Some(existing) = self.overrides.get(key) {
                    overrides.insert(key.clone(), existing.clone());
                }
                continue;
            }

            let mut combined: Vec<SemverKey> = Vec::new();
            for parent in parents {
                if let Some(found) = self.nearest_kept(&parent, &kept) {
                    if !combined.contains(&found) {
                        combined.push(found);
                    }
                }
            }
            if combined.is_empty() {
                log::debug!("{} becomes a root of the filtered view", key);
                roots.insert(key.clone());
            }
            overrides.insert(key.clone(), combined);
        }

        let mut tags = self.tags.clone();
        tags.extend(tag);

        VersionGraph::assemble(GraphParts {
            linear: self
                .linear
                .iter()
                .filter(|(key, _)| kept.contains(*key))
                .map(|(key, record)| (key.clone(), record.clone()))
                .collect(),
            non_linear: self
                .non_linear
                .iter()
                .filter(|(key, _)| kept.contains(*key))
                .map(|(key, record)| (key.clone(), record.clone()))
                .collect(),
            overrides,
            branch_points: self.branch_points.clone(),
            roots,
            tags,
        })
    }

    /// First kept node on the primary chain starting at `start`.
    fn nearest_kept(&self, start: &SemverKey, kept: &BTreeSet<SemverKey>) -> Option<SemverKey> {
        let mut current = Some(start.clone());
        while let Some(key) = current {
            if kept.contains(&key) {
                return Some(key);
            }
            current = self.primary_key(&key);
        }
        None
    }

    /// Only versions on the linear mainline.
    pub fn filter_mainline(&self) -> Result<VersionGraph> {
        self.derive(|v| self.is_mainline(v), Some("mainline".to_string()))
    }

    /// Only stable releases.
    pub fn filter_stable(&self) -> Result<VersionGraph> {
        self.derive(VersionRecord::is_stable, Some("stable".to_string()))
    }

    /// Only snapshots and pending versions.
    pub fn filter_snapshots(&self) -> Result<VersionGraph> {
        self.derive(
            |v| v.is_snapshot() || v.is_pending(),
            Some("snapshot".to_string()),
        )
    }

    pub fn filter_min_version(&self, min: &SemverKey) -> Result<VersionGraph> {
        self.derive(|v| v.semver() >= min, Some(format!("min-{min}")))
    }

    pub fn filter_max_version(&self, max: &SemverKey) -> Result<VersionGraph> {
        self.derive(|v| v.semver() <= max, Some(format!("max-{max}")))
    }

    /// Only the listed versions, matched by id or semantic version.
    pub fn filter_only(&self, ids: &[String]) -> Result<VersionGraph> {
        if ids.is_empty() {
            return Ok(self.clone());
        }
        self.derive(
            |v| matches_any(v, ids),
            Some(format!("only-{}", ids.join("_"))),
        )
    }

    /// Everything except the listed versions, matched by id or semantic version.
    pub fn filter_exclude(&self, ids: &[String]) -> Result<VersionGraph> {
        if ids.is_empty() {
            return Ok(self.clone());
        }
        self.derive(
            |v| !matches_any(v, ids),
            Some(format!("exclude-{}", ids.join("_"))),
        )
    }

    /// Versions some flavour of `flavour` followed by `fallbacks` can remap.
    pub fn filter_mapping(
        &self,
        flavour: MappingFlavour,
        fallbacks: &[MappingFlavour],
    ) -> Result<VersionGraph> {
        self.derive(
            |v| flavour.effective_for(fallbacks, v).is_some(),
            None,
        )
    }
}

fn matches_any(version: &VersionRecord, ids: &[String]) -> bool {
    ids.iter()
        .any(|id| id == version.id() || id == version.semver().as_str())
}

/// Applies the configured filters in a fixed order: mainline, stable,
/// snapshots, min, max, only, exclude.
pub fn apply_filters(graph: &VersionGraph, settings: &FilterSettings) -> Result<VersionGraph> {
    let mut view = graph.clone();
    if settings.mainline_only {
        view = view.filter_mainline()?;
    }
    if settings.stable_only {
        view = view.filter_stable()?;
    }
    if settings.snapshots_only {
        view = view.filter_snapshots()?;
    }
    if let Some(min) = settings.min_key()? {
        view = view.filter_min_version(&min)?;
    }
    if let Some(max) = settings.max_key()? {
        view = view.filter_max_version(&max)?;
    }
    view = view.filter_only(&settings.only)?;
    view = view.filter_exclude(&settings.exclude)?;
    Ok(view)
}
