//! # Version Graph
//!
//! The graph places every resolved version relative to its predecessors. Most
//! versions form one linear chain ordered by semantic version (the
//! mainline); a few historical builds forked off it (April fools builds,
//! combat tests, experimental snapshots) and are kept in a separate
//! non-linear set whose edges come from the branch-point table.
//!
//! ## Predecessors
//!
//! `previous_nodes(v)` answers "what came directly before `v`", in priority
//! order:
//!
//! 1.  **Override edges**: explicit edges recorded on the graph, either from
//!     declared parents or from reconnection in a filtered view.
//! 2.  **Branch points**: the quirks table. An empty entry marks a declared
//!     root; otherwise the listed parents present in the graph are returned.
//! 3.  **Linear order**: for a mainline version, the nearest lesser mainline
//!     version.
//!
//! Only nodes present in the graph are ever returned. The first element is
//! the primary predecessor; more than one element makes `v` a merge point.
//!
//! ## Invariants
//!
//! Every graph, including every filtered view, is validated on construction:
//! each parentless node must be the lowest mainline version, a declared
//! root, or a designated root of the view, and the predecessor relation must
//! be acyclic. The topological order is computed once with Kahn's algorithm,
//! always releasing the smallest ready key first, so it never depends on
//! hash order.

pub mod filter;

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::mapping::MappingFlavour;
use crate::quirks::{BranchPoints, Quirks};
use crate::version::{SemverKey, VersionRecord};

pub use self::filter::apply_filters;

/// Snapshot ids that belong on the mainline: weekly snapshots, pre-releases
/// and release candidates.
const LINEAR_SNAPSHOT_PATTERN: &str =
    r"(^\d\dw\d\d[a-z]$)|(^\d.\d+(.\d+)?(-(pre|rc)\d+|_[a-z_\-]+snapshot-\d+| Pre-Release \d+)?$)";

type Nodes = BTreeMap<SemverKey, Arc<VersionRecord>>;

#[derive(Debug, Clone)]
pub struct VersionGraph {
    linear: Nodes,
    non_linear: Nodes,
    overrides: BTreeMap<SemverKey, Vec<SemverKey>>,
    branch_points: Arc<BranchPoints>,
    roots: BTreeSet<SemverKey>,
    tags: Vec<String>,
    ids: HashMap<String, SemverKey>,
    children: BTreeMap<SemverKey, Vec<SemverKey>>,
    order: Vec<SemverKey>,
}

/// Parts a graph is assembled from; shared by `build` and filtered views.
struct GraphParts {
    linear: Nodes,
    non_linear: Nodes,
    overrides: BTreeMap<SemverKey, Vec<SemverKey>>,
    branch_points: Arc<BranchPoints>,
    roots: BTreeSet<SemverKey>,
    tags: Vec<String>,
}

impl VersionGraph {
    /// Builds and validates the graph of all `records`.
    pub fn build(records: Vec<VersionRecord>, quirks: &Quirks) -> Result<Self> {
        let linear_snapshot = Regex::new(LINEAR_SNAPSHOT_PATTERN)?;
        let mut linear = Nodes::new();
        let mut non_linear = Nodes::new();
        let mut ids: HashMap<String, SemverKey> = HashMap::new();

        for record in records {
            let key = record.semver().clone();
            let existing = linear.get(&key).or_else(|| non_linear.get(&key));
            if let Some(existing) = existing {
                return Err(Error::DuplicateVersionKey {
                    key: key.to_string(),
                    first: existing.id().to_string(),
                    second: record.id().to_string(),
                });
            }
            ids.insert(record.id().to_string(), key.clone());

            let branch_candidate = record.is_snapshot() || record.is_pending();
            let is_non_linear = branch_candidate
                && (quirks.is_forced_non_linear(record.id())
                    || (record.descriptor().parents.is_empty()
                        && !linear_snapshot.is_match(record.id())));
            let target = if is_non_linear {
                &mut non_linear
            } else {
                &mut linear
            };
            target.insert(key, Arc::new(record));
        }

        let mut overrides = BTreeMap::new();
        let branch_points = Arc::clone(quirks.branch_points());
        for record in linear.values().chain(non_linear.values()) {
            let declared = &record.descriptor().parents;
            if declared.is_empty() || branch_points.parents(record.semver()).is_some() {
                continue;
            }
            let parents: Vec<SemverKey> = declared
                .iter()
                .filter_map(|id| match ids.get(id) {
                    Some(key) => Some(key.clone()),
                    None => {
                        log::debug!("Ignoring unknown parent {} of {}", id, record.id());
                        None
                    }
                })
                .collect();
            if !parents.is_empty() {
                overrides.insert(record.semver().clone(), parents);
            }
        }

        log::debug!(
            "Classified {} mainline and {} non-linear versions",
            linear.len(),
            non_linear.len()
        );

        Self::assemble(GraphParts {
            linear,
            non_linear,
            overrides,
            branch_points,
            roots: BTreeSet::new(),
            tags: Vec::new(),
        })
    }

    fn assemble(parts: GraphParts) -> Result<Self> {
        let ids = parts
            .linear
            .values()
            .chain(parts.non_linear.values())
            .map(|record| (record.id().to_string(), record.semver().clone()))
            .collect();

        let mut graph = Self {
            linear: parts.linear,
            non_linear: parts.non_linear,
            overrides: parts.overrides,
            branch_points: parts.branch_points,
            roots: parts.roots,
            tags: parts.tags,
            ids,
            children: BTreeMap::new(),
            order: Vec::new(),
        };
        graph.check_roots()?;
        graph.compute_order()?;
        Ok(graph)
    }

    fn check_roots(&self) -> Result<()> {
        let lowest_linear = self.linear.keys().next();
        let disconnected: Vec<String> = self
            .keys()
            .filter(|key| self.previous_keys(key).is_empty())
            .filter(|key| {
                Some(*key) != lowest_linear
                    && !self.branch_points.is_declared_root(key)
                    && !self.roots.contains(*key)
            })
            .map(|key| self.describe(key))
            .collect();
        if disconnected.is_empty() {
            Ok(())
        } else {
            Err(Error::GraphDisconnected {
                versions: disconnected.join(", "),
            })
        }
    }

    fn compute_order(&mut self) -> Result<()> {
        let mut children: BTreeMap<SemverKey, Vec<SemverKey>> = BTreeMap::new();
        let mut in_degree: BTreeMap<SemverKey, usize> = BTreeMap::new();
        for key in self.keys() {
            let parents = self.previous_keys(key);
            in_degree.insert(key.clone(), parents.len());
            for parent in parents {
                children.entry(parent).or_default().push(key.clone());
            }
        }
        for list in children.values_mut() {
            list.sort();
        }

        let mut ready: BTreeSet<SemverKey> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(key, _)| key.clone())
            .collect();
        let mut order = Vec::with_capacity(in_degree.len());
        while let Some(key) = ready.pop_first() {
            for child in children.get(&key).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.insert(child.clone());
                    }
                }
            }
            order.push(key);
        }

        if order.len() != in_degree.len() {
            let placed: BTreeSet<&SemverKey> = order.iter().collect();
            let stuck: Vec<String> = in_degree
                .keys()
                .filter(|key| !placed.contains(key))
                .map(|key| self.describe(key))
                .collect();
            return Err(Error::GraphCycle {
                versions: stuck.join(", "),
            });
        }

        self.children = children;
        self.order = order;
        Ok(())
    }

    fn describe(&self, key: &SemverKey) -> String {
        match self.get_by_key(key) {
            Some(record) if record.id() != key.as_str() => format!("{} ({})", record.id(), key),
            _ => key.to_string(),
        }
    }

    fn keys(&self) -> impl Iterator<Item = &SemverKey> {
        self.linear.keys().chain(self.non_linear.keys())
    }

    fn record_arc(&self, key: &SemverKey) -> Option<&Arc<VersionRecord>> {
        self.linear.get(key).or_else(|| self.non_linear.get(key))
    }

    /// Predecessor keys of `key`, in priority order.
    pub(crate) fn previous_keys(&self, key: &SemverKey) -> Vec<SemverKey> {
        if let Some(parents) = self.overrides.get(key) {
            return parents
                .iter()
                .filter(|parent| self.contains(parent))
                .cloned()
                .collect();
        }
        if let Some(parents) = self.branch_points.parents(key) {
            if parents.is_empty() {
                return Vec::new();
            }
            let present: Vec<SemverKey> = parents
                .iter()
                .filter(|parent| self.contains(parent))
                .cloned()
                .collect();
            if !present.is_empty() {
                return present;
            }
        }
        if self.linear.contains_key(key) {
            return self
                .linear
                .range(..key.clone())
                .next_back()
                .map(|(previous, _)| vec![previous.clone()])
                .unwrap_or_default();
        }
        Vec::new()
    }

    pub(crate) fn primary_key(&self, key: &SemverKey) -> Option<SemverKey> {
        self.previous_keys(key).into_iter().next()
    }

    /// Every predecessor of `version`; the first one is the primary.
    pub fn previous_nodes(&self, version: &VersionRecord) -> Vec<&VersionRecord> {
        self.previous_keys(version.semver())
            .iter()
            .filter_map(|key| self.get_by_key(key))
            .collect()
    }

    /// The primary predecessor of `version`.
    pub fn get_previous(&self, version: &VersionRecord) -> Option<&VersionRecord> {
        self.primary_key(version.semver())
            .and_then(|key| self.get_by_key(&key))
    }

    /// Every node that lists `version` among its predecessors.
    pub fn get_next(&self, version: &VersionRecord) -> Vec<&VersionRecord> {
        self.children
            .get(version.semver())
            .into_iter()
            .flatten()
            .filter_map(|key| self.get_by_key(key))
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<&VersionRecord> {
        self.ids.get(id).and_then(|key| self.get_by_key(key))
    }

    pub fn get_by_key(&self, key: &SemverKey) -> Option<&VersionRecord> {
        self.record_arc(key).map(Arc::as_ref)
    }

    pub fn contains(&self, key: &SemverKey) -> bool {
        self.linear.contains_key(key) || self.non_linear.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.linear.len() + self.non_linear.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Versions in topological order.
    pub fn ordered(&self) -> Vec<&VersionRecord> {
        self.iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VersionRecord> {
        self.order.iter().filter_map(|key| self.get_by_key(key))
    }

    /// Nodes without predecessors, in topological order.
    pub fn roots(&self) -> Vec<&VersionRecord> {
        self.iter().filter(|v| self.is_root(v)).collect()
    }

    /// The root the mainline grows from.
    pub fn primary_root(&self) -> Option<&VersionRecord> {
        let lowest_linear = self
            .linear
            .values()
            .next()
            .map(Arc::as_ref)
            .filter(|v| self.is_root(v));
        lowest_linear.or_else(|| self.roots().into_iter().next())
    }

    pub fn is_root(&self, version: &VersionRecord) -> bool {
        self.previous_keys(version.semver()).is_empty()
    }

    /// Whether `version` sits on the linear mainline.
    pub fn is_mainline(&self, version: &VersionRecord) -> bool {
        self.linear.contains_key(version.semver())
    }

    /// `version` followed by its primary ancestors down to a root.
    pub fn walk_to_root(&self, version: &VersionRecord) -> Vec<&VersionRecord> {
        let mut chain = Vec::new();
        let mut current = self.get_by_key(version.semver());
        while let Some(node) = current {
            chain.push(node);
            current = self.get_previous(node);
        }
        chain
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn override_edges(&self, version: &VersionRecord) -> Option<&[SemverKey]> {
        self.overrides.get(version.semver()).map(Vec::as_slice)
    }

    pub fn branch_points(&self) -> &Arc<BranchPoints> {
        &self.branch_points
    }

    /// Repository name suffix: flavour, fallback flavours and tags joined by `-`.
    pub fn repo_tags_identifier(
        &self,
        flavour: MappingFlavour,
        fallbacks: &[MappingFlavour],
    ) -> String {
        std::iter::once(flavour.as_str().to_string())
            .chain(fallbacks.iter().map(|f| f.as_str().to_string()))
            .chain(self.tags.iter().cloned())
            .collect::<Vec<_>>()
            .join("-")
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::version::fixtures::{named_snapshot, release};

    /// Three mainline releases plus a side branch forked from `1.1.0`.
    pub fn scenario() -> (Vec<VersionRecord>, Quirks) {
        let quirks =
            Quirks::from_yaml("branch_points:\n  \"1.1.1-side.1\": [\"1.1.0\"]\n").unwrap();
        let records = vec![
            release("1.0.0", 0),
            release("1.1.0", 10),
            release("1.2.0", 20),
            named_snapshot("side-build", "1.1.1-side.1", 15),
        ];
        (records, quirks)
    }
}
