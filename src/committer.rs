//! # Repository Committer
//!
//! Turns the artifacts of one processed version into exactly one commit in
//! the target repository, preserving the shape of the version graph: linear
//! versions advance the mainline branch, side lineages get their own
//! branches, and versions with several predecessors become merge commits.
//!
//! ## Process
//!
//! 1.  **Replay check**: a commit carrying the version's canonical message
//!     anywhere in the repository means the version is already recorded.
//! 2.  **Branch selection**: roots start a new (orphan) branch; other
//!     versions continue the branch of their primary predecessor, creating it
//!     at that predecessor's commit when needed.
//! 3.  **Ordering check**: the branch tip must be one of the version's
//!     predecessors. Remaining predecessors become extra merge parents.
//! 4.  **Materialize**: the working tree is cleared and rebuilt from the
//!     decompiled sources and the resource subtrees selected in
//!     [`ArtifactSettings`].
//! 5.  **Commit**: everything is staged and committed with the configured
//!     identity, dated at the version's release time.

use std::path::Path;

use crate::config::{ArtifactSettings, GitSettings};
use crate::error::{Error, Result};
use crate::filesystem;
use crate::git::CommitIdentity;
use crate::graph::VersionGraph;
use crate::pipeline::paths::ArtifactPaths;
use crate::pipeline::steps::AssetIndex;
use crate::pipeline::{ArtifactKey, PipelineCache, StepStatus};
use crate::repository::VcsOperations;
use crate::version::VersionRecord;

const SOURCES_DIR: &str = "minecraft/src";
const ASSETS_DIR: &str = "minecraft/resources/assets";
const DATA_DIR: &str = "minecraft/resources/data";
const EXTERNAL_ASSETS_DIR: &str = "minecraft/external-resources/assets";
const DATAGEN_DIR: &str = "minecraft/resources/datagen-reports";

/// Records processed versions in the target repository.
pub struct Committer {
    vcs: Box<dyn VcsOperations>,
    git: GitSettings,
    artifacts: ArtifactSettings,
    paths: ArtifactPaths,
}

impl Committer {
    pub fn new(
        vcs: Box<dyn VcsOperations>,
        git: GitSettings,
        artifacts: ArtifactSettings,
        paths: ArtifactPaths,
    ) -> Self {
        Self {
            vcs,
            git,
            artifacts,
            paths,
        }
    }

    pub fn repository(&self) -> &Path {
        self.vcs.root()
    }

    /// Whether a commit for `version` already exists.
    pub fn is_committed(&self, version: &VersionRecord) -> Result<bool> {
        Ok(self
            .vcs
            .find_commit_by_message(&version.commit_message())?
            .is_some())
    }

    /// Commits `version` using the artifacts registered in `cache`.
    pub fn commit(
        &self,
        version: &VersionRecord,
        graph: &VersionGraph,
        cache: &PipelineCache,
    ) -> Result<StepStatus> {
        if self.is_committed(version)? {
            log::debug!("{} is already committed", version.id());
            return Ok(StepStatus::UpToDate);
        }

        let target = self.target_branch(version, graph);
        self.prepare_branch(version, graph, &target)?;
        self.materialize(version, cache)?;

        if self.artifacts.sort_json {
            let sorted = filesystem::sort_json_files(self.vcs.root());
            log::debug!("Sorted {} JSON files", sorted);
        }

        self.vcs.stage_all()?;
        self.vcs
            .commit(&version.commit_message(), &self.identity(version))?;
        log::info!("Committed {} to {}", version.id(), target);

        self.create_version_branch(version, graph)?;
        Ok(StepStatus::Success)
    }

    fn target_branch(&self, version: &VersionRecord, graph: &VersionGraph) -> String {
        let is_primary_root =
            graph.primary_root().map(VersionRecord::semver) == Some(version.semver());
        let secondary_root = graph.is_root(version) && !is_primary_root;
        if !graph.is_mainline(version) || secondary_root {
            version.branch_name()
        } else {
            self.git.mainline_branch.clone()
        }
    }

    /// Points HEAD at `target` and records any extra merge parents.
    fn prepare_branch(
        &self,
        version: &VersionRecord,
        graph: &VersionGraph,
        target: &str,
    ) -> Result<()> {
        let is_root = graph.is_root(version);

        if !self.vcs.has_head()? {
            if !is_root {
                return Err(Error::NonRootInEmptyRepository {
                    version: version.id().to_string(),
                });
            }
            self.vcs.write_merge_heads(&[])?;
            return self.vcs.switch_branch(target);
        }

        if is_root {
            if self.vcs.branch_exists(target)? {
                return Err(Error::RootBranchExists {
                    version: version.id().to_string(),
                    branch: target.to_string(),
                });
            }
            self.vcs.write_merge_heads(&[])?;
            return self.vcs.switch_branch(target);
        }

        let predecessors = graph.previous_nodes(version);
        if self.vcs.current_branch()?.as_deref() != Some(target) {
            if !self.vcs.branch_exists(target)? {
                let primary = predecessors
                    .first()
                    .ok_or_else(|| Error::NonRootInEmptyRepository {
                        version: version.id().to_string(),
                    })?;
                let branch_point = self.commit_of(primary, version)?;
                log::debug!(
                    "Creating branch {} at {} ({})",
                    target,
                    primary.id(),
                    branch_point
                );
                self.vcs.create_branch(target, &branch_point)?;
            }
            self.vcs.switch_branch(target)?;
        }

        let tip = self.vcs.tip_message()?;
        let tip_index = predecessors
            .iter()
            .position(|p| tip.as_deref() == Some(p.commit_message().as_str()));
        let Some(tip_index) = tip_index else {
            return Err(Error::OrderingMismatch {
                version: version.id().to_string(),
                expected: predecessors
                    .iter()
                    .map(|p| p.id())
                    .collect::<Vec<_>>()
                    .join(", "),
                found: tip,
            });
        };

        let mut merge_heads = Vec::new();
        for (index, other) in predecessors.iter().enumerate() {
            if index != tip_index {
                merge_heads.push(self.commit_of(other, version)?);
            }
        }
        if !merge_heads.is_empty() {
            log::debug!(
                "{} merges {} additional parent(s)",
                version.id(),
                merge_heads.len()
            );
        }
        self.vcs.write_merge_heads(&merge_heads)
    }

    fn commit_of(&self, predecessor: &VersionRecord, version: &VersionRecord) -> Result<String> {
        self.vcs
            .find_commit_by_message(&predecessor.commit_message())?
            .ok_or_else(|| Error::MissingBranchPoint {
                predecessor: predecessor.id().to_string(),
                version: version.id().to_string(),
            })
    }

    /// Rebuilds the working tree from the version's artifacts.
    fn materialize(&self, version: &VersionRecord, cache: &PipelineCache) -> Result<()> {
        let root = self.vcs.root();
        let sources = cache.require(ArtifactKey::DecompiledSources, version)?;

        filesystem::clear_tree(root)?;
        let count = filesystem::extract_prefix(sources, "", &root.join(SOURCES_DIR))?;
        log::debug!("Extracted {} source files for {}", count, version.id());

        let jar = cache
            .first_of(&[ArtifactKey::MergedObfuscatedJar, ArtifactKey::ClientJar])
            .map(|(_, path)| path);
        if let Some(jar) = jar {
            if self.artifacts.load_assets {
                filesystem::extract_prefix(jar, "assets", &root.join(ASSETS_DIR))?;
            }
            if self.artifacts.load_datapack {
                filesystem::extract_prefix(jar, "data", &root.join(DATA_DIR))?;
            }
        }

        if self.artifacts.load_assets_extern {
            if let Some(index) = cache.artifact(ArtifactKey::AssetIndex) {
                self.place_asset_objects(version, index, &root.join(EXTERNAL_ASSETS_DIR))?;
            }
        }

        if let Some(reports) = cache.artifact(ArtifactKey::DatagenReports) {
            filesystem::extract_prefix(reports, "reports", &root.join(DATAGEN_DIR))?;
        }
        Ok(())
    }

    fn place_asset_objects(&self, version: &VersionRecord, index: &Path, dest: &Path) -> Result<()> {
        let hardlink = self.artifacts.use_hardlinks && !self.artifacts.sort_json;
        let listed = AssetIndex::read(index)?;
        for (name, object) in &listed.objects {
            let source = self.paths.asset_object(&object.hash);
            if !source.is_file() {
                return Err(Error::MissingArtifact {
                    version: version.id().to_string(),
                    artifact: format!("asset object {} ({})", name, object.hash),
                });
            }
            filesystem::link_or_copy(&source, &dest.join(name), hardlink)?;
        }
        Ok(())
    }

    fn identity(&self, version: &VersionRecord) -> CommitIdentity {
        let time = version.release_time();
        CommitIdentity {
            name: self.git.user.clone(),
            email: self.git.email.clone(),
            date: format!("{} {}", time.timestamp(), time.format("%z")),
        }
    }

    fn create_version_branch(&self, version: &VersionRecord, graph: &VersionGraph) -> Result<()> {
        let wanted = (self.git.create_version_branches && graph.is_mainline(version))
            || (self.git.create_stable_version_branches && version.is_stable());
        if !wanted {
            return Ok(());
        }
        let branch = version.branch_name();
        if self.vcs.branch_exists(&branch)? {
            return Ok(());
        }
        if let Some(head) = self.vcs.find_commit_by_message(&version.commit_message())? {
            self.vcs.create_branch(&branch, &head)?;
        }
        Ok(())
    }
}
