//! # Artifact Pipeline
//!
//! Each version runs through the same declared list of [`Step`]s: fetch,
//! merge, remap, patch, decompile, datagen and commit. The runner owns the
//! control flow; steps only describe what they need and what they produce.
//!
//! ## Process
//!
//! For each step, in order:
//!
//! 1.  **Preconditions**: a step that does not apply to the version (no
//!     server jar, mapping unavailable, repository disabled) records
//!     [`StepStatus::NotRun`].
//! 2.  **Up-to-date check**: when every output is already valid on disk the
//!     step records [`StepStatus::UpToDate`] and its outputs are registered
//!     for later steps without running anything.
//! 3.  **Run**: otherwise the step runs and the artifacts it reports are
//!     registered in the per-version [`PipelineCache`].
//!
//! Any error aborts the version; nothing is committed for it. Versions are
//! processed strictly sequentially in topological order, so the commit of a
//! predecessor always exists before its successors run.

pub mod paths;
pub mod steps;
pub mod tools;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ChronicleConfig;
use crate::error::{Error, Result};
use crate::graph::VersionGraph;
use crate::mapping::MappingFlavour;
use crate::version::VersionRecord;

use self::paths::ArtifactPaths;

/// Result of one step for one version. Failure is an `Err`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepStatus {
    Success,
    UpToDate,
    NotRun,
}

impl StepStatus {
    /// Combines the statuses of several parts of a step.
    ///
    /// `Success` wins over `UpToDate`, which wins over `NotRun`; no parts at
    /// all yields `NotRun`.
    pub fn merge<I>(parts: I) -> StepStatus
    where
        I: IntoIterator<Item = StepStatus>,
    {
        parts
            .into_iter()
            .fold(StepStatus::NotRun, |acc, part| match (acc, part) {
                (StepStatus::Success, _) | (_, StepStatus::Success) => StepStatus::Success,
                (StepStatus::UpToDate, _) | (_, StepStatus::UpToDate) => StepStatus::UpToDate,
                _ => StepStatus::NotRun,
            })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Success => "success",
            StepStatus::UpToDate => "up-to-date",
            StepStatus::NotRun => "not-run",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepName {
    FetchArtifacts,
    FetchMappings,
    FetchAssets,
    MergeObfuscated,
    Remap,
    MergeMapped,
    ApplyExceptions,
    ApplySignatures,
    ApplyNests,
    Decompile,
    Datagen,
    Commit,
}

impl StepName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::FetchArtifacts => "fetch-artifacts",
            StepName::FetchMappings => "fetch-mappings",
            StepName::FetchAssets => "fetch-assets",
            StepName::MergeObfuscated => "merge-obfuscated",
            StepName::Remap => "remap",
            StepName::MergeMapped => "merge-mapped",
            StepName::ApplyExceptions => "apply-exceptions",
            StepName::ApplySignatures => "apply-signatures",
            StepName::ApplyNests => "apply-nests",
            StepName::Decompile => "decompile",
            StepName::Datagen => "datagen",
            StepName::Commit => "commit",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named output of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArtifactKey {
    ClientJar,
    ServerJar,
    ClientMappings,
    ServerMappings,
    AssetIndex,
    AssetObjects,
    MergedObfuscatedJar,
    RemappedClientJar,
    RemappedServerJar,
    RemappedMergedJar,
    MergedMappedJar,
    ExceptionsPatchedJar,
    SignaturesPatchedJar,
    NestsPatchedJar,
    DecompiledSources,
    DatagenReports,
}

impl ArtifactKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKey::ClientJar => "client jar",
            ArtifactKey::ServerJar => "server jar",
            ArtifactKey::ClientMappings => "client mappings",
            ArtifactKey::ServerMappings => "server mappings",
            ArtifactKey::AssetIndex => "asset index",
            ArtifactKey::AssetObjects => "asset objects",
            ArtifactKey::MergedObfuscatedJar => "merged obfuscated jar",
            ArtifactKey::RemappedClientJar => "remapped client jar",
            ArtifactKey::RemappedServerJar => "remapped server jar",
            ArtifactKey::RemappedMergedJar => "remapped merged jar",
            ArtifactKey::MergedMappedJar => "merged mapped jar",
            ArtifactKey::ExceptionsPatchedJar => "exceptions-patched jar",
            ArtifactKey::SignaturesPatchedJar => "signatures-patched jar",
            ArtifactKey::NestsPatchedJar => "nests-patched jar",
            ArtifactKey::DecompiledSources => "decompiled sources",
            ArtifactKey::DatagenReports => "datagen reports",
        }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-version record of produced artifacts and step statuses.
#[derive(Debug, Default, Clone)]
pub struct PipelineCache {
    artifacts: BTreeMap<ArtifactKey, PathBuf>,
    statuses: BTreeMap<StepName, StepStatus>,
}

impl PipelineCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.artifacts.clear();
        self.statuses.clear();
    }

    pub fn artifact(&self, key: ArtifactKey) -> Option<&Path> {
        self.artifacts.get(&key).map(PathBuf::as_path)
    }

    pub fn insert_artifact(&mut self, key: ArtifactKey, path: PathBuf) {
        self.artifacts.insert(key, path);
    }

    /// The artifact for `key`, or `Error::MissingArtifact`.
    pub fn require(&self, key: ArtifactKey, version: &VersionRecord) -> Result<&Path> {
        self.artifact(key).ok_or_else(|| Error::MissingArtifact {
            version: version.id().to_string(),
            artifact: key.to_string(),
        })
    }

    /// First available artifact among `keys`, in order.
    pub fn first_of(&self, keys: &[ArtifactKey]) -> Option<(ArtifactKey, &Path)> {
        keys.iter()
            .find_map(|key| self.artifact(*key).map(|path| (*key, path)))
    }

    pub fn status(&self, name: StepName) -> Option<StepStatus> {
        self.statuses.get(&name).copied()
    }

    pub fn record_status(&mut self, name: StepName, status: StepStatus) {
        self.statuses.insert(name, status);
    }
}

/// What a step reports after running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub status: StepStatus,
    pub artifacts: Vec<(ArtifactKey, PathBuf)>,
}

impl StepOutcome {
    pub fn success(artifacts: Vec<(ArtifactKey, PathBuf)>) -> Self {
        Self {
            status: StepStatus::Success,
            artifacts,
        }
    }

    pub fn not_run() -> Self {
        Self {
            status: StepStatus::NotRun,
            artifacts: Vec::new(),
        }
    }

    pub fn with_status(status: StepStatus, artifacts: Vec<(ArtifactKey, PathBuf)>) -> Self {
        Self { status, artifacts }
    }
}

/// Everything a step may read about the version being processed.
pub struct PipelineContext<'a> {
    pub version: &'a VersionRecord,
    pub graph: &'a VersionGraph,
    pub config: &'a ChronicleConfig,
    pub paths: &'a ArtifactPaths,
}

impl PipelineContext<'_> {
    /// The configured flavour or the first fallback that covers this version.
    pub fn flavour(&self) -> Option<MappingFlavour> {
        self.config
            .mapping
            .effective_for(&self.config.fallback_mappings, self.version)
    }
}

/// One stage of the per-version pipeline.
pub trait Step {
    fn name(&self) -> StepName;

    /// Whether the step applies to this version at all.
    fn preconditions_should_run(&self, _ctx: &PipelineContext<'_>) -> bool {
        true
    }

    /// Paths this step produces for the version.
    fn outputs(&self, ctx: &PipelineContext<'_>) -> Vec<(ArtifactKey, PathBuf)>;

    /// Whether the outputs are already present and valid.
    fn is_up_to_date(&self, ctx: &PipelineContext<'_>) -> Result<bool> {
        let outputs = self.outputs(ctx);
        Ok(!outputs.is_empty() && outputs.iter().all(|(_, path)| paths::is_valid_output(path)))
    }

    fn run(&self, ctx: &PipelineContext<'_>, cache: &PipelineCache) -> Result<StepOutcome>;
}

/// Statuses of every step for one version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub version: String,
    pub steps: Vec<(StepName, StepStatus)>,
}

impl PipelineReport {
    pub fn aggregate(&self) -> StepStatus {
        StepStatus::merge(self.steps.iter().map(|(_, status)| *status))
    }

    pub fn status_of(&self, name: StepName) -> Option<StepStatus> {
        self.steps
            .iter()
            .find(|(step, _)| *step == name)
            .map(|(_, status)| *status)
    }
}

pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl Pipeline {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Self {
        Self { steps }
    }

    pub fn step_names(&self) -> Vec<StepName> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Runs every step for `ctx.version` with a fresh cache.
    pub fn run_version(&self, ctx: &PipelineContext<'_>) -> Result<PipelineReport> {
        let mut cache = PipelineCache::new();
        let mut report = PipelineReport {
            version: ctx.version.id().to_string(),
            steps: Vec::with_capacity(self.steps.len()),
        };

        for step in &self.steps {
            let name = step.name();
            let status = if !step.preconditions_should_run(ctx) {
                StepStatus::NotRun
            } else if step.is_up_to_date(ctx)? {
                for (key, path) in step.outputs(ctx) {
                    if path.exists() {
                        cache.insert_artifact(key, path);
                    }
                }
                StepStatus::UpToDate
            } else {
                let outcome = step.run(ctx, &cache)?;
                for (key, path) in outcome.artifacts {
                    cache.insert_artifact(key, path);
                }
                outcome.status
            };
            log::debug!("{} {}: {}", ctx.version.id(), name, status);
            cache.record_status(name, status);
            report.steps.push((name, status));
        }

        Ok(report)
    }

    /// Runs every version of `graph` in topological order.
    ///
    /// `on_version` sees each report as soon as its version completes; the
    /// first error stops the run.
    pub fn run_graph<F>(
        &self,
        graph: &VersionGraph,
        config: &ChronicleConfig,
        paths: &ArtifactPaths,
        mut on_version: F,
    ) -> Result<Vec<PipelineReport>>
    where
        F: FnMut(&PipelineReport),
    {
        let mut reports = Vec::with_capacity(graph.len());
        for version in graph.ordered() {
            let ctx = PipelineContext {
                version,
                graph,
                config,
                paths,
            };
            let report = self.run_version(&ctx)?;
            log::info!("{}: {}", version.id(), report.aggregate());
            on_version(&report);
            reports.push(report);
        }
        Ok(reports)
    }
}
