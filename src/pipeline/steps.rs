//! # Standard Steps
//!
//! The concrete steps of the per-version pipeline, declared as data by
//! [`standard_steps`]. Merging and patching are each one generic step
//! parameterised by the artifacts they read and write:
//!
//! | Step             | Applies when                        | Reads                          | Writes                  |
//! |------------------|-------------------------------------|--------------------------------|-------------------------|
//! | fetch-artifacts  | always                              | metadata                       | client / server jar     |
//! | fetch-mappings   | flavour ships mapping files         | metadata                       | client, server mappings |
//! | fetch-assets     | external assets enabled, has index  | asset index                    | index, objects          |
//! | merge-obfuscated | version >= 1.3                      | client + server jar            | merged jar              |
//! | remap            | a flavour covers the version        | merged or split jars, mappings | remapped jars           |
//! | merge-mapped     | version < 1.3                       | remapped client + server       | remapped merged jar     |
//! | apply-*          | patch data exists                   | previous patch or merged jar   | patched jar             |
//! | decompile        | a flavour covers the version        | last patched or merged jar     | sources archive         |
//! | datagen          | enabled, server jar, >= 18w01a      | server jar                     | reports archive         |
//! | commit           | repository enabled                  | everything above               | a commit                |

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use serde::Deserialize;

use crate::committer::Committer;
use crate::defaults;
use crate::download::{download_verified, Checksum, DownloadOutcome, Downloader};
use crate::error::{Error, Result};
use crate::mapping::MappingFlavour;
use crate::pipeline::paths::is_valid_archive;
use crate::pipeline::tools::{PatchDataProvider, PatchKind, Side, Toolbox};
use crate::pipeline::{
    ArtifactKey, PipelineCache, PipelineContext, Step, StepName, StepOutcome, StepStatus,
};
use crate::tasks::BoundedRunner;
use crate::version::{Artifact, SemverKey, VersionRecord};

/// Shared services the standard steps are built from.
pub struct StepServices {
    pub downloader: Arc<dyn Downloader>,
    pub runner: Arc<BoundedRunner>,
    pub tools: Rc<Toolbox>,
    pub patches: Rc<dyn PatchDataProvider>,
    pub committer: Option<Committer>,
}

/// The standard step list, in execution order.
pub fn standard_steps(services: StepServices) -> Vec<Box<dyn Step>> {
    let StepServices {
        downloader,
        runner,
        tools,
        patches,
        committer,
    } = services;

    let mut steps: Vec<Box<dyn Step>> = vec![
        Box::new(FetchArtifactsStep {
            downloader: Arc::clone(&downloader),
            runner: Arc::clone(&runner),
        }),
        Box::new(FetchMappingsStep {
            downloader: Arc::clone(&downloader),
            runner: Arc::clone(&runner),
        }),
        Box::new(FetchAssetsStep {
            downloader,
            runner,
        }),
        Box::new(MergeStep::obfuscated(Rc::clone(&tools))),
        Box::new(RemapStep {
            tools: Rc::clone(&tools),
        }),
        Box::new(MergeStep::mapped(Rc::clone(&tools))),
    ];
    for kind in PatchKind::ALL {
        steps.push(Box::new(PatchStep {
            kind,
            tools: Rc::clone(&tools),
            patches: Rc::clone(&patches),
        }));
    }
    steps.push(Box::new(DecompileStep {
        tools: Rc::clone(&tools),
    }));
    steps.push(Box::new(DatagenStep { tools }));
    steps.push(Box::new(CommitStep { committer }));
    steps
}

fn is_mergeable(version: &VersionRecord) -> bool {
    version.semver() >= &defaults::first_mergeable_version()
}

fn copy_artifact(input: &Path, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(input, output)?;
    Ok(())
}

fn checksum_of(artifact: &Artifact) -> Option<Checksum> {
    artifact.sha1.clone().map(Checksum::Sha1)
}

fn fetch_status(outcomes: &[DownloadOutcome]) -> StepStatus {
    StepStatus::merge(outcomes.iter().map(|outcome| match outcome {
        DownloadOutcome::Downloaded => StepStatus::Success,
        DownloadOutcome::Cached => StepStatus::UpToDate,
    }))
}

/// Downloads the client and server jars.
pub struct FetchArtifactsStep {
    downloader: Arc<dyn Downloader>,
    runner: Arc<BoundedRunner>,
}

impl FetchArtifactsStep {
    fn targets<'v>(
        &self,
        ctx: &PipelineContext<'v>,
    ) -> Vec<(ArtifactKey, &'v Artifact, PathBuf)> {
        let descriptor = ctx.version.descriptor();
        [
            (ArtifactKey::ClientJar, descriptor.client.as_ref()),
            (ArtifactKey::ServerJar, descriptor.server.as_ref()),
        ]
        .into_iter()
        .filter_map(|(key, artifact)| {
            artifact.map(|artifact| (key, artifact, ctx.paths.fetched(ctx.version, artifact)))
        })
        .collect()
    }
}

impl Step for FetchArtifactsStep {
    fn name(&self) -> StepName {
        StepName::FetchArtifacts
    }

    fn outputs(&self, ctx: &PipelineContext<'_>) -> Vec<(ArtifactKey, PathBuf)> {
        self.targets(ctx)
            .into_iter()
            .map(|(key, _, path)| (key, path))
            .collect()
    }

    fn is_up_to_date(&self, ctx: &PipelineContext<'_>) -> Result<bool> {
        let targets = self.targets(ctx);
        if targets.is_empty() {
            return Ok(false);
        }
        for (_, artifact, path) in &targets {
            if !is_valid_archive(path) {
                return Ok(false);
            }
            if let Some(sum) = checksum_of(artifact) {
                if !sum.matches(path)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn run(&self, ctx: &PipelineContext<'_>, _cache: &PipelineCache) -> Result<StepOutcome> {
        let targets = self.targets(ctx);
        if targets.is_empty() {
            return Ok(StepOutcome::not_run());
        }
        let downloader = self.downloader.as_ref();
        let tasks: Vec<_> = targets
            .iter()
            .map(|(_, artifact, path)| {
                move || download_verified(downloader, &artifact.url, checksum_of(artifact).as_ref(), path)
            })
            .collect();
        let outcomes = self.runner.run_all(tasks)?;

        let artifacts = targets
            .into_iter()
            .map(|(key, _, path)| (key, path))
            .collect();
        Ok(StepOutcome::with_status(fetch_status(&outcomes), artifacts))
    }
}

/// Downloads the mapping files of flavours that publish them with the game.
pub struct FetchMappingsStep {
    downloader: Arc<dyn Downloader>,
    runner: Arc<BoundedRunner>,
}

impl FetchMappingsStep {
    fn targets<'v>(
        &self,
        ctx: &PipelineContext<'v>,
    ) -> Vec<(ArtifactKey, &'v Artifact, PathBuf)> {
        let Some(flavour) = ctx.flavour().filter(MappingFlavour::ships_mapping_files) else {
            return Vec::new();
        };
        let descriptor = ctx.version.descriptor();
        [
            (ArtifactKey::ClientMappings, Side::Client, descriptor.client_mappings.as_ref()),
            (ArtifactKey::ServerMappings, Side::Server, descriptor.server_mappings.as_ref()),
        ]
        .into_iter()
        .filter_map(|(key, side, artifact)| {
            artifact.map(|artifact| {
                (key, artifact, ctx.paths.mappings(ctx.version, flavour, side.as_str()))
            })
        })
        .collect()
    }
}

impl Step for FetchMappingsStep {
    fn name(&self) -> StepName {
        StepName::FetchMappings
    }

    fn preconditions_should_run(&self, ctx: &PipelineContext<'_>) -> bool {
        !self.targets(ctx).is_empty()
    }

    fn outputs(&self, ctx: &PipelineContext<'_>) -> Vec<(ArtifactKey, PathBuf)> {
        self.targets(ctx)
            .into_iter()
            .map(|(key, _, path)| (key, path))
            .collect()
    }

    fn is_up_to_date(&self, ctx: &PipelineContext<'_>) -> Result<bool> {
        let targets = self.targets(ctx);
        if targets.is_empty() {
            return Ok(false);
        }
        for (_, artifact, path) in &targets {
            if !path.is_file() {
                return Ok(false);
            }
            if let Some(sum) = checksum_of(artifact) {
                if !sum.matches(path)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn run(&self, ctx: &PipelineContext<'_>, _cache: &PipelineCache) -> Result<StepOutcome> {
        let targets = self.targets(ctx);
        if targets.is_empty() {
            return Ok(StepOutcome::not_run());
        }
        let downloader = self.downloader.as_ref();
        let tasks: Vec<_> = targets
            .iter()
            .map(|(_, artifact, path)| {
                move || download_verified(downloader, &artifact.url, checksum_of(artifact).as_ref(), path)
            })
            .collect();
        let outcomes = self.runner.run_all(tasks)?;

        let artifacts = targets
            .into_iter()
            .map(|(key, _, path)| (key, path))
            .collect();
        Ok(StepOutcome::with_status(fetch_status(&outcomes), artifacts))
    }
}

/// One object listed by an asset index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    #[serde(default)]
    pub size: u64,
}

/// The `objects` table of an asset index document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AssetIndex {
    #[serde(default)]
    pub objects: BTreeMap<String, AssetObject>,
}

impl AssetIndex {
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Distinct object hashes, sorted.
    pub fn hashes(&self) -> BTreeSet<&str> {
        self.objects.values().map(|object| object.hash.as_str()).collect()
    }
}

/// Downloads the asset index and every object it lists.
pub struct FetchAssetsStep {
    downloader: Arc<dyn Downloader>,
    runner: Arc<BoundedRunner>,
}

impl Step for FetchAssetsStep {
    fn name(&self) -> StepName {
        StepName::FetchAssets
    }

    fn preconditions_should_run(&self, ctx: &PipelineContext<'_>) -> bool {
        let settings = &ctx.config.artifacts;
        settings.load_assets
            && settings.load_assets_extern
            && ctx.version.descriptor().asset_index.is_some()
    }

    fn outputs(&self, ctx: &PipelineContext<'_>) -> Vec<(ArtifactKey, PathBuf)> {
        match &ctx.version.descriptor().asset_index {
            Some(index) => vec![
                (ArtifactKey::AssetIndex, ctx.paths.asset_index(&index.id)),
                (ArtifactKey::AssetObjects, ctx.paths.asset_objects_dir()),
            ],
            None => Vec::new(),
        }
    }

    fn is_up_to_date(&self, ctx: &PipelineContext<'_>) -> Result<bool> {
        let Some(index) = &ctx.version.descriptor().asset_index else {
            return Ok(false);
        };
        let index_path = ctx.paths.asset_index(&index.id);
        if !index_path.is_file() {
            return Ok(false);
        }
        let Ok(listed) = AssetIndex::read(&index_path) else {
            return Ok(false);
        };
        let all_present = listed
            .hashes()
            .into_iter()
            .all(|hash| ctx.paths.asset_object(hash).is_file());
        Ok(all_present)
    }

    fn run(&self, ctx: &PipelineContext<'_>, _cache: &PipelineCache) -> Result<StepOutcome> {
        let Some(index) = &ctx.version.descriptor().asset_index else {
            return Ok(StepOutcome::not_run());
        };
        let index_path = ctx.paths.asset_index(&index.id);
        let index_outcome = download_verified(
            self.downloader.as_ref(),
            &index.artifact.url,
            checksum_of(&index.artifact).as_ref(),
            &index_path,
        )?;
        let listed = AssetIndex::read(&index_path)?;

        let downloader = self.downloader.as_ref();
        let paths = ctx.paths;
        let tasks: Vec<_> = listed
            .hashes()
            .into_iter()
            .map(|hash| {
                move || {
                    let prefix = hash.get(..2).unwrap_or(hash);
                    let url = format!("{}/{}/{}", defaults::ASSET_OBJECTS_URL, prefix, hash);
                    download_verified(
                        downloader,
                        &url,
                        Some(&Checksum::Sha1(hash.to_string())),
                        &paths.asset_object(hash),
                    )
                }
            })
            .collect();
        log::debug!(
            "Fetching {} asset objects for {} with {} workers",
            tasks.len(),
            ctx.version.id(),
            self.runner.max_in_flight()
        );
        let mut outcomes = self.runner.run_all(tasks)?;
        outcomes.push(index_outcome);

        Ok(StepOutcome::with_status(
            fetch_status(&outcomes),
            self.outputs(ctx),
        ))
    }
}

/// Merges two jars into one; a single available input is copied.
pub struct MergeStep {
    name: StepName,
    client: ArtifactKey,
    server: ArtifactKey,
    output: ArtifactKey,
    applies: fn(&VersionRecord) -> bool,
    output_path: fn(&PipelineContext<'_>) -> Option<PathBuf>,
    tools: Rc<Toolbox>,
}

impl MergeStep {
    /// Client and server jars as downloaded, for versions from 1.3 on.
    pub fn obfuscated(tools: Rc<Toolbox>) -> Self {
        Self {
            name: StepName::MergeObfuscated,
            client: ArtifactKey::ClientJar,
            server: ArtifactKey::ServerJar,
            output: ArtifactKey::MergedObfuscatedJar,
            applies: is_mergeable,
            output_path: |ctx| Some(ctx.paths.merged_jar(ctx.version)),
            tools,
        }
    }

    /// Separately remapped client and server jars, for versions before 1.3.
    pub fn mapped(tools: Rc<Toolbox>) -> Self {
        Self {
            name: StepName::MergeMapped,
            client: ArtifactKey::RemappedClientJar,
            server: ArtifactKey::RemappedServerJar,
            output: ArtifactKey::MergedMappedJar,
            applies: |version| !is_mergeable(version),
            output_path: |ctx| {
                ctx.flavour()
                    .map(|flavour| ctx.paths.remapped(ctx.version, flavour, Side::Merged.as_str()))
            },
            tools,
        }
    }
}

impl Step for MergeStep {
    fn name(&self) -> StepName {
        self.name
    }

    fn preconditions_should_run(&self, ctx: &PipelineContext<'_>) -> bool {
        (self.applies)(ctx.version) && (self.output_path)(ctx).is_some()
    }

    fn outputs(&self, ctx: &PipelineContext<'_>) -> Vec<(ArtifactKey, PathBuf)> {
        (self.output_path)(ctx)
            .map(|path| vec![(self.output, path)])
            .unwrap_or_default()
    }

    fn run(&self, ctx: &PipelineContext<'_>, cache: &PipelineCache) -> Result<StepOutcome> {
        let Some(output) = (self.output_path)(ctx) else {
            return Ok(StepOutcome::not_run());
        };
        match (cache.artifact(self.client), cache.artifact(self.server)) {
            (Some(client), Some(server)) => self.tools.merger.merge(client, server, &output)?,
            (Some(single), None) | (None, Some(single)) => {
                log::debug!("Only one input for {} of {}, copying", self.name, ctx.version.id());
                copy_artifact(single, &output)?;
            }
            (None, None) => {
                return Err(Error::MissingArtifact {
                    version: ctx.version.id().to_string(),
                    artifact: self.client.to_string(),
                });
            }
        }
        Ok(StepOutcome::success(vec![(self.output, output)]))
    }
}

/// Applies the effective mapping flavour.
pub struct RemapStep {
    tools: Rc<Toolbox>,
}

impl RemapStep {
    /// `(input, side, output key)` for each part of this version.
    fn parts(version: &VersionRecord) -> Vec<(ArtifactKey, Side, ArtifactKey)> {
        if is_mergeable(version) {
            return vec![(
                ArtifactKey::MergedObfuscatedJar,
                Side::Merged,
                ArtifactKey::RemappedMergedJar,
            )];
        }
        let mut parts = Vec::new();
        if version.has_client() {
            parts.push((ArtifactKey::ClientJar, Side::Client, ArtifactKey::RemappedClientJar));
        }
        if version.has_server() {
            parts.push((ArtifactKey::ServerJar, Side::Server, ArtifactKey::RemappedServerJar));
        }
        parts
    }

    /// Mapping files usable for `side`, most specific first.
    fn mapping_keys(side: Side) -> &'static [ArtifactKey] {
        match side {
            Side::Merged => &[ArtifactKey::ClientMappings, ArtifactKey::ServerMappings],
            Side::Client => &[ArtifactKey::ClientMappings],
            Side::Server => &[ArtifactKey::ServerMappings],
        }
    }

    fn mappings<'c>(
        ctx: &PipelineContext<'_>,
        cache: &'c PipelineCache,
        flavour: MappingFlavour,
        side: Side,
    ) -> Result<Option<&'c Path>> {
        let keys = Self::mapping_keys(side);
        match cache.first_of(keys) {
            Some((_, path)) => Ok(Some(path)),
            None if flavour.ships_mapping_files() => Err(Error::MissingArtifact {
                version: ctx.version.id().to_string(),
                artifact: keys[0].to_string(),
            }),
            None => Ok(None),
        }
    }
}

impl Step for RemapStep {
    fn name(&self) -> StepName {
        StepName::Remap
    }

    fn preconditions_should_run(&self, ctx: &PipelineContext<'_>) -> bool {
        ctx.flavour().is_some()
    }

    fn outputs(&self, ctx: &PipelineContext<'_>) -> Vec<(ArtifactKey, PathBuf)> {
        let Some(flavour) = ctx.flavour() else {
            return Vec::new();
        };
        Self::parts(ctx.version)
            .into_iter()
            .map(|(_, side, key)| (key, ctx.paths.remapped(ctx.version, flavour, side.as_str())))
            .collect()
    }

    fn run(&self, ctx: &PipelineContext<'_>, cache: &PipelineCache) -> Result<StepOutcome> {
        let Some(flavour) = ctx.flavour() else {
            return Ok(StepOutcome::not_run());
        };
        let mut statuses = Vec::new();
        let mut artifacts = Vec::new();
        for (input_key, side, output_key) in Self::parts(ctx.version) {
            let output = ctx.paths.remapped(ctx.version, flavour, side.as_str());
            if is_valid_archive(&output) {
                statuses.push(StepStatus::UpToDate);
            } else {
                let input = cache.require(input_key, ctx.version)?;
                let mappings = Self::mappings(ctx, cache, flavour, side)?;
                self.tools
                    .remapper
                    .remap(ctx.version, side, flavour, mappings, input, &output)?;
                statuses.push(StepStatus::Success);
            }
            artifacts.push((output_key, output));
        }
        Ok(StepOutcome::with_status(StepStatus::merge(statuses), artifacts))
    }
}

/// Applies one kind of patch data to the latest jar.
pub struct PatchStep {
    kind: PatchKind,
    tools: Rc<Toolbox>,
    patches: Rc<dyn PatchDataProvider>,
}

impl PatchStep {
    /// Inputs in preference order: the closest earlier patch, then the merged jar.
    fn input_chain(&self) -> Vec<ArtifactKey> {
        let mut chain: Vec<ArtifactKey> = PatchKind::ALL
            .iter()
            .take_while(|kind| **kind != self.kind)
            .map(PatchKind::artifact)
            .collect();
        chain.reverse();
        chain.push(ArtifactKey::MergedMappedJar);
        chain.push(ArtifactKey::RemappedMergedJar);
        chain
    }

    fn patch_file(&self, ctx: &PipelineContext<'_>) -> Option<PathBuf> {
        let flavour = ctx.flavour()?;
        self.patches.patch_for(ctx.version, self.kind, flavour)
    }
}

impl Step for PatchStep {
    fn name(&self) -> StepName {
        self.kind.step_name()
    }

    fn preconditions_should_run(&self, ctx: &PipelineContext<'_>) -> bool {
        self.patch_file(ctx).is_some()
    }

    fn outputs(&self, ctx: &PipelineContext<'_>) -> Vec<(ArtifactKey, PathBuf)> {
        ctx.flavour()
            .map(|flavour| {
                vec![(
                    self.kind.artifact(),
                    ctx.paths.remapped(ctx.version, flavour, self.kind.as_str()),
                )]
            })
            .unwrap_or_default()
    }

    fn run(&self, ctx: &PipelineContext<'_>, cache: &PipelineCache) -> Result<StepOutcome> {
        let (Some(flavour), Some(patch)) = (ctx.flavour(), self.patch_file(ctx)) else {
            return Ok(StepOutcome::not_run());
        };
        let Some((_, input)) = cache.first_of(&self.input_chain()) else {
            return Err(Error::MissingArtifact {
                version: ctx.version.id().to_string(),
                artifact: ArtifactKey::RemappedMergedJar.to_string(),
            });
        };
        let output = ctx.paths.remapped(ctx.version, flavour, self.kind.as_str());
        self.tools
            .patcher
            .patch(ctx.version, self.kind, input, &patch, &output)?;
        Ok(StepOutcome::success(vec![(self.kind.artifact(), output)]))
    }
}

/// Inputs of the decompiler, most processed first.
const DECOMPILE_INPUTS: [ArtifactKey; 5] = [
    ArtifactKey::NestsPatchedJar,
    ArtifactKey::SignaturesPatchedJar,
    ArtifactKey::ExceptionsPatchedJar,
    ArtifactKey::MergedMappedJar,
    ArtifactKey::RemappedMergedJar,
];

pub struct DecompileStep {
    tools: Rc<Toolbox>,
}

impl Step for DecompileStep {
    fn name(&self) -> StepName {
        StepName::Decompile
    }

    fn preconditions_should_run(&self, ctx: &PipelineContext<'_>) -> bool {
        ctx.flavour().is_some()
    }

    fn outputs(&self, ctx: &PipelineContext<'_>) -> Vec<(ArtifactKey, PathBuf)> {
        ctx.flavour()
            .map(|flavour| {
                vec![(
                    ArtifactKey::DecompiledSources,
                    ctx.paths.decompiled(ctx.version, flavour),
                )]
            })
            .unwrap_or_default()
    }

    fn run(&self, ctx: &PipelineContext<'_>, cache: &PipelineCache) -> Result<StepOutcome> {
        let Some(flavour) = ctx.flavour() else {
            return Ok(StepOutcome::not_run());
        };
        let Some((_, input)) = cache.first_of(&DECOMPILE_INPUTS) else {
            return Err(Error::MissingArtifact {
                version: ctx.version.id().to_string(),
                artifact: ArtifactKey::RemappedMergedJar.to_string(),
            });
        };
        let output = ctx.paths.decompiled(ctx.version, flavour);
        self.tools.decompiler.decompile(ctx.version, input, &output)?;
        Ok(StepOutcome::success(vec![(ArtifactKey::DecompiledSources, output)]))
    }
}

/// Runs the server's data generator.
pub struct DatagenStep {
    tools: Rc<Toolbox>,
}

impl Step for DatagenStep {
    fn name(&self) -> StepName {
        StepName::Datagen
    }

    fn preconditions_should_run(&self, ctx: &PipelineContext<'_>) -> bool {
        ctx.config.artifacts.load_datagen
            && ctx.version.has_server()
            && SemverKey::parse(defaults::FIRST_DATAGEN_VERSION)
                .is_ok_and(|first| ctx.version.semver() >= &first)
    }

    fn outputs(&self, ctx: &PipelineContext<'_>) -> Vec<(ArtifactKey, PathBuf)> {
        vec![(ArtifactKey::DatagenReports, ctx.paths.datagen(ctx.version))]
    }

    fn run(&self, ctx: &PipelineContext<'_>, cache: &PipelineCache) -> Result<StepOutcome> {
        let server = cache.require(ArtifactKey::ServerJar, ctx.version)?;
        let output = ctx.paths.datagen(ctx.version);
        self.tools.datagen.run(ctx.version, server, &output)?;
        Ok(StepOutcome::success(vec![(ArtifactKey::DatagenReports, output)]))
    }
}

/// Records the version in the target repository.
pub struct CommitStep {
    committer: Option<Committer>,
}

impl Step for CommitStep {
    fn name(&self) -> StepName {
        StepName::Commit
    }

    fn preconditions_should_run(&self, ctx: &PipelineContext<'_>) -> bool {
        !ctx.config.no_repo && self.committer.is_some()
    }

    fn outputs(&self, _ctx: &PipelineContext<'_>) -> Vec<(ArtifactKey, PathBuf)> {
        Vec::new()
    }

    fn is_up_to_date(&self, ctx: &PipelineContext<'_>) -> Result<bool> {
        match &self.committer {
            Some(committer) => committer.is_committed(ctx.version),
            None => Ok(false),
        }
    }

    fn run(&self, ctx: &PipelineContext<'_>, cache: &PipelineCache) -> Result<StepOutcome> {
        let Some(committer) = &self.committer else {
            return Ok(StepOutcome::not_run());
        };
        let status = committer.commit(ctx.version, ctx.graph, cache)?;
        Ok(StepOutcome::with_status(status, Vec::new()))
    }
}
