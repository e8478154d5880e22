//! # CLI Command Implementations
//!
//! Each subcommand lives in its own file with an `Args` struct derived with
//! `clap` and an `execute` function. The pieces every command needs
//! (loading the configuration, applying flag overrides and building the
//! version graph) live here.

pub mod completions;
pub mod graph;
pub mod run;
pub mod versions;

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

use chronicle::config::ChronicleConfig;
use chronicle::defaults;
use chronicle::download::{Downloader, HttpDownloader};
use chronicle::graph::filter::apply_filters;
use chronicle::graph::VersionGraph;
use chronicle::manifest::MetadataProvider;
use chronicle::mapping::MappingFlavour;
use chronicle::pipeline::paths::ArtifactPaths;
use chronicle::quirks::Quirks;
use chronicle::resolver::SemverResolver;

/// Where versions come from and how they are mapped.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Path to the configuration file (default: .chronicle.yaml if present)
    #[arg(short, long, value_name = "FILE", env = "CHRONICLE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Root directory for downloaded and generated artifacts
    #[arg(long, value_name = "DIR", env = "CHRONICLE_STORAGE")]
    pub storage: Option<PathBuf>,

    /// Additional directory of version detail documents (repeatable)
    #[arg(long = "local-versions", value_name = "DIR")]
    pub local_dirs: Vec<PathBuf>,

    /// Do not read the launcher manifest
    #[arg(long)]
    pub no_launcher: bool,

    /// Mapping flavour to remap with
    #[arg(long, value_enum, env = "CHRONICLE_MAPPING")]
    pub mapping: Option<MappingFlavour>,

    /// Flavour to fall back to for versions the main one does not cover (repeatable)
    #[arg(long = "fallback-mapping", value_enum, value_name = "MAPPING")]
    pub fallback_mappings: Vec<MappingFlavour>,

    /// Work from cached files only, without network access
    #[arg(long)]
    pub offline: bool,
}

/// Which versions to process.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only process mainline versions
    #[arg(long)]
    pub mainline_only: bool,

    /// Only process stable releases
    #[arg(long, conflicts_with = "snapshots_only")]
    pub stable_only: bool,

    /// Only process snapshots and pending versions
    #[arg(long)]
    pub snapshots_only: bool,

    /// Lowest semantic version to process
    #[arg(long, value_name = "SEMVER")]
    pub min_version: Option<String>,

    /// Highest semantic version to process
    #[arg(long, value_name = "SEMVER")]
    pub max_version: Option<String>,

    /// Only process these ids or semantic versions (comma separated)
    #[arg(long, value_name = "VERSIONS", value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these ids or semantic versions (comma separated)
    #[arg(long, value_name = "VERSIONS", value_delimiter = ',')]
    pub exclude: Vec<String>,
}

/// Loads the configuration file and applies command-line overrides.
pub fn load_config(source: &SourceArgs, filters: &FilterArgs) -> Result<ChronicleConfig> {
    let mut config = match &source.config {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            ChronicleConfig::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => {
            let default_path = PathBuf::from(defaults::CONFIG_FILE);
            if default_path.exists() {
                ChronicleConfig::from_file(&default_path)?
            } else {
                ChronicleConfig::default()
            }
        }
    };

    if let Some(storage) = &source.storage {
        config.storage_root = Some(storage.clone());
    }
    if source.no_launcher {
        config.sources.launcher_manifest = None;
    }
    if source.offline {
        config.network.offline = true;
    }
    config.sources.local_dirs.extend(source.local_dirs.iter().cloned());
    if let Some(mapping) = source.mapping {
        config.mapping = mapping;
    }
    if !source.fallback_mappings.is_empty() {
        config.fallback_mappings = source.fallback_mappings.clone();
    }

    let f = &mut config.filters;
    f.mainline_only |= filters.mainline_only;
    f.stable_only |= filters.stable_only;
    f.snapshots_only |= filters.snapshots_only;
    if filters.min_version.is_some() {
        f.min_version = filters.min_version.clone();
    }
    if filters.max_version.is_some() {
        f.max_version = filters.max_version.clone();
    }
    f.only.extend(filters.only.iter().cloned());
    f.exclude.extend(filters.exclude.iter().cloned());

    config.validate()?;
    Ok(config)
}

/// Everything derived from the configuration before any pipeline work.
pub struct Session {
    pub config: ChronicleConfig,
    pub paths: ArtifactPaths,
    pub downloader: Arc<dyn Downloader>,
    /// The unfiltered graph of every known version.
    pub graph: VersionGraph,
}

impl Session {
    /// Loads metadata from every source, resolves semantic versions and
    /// builds the full graph.
    pub fn open(config: ChronicleConfig) -> Result<Self> {
        let paths = ArtifactPaths::new(config.storage_root());
        let downloader: Arc<dyn Downloader> = Arc::new(HttpDownloader::new(&config.network));

        let provider = MetadataProvider::from_config(&config, Arc::clone(&downloader));
        if provider.is_empty() {
            anyhow::bail!(
                "No version sources configured; set sources.launcher_manifest or pass --local-versions"
            );
        }
        let descriptors = provider.load_all()?;
        log::info!("Loaded {} version descriptors", descriptors.len());

        let quirks = Arc::new(Quirks::load(config.quirks_file.as_deref())?);
        let mut resolver = SemverResolver::from_config(
            &config,
            Arc::clone(&quirks),
            &paths,
            Arc::clone(&downloader),
            provider.primary_name(),
        )?;
        let records = resolver.resolve_all(descriptors)?;
        let graph = VersionGraph::build(records, &quirks)?;

        Ok(Self {
            config,
            paths,
            downloader,
            graph,
        })
    }

    /// The view that will actually be processed: versions the mapping
    /// covers, narrowed by the configured filters.
    pub fn filtered(&self) -> Result<VersionGraph> {
        let mapped = self
            .graph
            .filter_mapping(self.config.mapping, &self.config.fallback_mappings)?;
        Ok(apply_filters(&mapped, &self.config.filters)?)
    }
}
