//! # Configuration
//!
//! This module defines `ChronicleConfig`, the single configuration object
//! handed to every component. It is read from a YAML file (by default
//! `.chronicle.yaml`), then overridden field by field from command-line
//! flags, and validated exactly once with [`ChronicleConfig::validate`].
//! Components never parse configuration themselves; they receive the
//! validated object by reference.
//!
//! ## Layout
//!
//! ```yaml
//! storage_root: /srv/chronicle
//! mapping: mojmap
//! fallback_mappings: [identity]
//! git:
//!   mainline_branch: master
//!   create_version_branches: true
//! filters:
//!   min_version: "1.14.4"
//!   exclude: ["1.16-rc1"]
//! artifacts:
//!   sort_json: true
//! tools:
//!   decompiler: ["java", "-jar", "vineflower.jar", "{input}", "{output}"]
//! ```
//!
//! Every field is optional; an empty file yields the defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::defaults;
use crate::download::Checksum;
use crate::error::{Error, Result};
use crate::mapping::MappingFlavour;
use crate::version::SemverKey;

/// Commit-related settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GitSettings {
    /// Branch receiving linear versions.
    pub mainline_branch: String,
    /// Author and committer name.
    pub user: String,
    /// Author and committer email.
    pub email: String,
    /// Create a branch for every mainline version.
    pub create_version_branches: bool,
    /// Create a branch for every stable version.
    pub create_stable_version_branches: bool,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            mainline_branch: defaults::MAINLINE_BRANCH.to_string(),
            user: defaults::GIT_USER.to_string(),
            email: defaults::GIT_EMAIL.to_string(),
            create_version_branches: false,
            create_stable_version_branches: false,
        }
    }
}

/// Graph filters applied before processing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSettings {
    /// Drop every non-linear version.
    pub mainline_only: bool,
    /// Keep only stable releases.
    pub stable_only: bool,
    /// Keep only snapshots and pending versions.
    pub snapshots_only: bool,
    /// Lowest semantic version to keep.
    pub min_version: Option<String>,
    /// Highest semantic version to keep.
    pub max_version: Option<String>,
    /// Keep only these ids or semantic versions.
    pub only: Vec<String>,
    /// Drop these ids or semantic versions.
    pub exclude: Vec<String>,
}

impl FilterSettings {
    pub fn min_key(&self) -> Result<Option<SemverKey>> {
        parse_bound("min_version", self.min_version.as_deref())
    }

    pub fn max_key(&self) -> Result<Option<SemverKey>> {
        parse_bound("max_version", self.max_version.as_deref())
    }
}

fn parse_bound(field: &str, value: Option<&str>) -> Result<Option<SemverKey>> {
    value
        .map(|raw| {
            SemverKey::parse(raw).map_err(|e| Error::ConfigParse {
                message: format!("invalid {field}: {e}"),
                hint: Some("use a semantic version such as 1.14.4 or 1.16-rc.9".to_string()),
            })
        })
        .transpose()
}

/// Which artifact categories are materialized into the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArtifactSettings {
    /// Copy `assets/` from the game jar.
    pub load_assets: bool,
    /// Download and copy assets listed by the asset index.
    pub load_assets_extern: bool,
    /// Copy `data/` from the game jar.
    pub load_datapack: bool,
    /// Run the data generator and copy its reports.
    pub load_datagen: bool,
    /// Hardlink external assets instead of copying them.
    pub use_hardlinks: bool,
    /// Rewrite JSON files with sorted keys.
    pub sort_json: bool,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            load_assets: true,
            load_assets_extern: true,
            load_datapack: true,
            load_datagen: false,
            use_hardlinks: true,
            sort_json: false,
        }
    }
}

/// Download behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkSettings {
    pub fetch_threads: usize,
    pub download_retries: u32,
    pub timeout_secs: u64,
    /// Never contact remote hosts; `file://` URLs and cached files still work.
    pub offline: bool,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            fetch_threads: defaults::FETCH_THREADS,
            download_retries: defaults::DOWNLOAD_RETRIES,
            timeout_secs: defaults::DOWNLOAD_TIMEOUT_SECS,
            offline: false,
        }
    }
}

/// A version detail document outside the launcher manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtraVersion {
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    /// Takes precedence over `sha1` when both are given.
    #[serde(default)]
    pub sha256: Option<String>,
}

impl ExtraVersion {
    /// The strongest checksum configured for the document.
    pub fn checksum(&self) -> Option<Checksum> {
        self.sha256
            .clone()
            .map(Checksum::Sha256)
            .or_else(|| self.sha1.clone().map(Checksum::Sha1))
    }
}

/// Where version metadata comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceSettings {
    /// Launcher manifest URL; `null` disables the launcher source.
    pub launcher_manifest: Option<String>,
    /// Additional detail documents, e.g. combat tests.
    pub extra_versions: Vec<ExtraVersion>,
    /// Directories of local detail documents.
    pub local_dirs: Vec<PathBuf>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            launcher_manifest: Some(defaults::LAUNCHER_MANIFEST_URL.to_string()),
            extra_versions: Vec::new(),
            local_dirs: Vec::new(),
        }
    }
}

/// Command templates for external tools.
///
/// Each template is an argv list; placeholders such as `{input}` and
/// `{output}` are substituted before the command runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolSettings {
    pub lookup: Option<Vec<String>>,
    pub merger: Option<Vec<String>>,
    pub remapper: Option<Vec<String>>,
    pub patcher: Option<Vec<String>>,
    pub decompiler: Option<Vec<String>>,
    pub datagen: Option<Vec<String>>,
}

/// The complete configuration object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChronicleConfig {
    /// Root for downloaded and generated artifacts.
    pub storage_root: Option<PathBuf>,
    /// Target repository; derived from the storage root when unset.
    pub repository: Option<PathBuf>,
    /// Skip the commit step entirely.
    pub no_repo: bool,
    pub mapping: MappingFlavour,
    pub fallback_mappings: Vec<MappingFlavour>,
    pub git: GitSettings,
    pub filters: FilterSettings,
    pub artifacts: ArtifactSettings,
    pub network: NetworkSettings,
    pub sources: SourceSettings,
    pub tools: ToolSettings,
    /// Root of exceptions/signatures/nests patch files.
    pub patch_data_dir: Option<PathBuf>,
    /// Extra quirks tables merged over the built-in ones.
    pub quirks_file: Option<PathBuf>,
}

impl ChronicleConfig {
    /// Parses a YAML document; an empty document yields the defaults.
    pub fn parse(yaml_content: &str) -> Result<Self> {
        if yaml_content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            hint: None,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(Error::Io)?;
        Self::parse(&content)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.network.fetch_threads == 0 {
            return Err(Error::ConfigParse {
                message: "network.fetch_threads must be at least 1".to_string(),
                hint: None,
            });
        }
        if self.network.download_retries == 0 {
            return Err(Error::ConfigParse {
                message: "network.download_retries must be at least 1".to_string(),
                hint: None,
            });
        }
        if self.filters.stable_only && self.filters.snapshots_only {
            return Err(Error::ConfigParse {
                message: "filters.stable_only and filters.snapshots_only exclude each other"
                    .to_string(),
                hint: Some("keep at most one of them".to_string()),
            });
        }
        let min = self.filters.min_key()?;
        let max = self.filters.max_key()?;
        if let (Some(min), Some(max)) = (&min, &max) {
            if min > max {
                return Err(Error::ConfigParse {
                    message: format!("min_version {min} is above max_version {max}"),
                    hint: None,
                });
            }
        }
        if self.git.mainline_branch.trim().is_empty() {
            return Err(Error::ConfigParse {
                message: "git.mainline_branch must not be empty".to_string(),
                hint: None,
            });
        }
        Ok(())
    }

    pub fn storage_root(&self) -> PathBuf {
        self.storage_root
            .clone()
            .unwrap_or_else(defaults::default_storage_root)
    }

    /// Repository location, defaulting to a directory named after `identifier`.
    pub fn repository_path(&self, identifier: &str) -> PathBuf {
        self.repository.clone().unwrap_or_else(|| {
            self.storage_root()
                .join(format!("minecraft-repo-{identifier}"))
        })
    }
}
