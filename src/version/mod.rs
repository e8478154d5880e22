//! # Version Data Model
//!
//! Versions enter the system as [`VersionDescriptor`]s, produced by the
//! metadata sources in [`crate::manifest`]. The semantic version resolver
//! turns each descriptor into a [`VersionRecord`] by attaching its
//! [`SemverKey`]; records are never mutated after that point and are shared
//! between graph views through `Arc`.
//!
//! ## Lifecycle
//!
//! 1.  **Descriptor**: normalized upstream data (id, release time, type,
//!     downloadable artifacts, declared parents).
//! 2.  **Resolution**: `SemverResolver::resolve` consumes the descriptor and
//!     returns a record. There is no way to build a record without a key.
//! 3.  **Graph**: records are placed in the version graph by key.

pub mod semver;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use self::semver::{ParseKeyError, SemverKey};

/// Upstream release channel of a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseType {
    Release,
    Snapshot,
    OldAlpha,
    OldBeta,
    #[serde(alias = "experiment")]
    Pending,
}

/// A downloadable file described by upstream metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl Artifact {
    pub fn new(url: impl Into<String>, sha1: Option<String>) -> Self {
        Self {
            url: url.into(),
            sha1,
            size: None,
        }
    }

    /// File name taken from the last path segment of the URL.
    pub fn file_name(&self) -> String {
        let from_url = url::Url::parse(&self.url).ok().and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        });
        from_url
            .or_else(|| self.url.rsplit('/').next().map(str::to_string))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "artifact".to_string())
    }

    /// Location of this artifact inside `dir`.
    pub fn resolve_in(&self, dir: &Path) -> PathBuf {
        dir.join(self.file_name())
    }
}

/// Reference to the asset index a version uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetIndexRef {
    pub id: String,
    pub artifact: Artifact,
}

/// One upstream-described release or snapshot, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    pub id: String,
    pub name: String,
    pub release_time: DateTime<FixedOffset>,
    pub release_type: ReleaseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_mappings: Option<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_mappings: Option<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<AssetIndexRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

impl VersionDescriptor {
    /// A descriptor with only the required fields set.
    pub fn new(
        id: impl Into<String>,
        release_type: ReleaseType,
        release_time: DateTime<FixedOffset>,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            release_time,
            release_type,
            main_class: None,
            client: None,
            server: None,
            client_mappings: None,
            server_mappings: None,
            asset_index: None,
            parents: Vec::new(),
        }
    }

    pub fn is_snapshot(&self) -> bool {
        self.release_type == ReleaseType::Snapshot
    }

    pub fn is_pending(&self) -> bool {
        self.release_type == ReleaseType::Pending
    }

    pub fn is_stable(&self) -> bool {
        !self.is_snapshot() && !self.is_pending()
    }
}

/// A resolved version: a descriptor plus its ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    descriptor: VersionDescriptor,
    semver: SemverKey,
}

impl VersionRecord {
    pub(crate) fn resolved(descriptor: VersionDescriptor, semver: SemverKey) -> Self {
        Self { descriptor, semver }
    }

    /// Builds a record with an already known key.
    #[cfg(test)]
    pub(crate) fn with_key(descriptor: VersionDescriptor, semver: SemverKey) -> Self {
        Self::resolved(descriptor, semver)
    }

    pub fn descriptor(&self) -> &VersionDescriptor {
        &self.descriptor
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn semver(&self) -> &SemverKey {
        &self.semver
    }

    pub fn release_time(&self) -> &DateTime<FixedOffset> {
        &self.descriptor.release_time
    }

    pub fn is_snapshot(&self) -> bool {
        self.descriptor.is_snapshot()
    }

    pub fn is_pending(&self) -> bool {
        self.descriptor.is_pending()
    }

    pub fn is_stable(&self) -> bool {
        self.descriptor.is_stable()
    }

    pub fn has_client(&self) -> bool {
        self.descriptor.client.is_some()
    }

    pub fn has_server(&self) -> bool {
        self.descriptor.server.is_some()
    }

    /// The exact message the committer writes for this version.
    pub fn commit_message(&self) -> String {
        format!("{}\n\nSemVer: {}", self.descriptor.name, self.semver)
    }

    /// Branch-safe form of the display name.
    pub fn branch_name(&self) -> String {
        self.descriptor.name.replace(' ', "-")
    }
}
