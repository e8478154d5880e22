//! Artifact locations.
//!
//! Every path is a pure function of the storage root, the version name, the
//! mapping flavour and a suffix, so a later run finds exactly the files an
//! earlier run produced.

use std::path::{Path, PathBuf};

use crate::mapping::MappingFlavour;
use crate::version::{Artifact, VersionDescriptor, VersionRecord};

/// Smallest valid zip file: an empty end-of-central-directory record.
pub const EMPTY_ZIP_SIZE: u64 = 22;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    root: PathBuf,
}

impl ArtifactPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn version_dir(&self, version: &VersionRecord) -> PathBuf {
        self.descriptor_dir(version.descriptor())
    }

    fn descriptor_dir(&self, descriptor: &VersionDescriptor) -> PathBuf {
        self.root.join("versions").join(&descriptor.name)
    }

    /// Client jar location for a descriptor that has not been resolved yet.
    pub fn client_jar_of(&self, descriptor: &VersionDescriptor) -> Option<PathBuf> {
        descriptor
            .client
            .as_ref()
            .map(|artifact| artifact.resolve_in(&self.descriptor_dir(descriptor)))
    }

    /// Where a fetched upstream artifact of `version` is stored.
    pub fn fetched(&self, version: &VersionRecord, artifact: &Artifact) -> PathBuf {
        artifact.resolve_in(&self.version_dir(version))
    }

    pub fn client_jar(&self, version: &VersionRecord) -> Option<PathBuf> {
        self.client_jar_of(version.descriptor())
    }

    pub fn server_jar(&self, version: &VersionRecord) -> Option<PathBuf> {
        version
            .descriptor()
            .server
            .as_ref()
            .map(|artifact| self.fetched(version, artifact))
    }

    /// `{root}/mappings/{name}/{flavour}-{side}.txt`
    pub fn mappings(&self, version: &VersionRecord, flavour: MappingFlavour, side: &str) -> PathBuf {
        self.root
            .join("mappings")
            .join(version.name())
            .join(format!("{}-{}.txt", flavour, side))
    }

    pub fn merged_jar(&self, version: &VersionRecord) -> PathBuf {
        self.version_dir(version).join("merged.jar")
    }

    /// `{root}/remapped/{name}/{flavour}-{suffix}.jar`
    pub fn remapped(&self, version: &VersionRecord, flavour: MappingFlavour, suffix: &str) -> PathBuf {
        self.root
            .join("remapped")
            .join(version.name())
            .join(format!("{}-{}.jar", flavour, suffix))
    }

    pub fn decompiled(&self, version: &VersionRecord, flavour: MappingFlavour) -> PathBuf {
        self.root
            .join("decompiled")
            .join(version.name())
            .join(format!("{}-sources.jar", flavour))
    }

    pub fn datagen(&self, version: &VersionRecord) -> PathBuf {
        self.root
            .join("datagen")
            .join(version.name())
            .join("reports.zip")
    }

    pub fn asset_index(&self, index_id: &str) -> PathBuf {
        self.root
            .join("assets")
            .join("indexes")
            .join(format!("{index_id}.json"))
    }

    pub fn asset_objects_dir(&self) -> PathBuf {
        self.root.join("assets").join("objects")
    }

    /// `{root}/assets/objects/{hash[0..2]}/{hash}`
    pub fn asset_object(&self, hash: &str) -> PathBuf {
        let prefix = hash.get(..2).unwrap_or(hash);
        self.asset_objects_dir().join(prefix).join(hash)
    }

    pub fn meta_dir(&self, source: &str) -> PathBuf {
        self.root.join("meta").join(source)
    }

    pub fn semver_cache(&self, source: &str) -> PathBuf {
        self.root.join(format!("semver-cache-{source}.json"))
    }
}

/// Whether `path` is a plausible jar or zip archive.
pub fn is_valid_archive(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.len() > EMPTY_ZIP_SIZE)
}

/// Archives must pass [`is_valid_archive`]; other outputs only need to exist.
pub fn is_valid_output(path: &Path) -> bool {
    let is_archive = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext, "jar" | "zip"));
    if is_archive {
        is_valid_archive(path)
    } else {
        path.exists()
    }
}
