//! # Metadata Sources
//!
//! Version descriptors come from several places: the launcher manifest,
//! individually published detail documents (combat tests, experimental
//! snapshots), and local directories of hand-written documents. Each place is
//! a [`MetadataSource`]; the [`MetadataProvider`] loads them in order and
//! merges the results into one list keyed by version id.
//!
//! ## Merge Rules
//!
//! - The first source to deliver an id wins.
//! - A later source delivering the same id with identical content is
//!   harmless and only logged as a warning.
//! - A later source delivering the same id with different content is the
//!   fatal `Error::DuplicateMetadata`.

pub mod launcher;
pub mod local;

use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::config::ChronicleConfig;
use crate::defaults;
use crate::download::Downloader;
use crate::error::{Error, Result};
use crate::pipeline::paths::ArtifactPaths;
use crate::version::{Artifact, AssetIndexRef, ReleaseType, VersionDescriptor};

pub use self::launcher::{ExtraVersionSource, LauncherManifestSource};
pub use self::local::LocalDescriptorSource;

/// A place version descriptors are loaded from.
pub trait MetadataSource {
    /// Short name, used in cache file names and log messages.
    fn name(&self) -> &str;

    /// Loads every descriptor this source knows about.
    fn load(&self) -> Result<Vec<VersionDescriptor>>;
}

/// Ordered collection of metadata sources.
pub struct MetadataProvider {
    sources: Vec<Box<dyn MetadataSource>>,
}

impl MetadataProvider {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn with_source(mut self, source: Box<dyn MetadataSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Builds the sources named by the configuration.
    pub fn from_config(config: &ChronicleConfig, downloader: Arc<dyn Downloader>) -> Self {
        let paths = ArtifactPaths::new(config.storage_root());
        let threads = config.network.fetch_threads;
        let mut provider = Self::new();

        if let Some(url) = &config.sources.launcher_manifest {
            provider = provider.with_source(Box::new(LauncherManifestSource::new(
                defaults::LAUNCHER_SOURCE,
                url.clone(),
                paths.meta_dir(defaults::LAUNCHER_SOURCE),
                Arc::clone(&downloader),
                threads,
            )));
        }
        if !config.sources.extra_versions.is_empty() {
            provider = provider.with_source(Box::new(ExtraVersionSource::new(
                config.sources.extra_versions.clone(),
                paths.meta_dir("extra"),
                Arc::clone(&downloader),
                threads,
            )));
        }
        for dir in &config.sources.local_dirs {
            provider = provider.with_source(Box::new(LocalDescriptorSource::new(dir.clone())));
        }
        provider
    }

    /// Name of the first source, which owns the semver cache.
    pub fn primary_name(&self) -> &str {
        self.sources
            .first()
            .map(|source| source.name())
            .unwrap_or("local")
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Loads and merges every source, keeping first-seen order.
    pub fn load_all(&self) -> Result<Vec<VersionDescriptor>> {
        let mut merged: Vec<VersionDescriptor> = Vec::new();
        let mut index_by_id: HashMap<String, usize> = HashMap::new();

        for source in &self.sources {
            let descriptors = source.load()?;
            log::info!(
                "Loaded {} versions from source '{}'",
                descriptors.len(),
                source.name()
            );
            for descriptor in descriptors {
                match index_by_id.get(&descriptor.id) {
                    Some(&existing) if merged[existing] == descriptor => {
                        log::warn!(
                            "Duplicate version entry {} from '{}' matches the earlier one",
                            descriptor.id,
                            source.name()
                        );
                    }
                    Some(_) => {
                        return Err(Error::DuplicateMetadata {
                            id: descriptor.id,
                            source_name: source.name().to_string(),
                        });
                    }
                    None => {
                        index_by_id.insert(descriptor.id.clone(), merged.len());
                        merged.push(descriptor);
                    }
                }
            }
        }
        Ok(merged)
    }
}

impl Default for MetadataProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Deserialize)]
struct Downloads {
    client: Option<Artifact>,
    server: Option<Artifact>,
    client_mappings: Option<Artifact>,
    server_mappings: Option<Artifact>,
}

#[derive(Debug, Deserialize)]
struct AssetIndexDocument {
    id: String,
    url: String,
    sha1: Option<String>,
    size: Option<u64>,
}

/// The subset of a version detail document chronicle reads.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailDocument {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    release_type: ReleaseType,
    release_time: chrono::DateTime<chrono::FixedOffset>,
    #[serde(default)]
    main_class: Option<String>,
    #[serde(default)]
    downloads: Downloads,
    #[serde(default)]
    asset_index: Option<AssetIndexDocument>,
    #[serde(default)]
    parents: Vec<String>,
}

/// Parses a launcher-style version detail document.
pub fn parse_detail(json: &str) -> Result<VersionDescriptor> {
    let doc: DetailDocument = serde_json::from_str(json)?;
    Ok(VersionDescriptor {
        name: doc.name.unwrap_or_else(|| doc.id.clone()),
        id: doc.id,
        release_time: doc.release_time,
        release_type: doc.release_type,
        main_class: doc.main_class,
        client: doc.downloads.client,
        server: doc.downloads.server,
        client_mappings: doc.downloads.client_mappings,
        server_mappings: doc.downloads.server_mappings,
        asset_index: doc.asset_index.map(|index| AssetIndexRef {
            id: index.id,
            artifact: Artifact {
                url: index.url,
                sha1: index.sha1,
                size: index.size,
            },
        }),
        parents: doc.parents,
    })
}

/// Reads a detail document from a `.json` file, or from the `.json` entry
/// of the same stem inside a `.zip` file.
pub fn read_detail_file(path: &Path) -> Result<VersionDescriptor> {
    let is_zip = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
    if !is_zip {
        return parse_detail(&std::fs::read_to_string(path)?);
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let wanted = format!("{stem}.json");
    let mut archive = zip::ZipArchive::new(std::fs::File::open(path)?)?;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let matches = Path::new(entry.name())
            .file_name()
            .is_some_and(|name| name.to_string_lossy() == wanted);
        if matches {
            let mut json = String::new();
            entry.read_to_string(&mut json)?;
            return parse_detail(&json);
        }
    }
    Err(Error::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("no {} inside {}", wanted, path.display()),
    )))
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// A minimal detail document for `id`.
    pub fn detail_json(id: &str, release_type: &str, time: &str) -> String {
        format!(
            r#"{{
  "id": "{id}",
  "type": "{release_type}",
  "releaseTime": "{time}",
  "mainClass": "net.minecraft.client.Main",
  "downloads": {{
    "client": {{"url": "https://example.net/{id}/client.jar", "sha1": "00", "size": 3}}
  }}
}}"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::detail_json;
    use super::*;
    use std::io::Write;

    struct StaticSource {
        name: &'static str,
        descriptors: Vec<VersionDescriptor>,
    }

    impl MetadataSource for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        fn load(&self) -> Result<Vec<VersionDescriptor>> {
            Ok(self.descriptors.clone())
        }
    }

    fn descriptor(id: &str) -> VersionDescriptor {
        parse_detail(&detail_json(id, "release", "2011-11-18T22:00:00+00:00")).unwrap()
    }

    #[test]
    fn test_parse_detail_document() {
        let json = r#"{
  "id": "1.14.4",
  "type": "release",
  "releaseTime": "2019-07-19T09:25:47+00:00",
  "mainClass": "net.minecraft.client.main.Main",
  "assetIndex": {"id": "1.14", "sha1": "ab", "size": 10, "totalSize": 99, "url": "https://example.net/1.14.json"},
  "downloads": {
    "client": {"sha1": "aa", "size": 1, "url": "https://example.net/client.jar"},
    "client_mappings": {"sha1": "bb", "size": 2, "url": "https://example.net/client.txt"},
    "server": {"sha1": "cc", "size": 3, "url": "https://example.net/server.jar"}
  },
  "libraries": [],
  "javaVersion": {"majorVersion": 8}
}"#;
        let descriptor = parse_detail(json).unwrap();
        assert_eq!(descriptor.id, "1.14.4");
        assert_eq!(descriptor.name, "1.14.4");
        assert_eq!(descriptor.release_type, ReleaseType::Release);
        assert_eq!(descriptor.asset_index.as_ref().unwrap().id, "1.14");
        assert_eq!(descriptor.client.as_ref().unwrap().sha1.as_deref(), Some("aa"));
        assert!(descriptor.client_mappings.is_some());
        assert!(descriptor.server_mappings.is_none());
        assert!(descriptor.parents.is_empty());
    }

    #[test]
    fn test_parse_detail_with_parents_and_pending_type() {
        let json = r#"{"id": "1.18_experimental-snapshot-2", "type": "pending",
            "releaseTime": "2021-07-20T12:00:00+00:00", "parents": ["1.18_experimental-snapshot-1"]}"#;
        let descriptor = parse_detail(json).unwrap();
        assert!(descriptor.is_pending());
        assert_eq!(descriptor.parents, vec!["1.18_experimental-snapshot-1"]);
    }

    #[test]
    fn test_read_detail_from_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("1_14_combat-212796.zip");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = zip::ZipWriter::new(file);
        writer
            .start_file(
                "1_14_combat-212796/1_14_combat-212796.json",
                zip::write::FileOptions::default(),
            )
            .unwrap();
        writer
            .write_all(
                detail_json("1.14_combat-212796", "snapshot", "2019-05-30T12:00:00+00:00")
                    .as_bytes(),
            )
            .unwrap();
        writer.finish().unwrap();

        let descriptor = read_detail_file(&path).unwrap();
        assert_eq!(descriptor.id, "1.14_combat-212796");
        assert!(descriptor.is_snapshot());
    }

    #[test]
    fn test_load_all_keeps_first_seen_order() {
        let provider = MetadataProvider::new()
            .with_source(Box::new(StaticSource {
                name: "a",
                descriptors: vec![descriptor("1.0"), descriptor("1.1")],
            }))
            .with_source(Box::new(StaticSource {
                name: "b",
                descriptors: vec![descriptor("1.2")],
            }));
        let ids: Vec<_> = provider
            .load_all()
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["1.0", "1.1", "1.2"]);
        assert_eq!(provider.primary_name(), "a");
    }

    #[test]
    fn test_identical_duplicate_warns() {
        testing_logger::setup();
        let provider = MetadataProvider::new()
            .with_source(Box::new(StaticSource {
                name: "a",
                descriptors: vec![descriptor("1.0")],
            }))
            .with_source(Box::new(StaticSource {
                name: "b",
                descriptors: vec![descriptor("1.0")],
            }));
        assert_eq!(provider.load_all().unwrap().len(), 1);
        testing_logger::validate(|captured| {
            assert!(captured
                .iter()
                .any(|log| log.level == log::Level::Warn && log.body.contains("1.0")));
        });
    }

    #[test]
    fn test_differing_duplicate_is_fatal() {
        let mut changed = descriptor("1.0");
        changed.main_class = Some("other.Main".to_string());
        let provider = MetadataProvider::new()
            .with_source(Box::new(StaticSource {
                name: "a",
                descriptors: vec![descriptor("1.0")],
            }))
            .with_source(Box::new(StaticSource {
                name: "b",
                descriptors: vec![changed],
            }));
        match provider.load_all() {
            Err(Error::DuplicateMetadata { id, source_name }) => {
                assert_eq!(id, "1.0");
                assert_eq!(source_name, "b");
            }
            other => panic!("expected DuplicateMetadata, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_from_config_builds_configured_sources() {
        let mut config = ChronicleConfig::default();
        config.sources.launcher_manifest = None;
        config.sources.local_dirs = vec!["a".into(), "b".into()];
        let downloader: Arc<dyn Downloader> =
            Arc::new(crate::download::fakes::MemoryDownloader::new());
        let provider = MetadataProvider::from_config(&config, downloader);
        assert_eq!(provider.len(), 2);
        assert_eq!(provider.primary_name(), "local");
    }
}
