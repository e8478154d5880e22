//! # Semantic Version Resolution
//!
//! Every descriptor needs a [`SemverKey`] before it can enter the graph. Keys
//! come from, in order of preference:
//!
//! 1.  **Manual override**: the quirks table, by version id.
//! 2.  **Cache**: a previously resolved key, if it still parses.
//! 3.  **Main-class lookup**: the lookup inspects an already downloaded
//!     client jar.
//! 4.  **Id lookup**: the lookup derives a key from the raw id.
//! 5.  **Fetch and retry**: download the client jar, then repeat step 3.
//!
//! The lookup is the configured `tools.lookup` command when there is one,
//! otherwise the built-in [`JarVersionLookup`]. In offline mode
//! (`network.offline`) there is no built-in lookup and no jar is downloaded,
//! so only overrides and the cache can answer.
//!
//! Every string a lookup produces is normalized (`"client"` becomes the
//! version id, then the fixup table applies) before it is parsed. Lookup
//! errors fall through to the next strategy; only when all of them fail does
//! resolution end in `Error::UnresolvableVersion`.
//!
//! Keys produced by a lookup are written to `semver-cache-<source>.json` when
//! the resolver is flushed, so a later run makes no lookup calls at all.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use serde::Deserialize;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::config::ChronicleConfig;
use crate::download::{download_verified, Checksum, Downloader};
use crate::error::{Error, Result};
use crate::pipeline::paths::ArtifactPaths;
use crate::pipeline::tools::lookup_from_settings;
use crate::quirks::Quirks;
use crate::version::{SemverKey, VersionDescriptor, VersionRecord};

/// Manifest Mojang embeds in client jars since 18w47b.
const EMBEDDED_VERSION_FILE: &str = "version.json";

/// Last version whose pre-releases are ordered as release candidates.
const LAST_RC_PRE_RELEASES: [u64; 2] = [1, 16];

/// External tool that derives a semantic version from game artifacts.
pub trait VersionLookup {
    /// Returns the raw version string, or `None` when the tool has no answer.
    fn lookup(
        &self,
        artifacts: &[PathBuf],
        main_class: Option<&str>,
        version_id: Option<&str>,
    ) -> Result<Option<String>>;
}

/// Lookup used when no tool is configured.
pub struct NoLookup;

impl VersionLookup for NoLookup {
    fn lookup(&self, _: &[PathBuf], _: Option<&str>, _: Option<&str>) -> Result<Option<String>> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddedVersion {
    id: String,
    #[serde(default)]
    release_target: Option<String>,
}

/// Built-in lookup: reads the embedded `version.json` of a client jar, or
/// falls back to the launcher id, and turns the name into a semantic version.
///
/// | Launcher name                    | Semantic version    |
/// |----------------------------------|---------------------|
/// | `1.14.4`                         | `1.14.4`            |
/// | `19w02a` (release target `1.14`) | `1.14-alpha.19.2.a` |
/// | `1.14.3-pre4`                    | `1.14.3-rc.4`       |
/// | `1.14 Pre-Release 1`             | `1.14-rc.1`         |
/// | `1.16.2-pre3`                    | `1.16.2-beta.3`     |
/// | `1.16.2-rc1`                     | `1.16.2-rc.1`       |
///
/// Other names have no answer.
pub struct JarVersionLookup {
    release: Regex,
    weekly: Regex,
    pre_release: Regex,
    candidate: Regex,
}

impl JarVersionLookup {
    pub fn new() -> Result<Self> {
        Ok(Self {
            release: Regex::new(r"^\d+\.\d+(?:\.\d+)?$")?,
            weekly: Regex::new(r"^(\d{2})w(\d{2})([a-z]+)$")?,
            pre_release: Regex::new(r"^(\d+\.\d+(?:\.\d+)?)(?:-pre| Pre-[Rr]elease )(\d+)$")?,
            candidate: Regex::new(r"^(\d+\.\d+(?:\.\d+)?)(?:-rc| Release Candidate )(\d+)$")?,
        })
    }

    /// The semantic version for a launcher name, if its shape is known.
    /// Weekly snapshots need the release they lead up to.
    pub fn normalize(&self, name: &str, release_target: Option<&str>) -> Option<String> {
        if self.release.is_match(name) {
            return Some(name.to_string());
        }
        if let Some(caps) = self.weekly.captures(name) {
            let target = release_target?;
            let year: u32 = caps[1].parse().ok()?;
            let week: u32 = caps[2].parse().ok()?;
            return Some(format!("{target}-alpha.{year}.{week}.{}", &caps[3]));
        }
        if let Some(caps) = self.pre_release.captures(name) {
            let base = &caps[1];
            let channel = match SemverKey::parse(base) {
                Ok(key) if key > SemverKey::release(&LAST_RC_PRE_RELEASES) => "beta",
                _ => "rc",
            };
            return Some(format!("{base}-{channel}.{}", &caps[2]));
        }
        self.candidate
            .captures(name)
            .map(|caps| format!("{}-rc.{}", &caps[1], &caps[2]))
    }

    fn read_embedded(jar: &Path) -> Result<Option<EmbeddedVersion>> {
        let mut archive = ZipArchive::new(File::open(jar)?)?;
        let mut entry = match archive.by_name(EMBEDDED_VERSION_FILE) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut content = String::new();
        entry.read_to_string(&mut content)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

impl VersionLookup for JarVersionLookup {
    fn lookup(
        &self,
        artifacts: &[PathBuf],
        _main_class: Option<&str>,
        version_id: Option<&str>,
    ) -> Result<Option<String>> {
        for jar in artifacts {
            if let Some(embedded) = Self::read_embedded(jar)? {
                log::debug!("{} embeds version {}", jar.display(), embedded.id);
                return Ok(self.normalize(&embedded.id, embedded.release_target.as_deref()));
            }
        }
        Ok(version_id.and_then(|id| self.normalize(id, None)))
    }
}

/// The lookup a run uses for `config`.
pub fn configured_lookup(config: &ChronicleConfig) -> Result<Box<dyn VersionLookup>> {
    if let Some(tool) = lookup_from_settings(&config.tools) {
        return Ok(Box::new(tool));
    }
    if config.network.offline {
        return Ok(Box::new(NoLookup));
    }
    Ok(Box::new(JarVersionLookup::new()?))
}

/// Access to a version's client jar for the lookup tool.
pub trait ClientJarSource {
    /// The client jar if it is already on disk.
    fn existing(&self, descriptor: &VersionDescriptor) -> Option<PathBuf>;

    /// Downloads the client jar; `None` when the version has none.
    fn fetch(&self, descriptor: &VersionDescriptor) -> Result<Option<PathBuf>>;
}

/// Client jars stored under the artifact layout and fetched on demand.
pub struct DownloadingJarSource {
    paths: ArtifactPaths,
    downloader: Arc<dyn Downloader>,
    offline: bool,
}

impl DownloadingJarSource {
    pub fn new(paths: ArtifactPaths, downloader: Arc<dyn Downloader>) -> Self {
        Self {
            paths,
            downloader,
            offline: false,
        }
    }

    /// When offline, only jars already on disk are used.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    fn target(&self, descriptor: &VersionDescriptor) -> Option<PathBuf> {
        self.paths.client_jar_of(descriptor)
    }
}

impl ClientJarSource for DownloadingJarSource {
    fn existing(&self, descriptor: &VersionDescriptor) -> Option<PathBuf> {
        self.target(descriptor).filter(|path| path.is_file())
    }

    fn fetch(&self, descriptor: &VersionDescriptor) -> Result<Option<PathBuf>> {
        if self.offline {
            return Ok(self.existing(descriptor));
        }
        let (Some(artifact), Some(dest)) = (&descriptor.client, self.target(descriptor)) else {
            return Ok(None);
        };
        let checksum = artifact.sha1.clone().map(Checksum::Sha1);
        download_verified(
            self.downloader.as_ref(),
            &artifact.url,
            checksum.as_ref(),
            &dest,
        )?;
        Ok(Some(dest))
    }
}

/// Persistent id → semantic version map for one metadata source.
#[derive(Debug)]
pub struct SemverCache {
    path: PathBuf,
    entries: BTreeMap<String, String>,
    loaded: bool,
    dirty: bool,
}

impl SemverCache {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: BTreeMap::new(),
            loaded: false,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the cache file once; a missing or corrupt file yields an empty map.
    pub fn ensure_loaded(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;
        if !self.path.is_file() {
            return;
        }
        let parsed: Result<BTreeMap<String, String>> = std::fs::read_to_string(&self.path)
            .map_err(Error::from)
            .and_then(|content| Ok(serde_json::from_str(&content)?));
        match parsed {
            Ok(entries) => self.entries = entries,
            Err(e) => log::warn!(
                "Ignoring unreadable semver cache {}: {}",
                self.path.display(),
                e
            ),
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    pub fn insert(&mut self, id: &str, key: &SemverKey) {
        let value = key.to_string();
        if self.entries.get(id) != Some(&value) {
            self.entries.insert(id.to_string(), value);
            self.dirty = true;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the map as sorted pretty JSON if it changed.
    ///
    /// A write failure is logged and otherwise ignored; the next run simply
    /// repeats the lookups.
    pub fn flush(&mut self) {
        if !self.dirty {
            return;
        }
        match self.write() {
            Ok(()) => {
                self.dirty = false;
                log::debug!(
                    "Wrote {} entries to {}",
                    self.entries.len(),
                    self.path.display()
                );
            }
            Err(e) => log::warn!(
                "Failed to write semver cache {}: {}",
                self.path.display(),
                e
            ),
        }
    }

    fn write(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&self.path, json + "\n")?;
        Ok(())
    }
}

pub struct SemverResolver {
    quirks: Arc<Quirks>,
    lookup: Box<dyn VersionLookup>,
    jars: Box<dyn ClientJarSource>,
    cache: SemverCache,
}

impl SemverResolver {
    pub fn new(
        quirks: Arc<Quirks>,
        lookup: Box<dyn VersionLookup>,
        jars: Box<dyn ClientJarSource>,
        cache: SemverCache,
    ) -> Self {
        Self {
            quirks,
            lookup,
            jars,
            cache,
        }
    }

    /// The resolver a run uses: the configured lookup, client jars stored
    /// where the pipeline fetches them, and the cache of `source`.
    pub fn from_config(
        config: &ChronicleConfig,
        quirks: Arc<Quirks>,
        paths: &ArtifactPaths,
        downloader: Arc<dyn Downloader>,
        source: &str,
    ) -> Result<Self> {
        let jars = DownloadingJarSource::new(paths.clone(), downloader)
            .offline(config.network.offline);
        Ok(Self::new(
            quirks,
            configured_lookup(config)?,
            Box::new(jars),
            SemverCache::new(paths.semver_cache(source)),
        ))
    }

    pub fn cache(&self) -> &SemverCache {
        &self.cache
    }

    /// Attaches a semantic version key to `descriptor`.
    pub fn resolve(&mut self, descriptor: VersionDescriptor) -> Result<VersionRecord> {
        if let Some(key) = self.quirks.semver_override(&descriptor.id) {
            log::debug!("Using manual semver {} for {}", key, descriptor.id);
            let key = key.clone();
            return Ok(VersionRecord::resolved(descriptor, key));
        }

        self.cache.ensure_loaded();
        if let Some(raw) = self.cache.get(&descriptor.id) {
            match SemverKey::parse(raw) {
                Ok(key) => return Ok(VersionRecord::resolved(descriptor, key)),
                Err(e) => log::debug!("Discarding cached semver for {}: {}", descriptor.id, e),
            }
        }

        let key = self.lookup_key(&descriptor)?;
        self.cache.insert(&descriptor.id, &key);
        Ok(VersionRecord::resolved(descriptor, key))
    }

    /// Resolves every descriptor, then flushes the cache.
    pub fn resolve_all(&mut self, descriptors: Vec<VersionDescriptor>) -> Result<Vec<VersionRecord>> {
        let mut records = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            match self.resolve(descriptor) {
                Ok(record) => records.push(record),
                Err(e) => {
                    self.flush_cache();
                    return Err(e);
                }
            }
        }
        self.flush_cache();
        Ok(records)
    }

    pub fn flush_cache(&mut self) {
        self.cache.flush();
    }

    fn lookup_key(&self, descriptor: &VersionDescriptor) -> Result<SemverKey> {
        let id = descriptor.id.as_str();
        let main_class = descriptor.main_class.as_deref();

        if let Some(jar) = self.jars.existing(descriptor) {
            if let Some(key) = self.attempt(id, "main class", &[jar], main_class, None) {
                return Ok(key);
            }
        }

        if let Some(key) = self.attempt(id, "version id", &[], None, Some(id)) {
            return Ok(key);
        }

        if let Some(jar) = self.jars.fetch(descriptor)? {
            if let Some(key) = self.attempt(id, "fetched jar", &[jar], main_class, None) {
                return Ok(key);
            }
        }

        Err(Error::UnresolvableVersion {
            id: id.to_string(),
            hint: Some("add a manual override to the quirks file".to_string()),
        })
    }

    fn attempt(
        &self,
        id: &str,
        strategy: &str,
        artifacts: &[PathBuf],
        main_class: Option<&str>,
        version_id: Option<&str>,
    ) -> Option<SemverKey> {
        let raw = match self.lookup.lookup(artifacts, main_class, version_id) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::debug!("Semver lookup by {} failed for {}: {}", strategy, id, e);
                return None;
            }
        };
        let normalized = self.normalize(id, &raw);
        match SemverKey::parse(&normalized) {
            Ok(key) => Some(key),
            Err(e) => {
                log::debug!("Semver lookup by {} for {} gave {}", strategy, id, e);
                None
            }
        }
    }

    fn normalize(&self, id: &str, raw: &str) -> String {
        let raw = raw.trim();
        let raw = if raw == "client" { id } else { raw };
        self.quirks.apply_fixups(raw)
    }
}
