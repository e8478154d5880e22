//! Remote metadata sources: the launcher manifest and extra detail documents.

use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ExtraVersion;
use crate::download::{download_verified, Checksum, Downloader};
use crate::error::Result;
use crate::manifest::{read_detail_file, MetadataSource};
use crate::tasks::BoundedRunner;
use crate::version::VersionDescriptor;

const MANIFEST_FILE: &str = "version_manifest_v2.json";

#[derive(Debug, Deserialize)]
struct LauncherManifest {
    versions: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    id: String,
    url: String,
    #[serde(default)]
    sha1: Option<String>,
}

/// One detail document to fetch.
struct DetailRequest {
    url: String,
    checksum: Option<Checksum>,
    dest: PathBuf,
}

/// Downloads every request through the runner and parses the documents,
/// returning them in request order.
fn fetch_details(
    downloader: &dyn Downloader,
    threads: usize,
    requests: Vec<DetailRequest>,
) -> Result<Vec<VersionDescriptor>> {
    let runner = BoundedRunner::new(threads)?;
    let tasks: Vec<_> = requests
        .into_iter()
        .enumerate()
        .map(|(index, request)| {
            move || -> Result<(usize, VersionDescriptor)> {
                download_verified(
                    downloader,
                    &request.url,
                    request.checksum.as_ref(),
                    &request.dest,
                )?;
                Ok((index, read_detail_file(&request.dest)?))
            }
        })
        .collect();

    let mut completed = runner.run_all(tasks)?;
    completed.sort_by_key(|(index, _)| *index);
    Ok(completed.into_iter().map(|(_, descriptor)| descriptor).collect())
}

fn file_name_of(url: &str) -> String {
    url.rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or("version.json")
        .to_string()
}

/// The launcher's `version_manifest_v2.json` and the detail documents it
/// lists.
pub struct LauncherManifestSource {
    name: String,
    url: String,
    meta_dir: PathBuf,
    downloader: Arc<dyn Downloader>,
    threads: usize,
}

impl LauncherManifestSource {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        meta_dir: PathBuf,
        downloader: Arc<dyn Downloader>,
        threads: usize,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            meta_dir,
            downloader,
            threads,
        }
    }

    fn manifest_path(&self) -> PathBuf {
        self.meta_dir.join(MANIFEST_FILE)
    }

    /// Fetches the manifest, falling back to the last copy when offline.
    fn refresh_manifest(&self) -> Result<PathBuf> {
        let path = self.manifest_path();
        let fresh = self.meta_dir.join(format!("{MANIFEST_FILE}.new"));
        match self.downloader.fetch_to(&self.url, &fresh) {
            Ok(()) => {
                std::fs::rename(&fresh, &path)?;
            }
            Err(e) if path.is_file() => {
                log::warn!(
                    "Could not refresh launcher manifest ({}), using cached copy",
                    e
                );
            }
            Err(e) => return Err(e),
        }
        Ok(path)
    }
}

impl MetadataSource for LauncherManifestSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn load(&self) -> Result<Vec<VersionDescriptor>> {
        let manifest_path = self.refresh_manifest()?;
        let manifest: LauncherManifest =
            serde_json::from_str(&std::fs::read_to_string(&manifest_path)?)?;
        log::debug!(
            "Launcher manifest lists {} versions",
            manifest.versions.len()
        );

        let requests = manifest
            .versions
            .into_iter()
            .map(|entry| DetailRequest {
                dest: self.meta_dir.join(format!("{}.json", entry.id)),
                url: entry.url,
                checksum: entry.sha1.map(Checksum::Sha1),
            })
            .collect();
        fetch_details(self.downloader.as_ref(), self.threads, requests)
    }
}

/// Individually published detail documents, optionally zipped.
pub struct ExtraVersionSource {
    entries: Vec<ExtraVersion>,
    meta_dir: PathBuf,
    downloader: Arc<dyn Downloader>,
    threads: usize,
}

impl ExtraVersionSource {
    pub fn new(
        entries: Vec<ExtraVersion>,
        meta_dir: PathBuf,
        downloader: Arc<dyn Downloader>,
        threads: usize,
    ) -> Self {
        Self {
            entries,
            meta_dir,
            downloader,
            threads,
        }
    }

    fn dest_for(&self, url: &str) -> PathBuf {
        self.meta_dir.join(file_name_of(url))
    }
}

impl MetadataSource for ExtraVersionSource {
    fn name(&self) -> &str {
        "extra"
    }

    fn load(&self) -> Result<Vec<VersionDescriptor>> {
        let requests = self
            .entries
            .iter()
            .map(|entry| DetailRequest {
                dest: self.dest_for(&entry.url),
                url: entry.url.clone(),
                checksum: entry.checksum(),
            })
            .collect();
        fetch_details(self.downloader.as_ref(), self.threads, requests)
    }
}
