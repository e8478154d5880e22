//! Local directories of version detail documents.
//!
//! Used for versions that were never published through the launcher and for
//! offline runs. Documents may declare parent ids through a `parents` array.

use std::path::PathBuf;
use walkdir::WalkDir;

use crate::error::Result;
use crate::manifest::{read_detail_file, MetadataSource};
use crate::version::VersionDescriptor;

pub struct LocalDescriptorSource {
    dir: PathBuf,
}

impl LocalDescriptorSource {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

impl MetadataSource for LocalDescriptorSource {
    fn name(&self) -> &str {
        "local"
    }

    fn load(&self) -> Result<Vec<VersionDescriptor>> {
        if !self.dir.is_dir() {
            log::warn!(
                "Local version directory {} does not exist",
                self.dir.display()
            );
            return Ok(Vec::new());
        }

        let mut descriptors = Vec::new();
        for entry in WalkDir::new(&self.dir).sort_by_file_name() {
            let entry = entry.map_err(|e| std::io::Error::other(e.to_string()))?;
            let is_document = entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == "json" || ext == "zip");
            if !is_document {
                continue;
            }
            log::debug!("Reading local version document {}", entry.path().display());
            descriptors.push(read_detail_file(entry.path())?);
        }
        Ok(descriptors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::fixtures::detail_json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_loads_json_documents_recursively_in_name_order() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("b.json"),
            detail_json("1.1", "release", "2011-01-02T00:00:00+00:00"),
        )
        .unwrap();
        fs::write(
            dir.path().join("a.json"),
            detail_json("1.0", "release", "2011-01-01T00:00:00+00:00"),
        )
        .unwrap();
        fs::write(
            dir.path().join("nested/c.json"),
            detail_json("1.2", "release", "2011-01-03T00:00:00+00:00"),
        )
        .unwrap();
        fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let source = LocalDescriptorSource::new(dir.path().to_path_buf());
        let ids: Vec<_> = source.load().unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["1.0", "1.1", "1.2"]);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let source = LocalDescriptorSource::new(dir.path().join("absent"));
        assert!(source.load().unwrap().is_empty());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.json"), "{ not json").unwrap();
        let source = LocalDescriptorSource::new(dir.path().to_path_buf());
        assert!(source.load().is_err());
    }
}
