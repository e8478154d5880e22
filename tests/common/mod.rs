//! Shared test utilities for E2E tests.
//!
//! Every fixture is fully offline: the launcher manifest is disabled, version
//! documents come from a local directory and semantic versions from a
//! prefilled semver cache or from client jars behind `file://` URLs, so no
//! lookup tool or network is needed.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_scenario();
//!     fixture.command().arg("versions").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    pub use super::TestFixture;
}

/// One version detail document in launcher format.
pub fn detail_json(id: &str, release_type: &str, release_time: &str) -> String {
    format!(
        r#"{{
  "id": "{id}",
  "type": "{release_type}",
  "releaseTime": "{release_time}",
  "mainClass": "net.minecraft.client.Main"
}}"#
    )
}

/// A temporary workspace with a config file, a storage root and a local
/// versions directory.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
    semver: Vec<(String, String)>,
    branch_points: Vec<(String, Vec<String>)>,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
            semver: Vec::new(),
            branch_points: Vec::new(),
        }
    }

    /// Adds a version document and its cached semantic version.
    pub fn with_version(mut self, id: &str, semver: &str, release_type: &str, day: u32) -> Self {
        let time = format!("2019-{:02}-{:02}T10:00:00+00:00", 1 + day / 28, 1 + day % 28);
        self.temp_dir
            .child(format!("versions/{id}.json"))
            .write_str(&detail_json(id, release_type, &time))
            .expect("Failed to write version document");
        self.semver.push((id.to_string(), semver.to_string()));
        self
    }

    /// Adds a version document without a cached semantic version.
    pub fn with_unresolved_version(self, id: &str) -> Self {
        self.temp_dir
            .child(format!("versions/{id}.json"))
            .write_str(&detail_json(id, "snapshot", "2019-06-01T10:00:00+00:00"))
            .expect("Failed to write version document");
        self
    }

    /// Adds a version document whose client jar embeds `version.json`, and
    /// no cached semantic version.
    pub fn with_client_jar_version(
        self,
        id: &str,
        release_target: Option<&str>,
        release_type: &str,
        day: u32,
    ) -> Self {
        let jar = self.path().join(format!("jars/{id}.jar"));
        std::fs::create_dir_all(jar.parent().expect("jar has a parent"))
            .expect("Failed to create jar directory");
        let embedded = match release_target {
            Some(target) => format!(r#"{{"id": "{id}", "release_target": "{target}"}}"#),
            None => format!(r#"{{"id": "{id}"}}"#),
        };
        let mut zip = zip::ZipWriter::new(File::create(&jar).expect("Failed to create jar"));
        zip.start_file("version.json", zip::write::FileOptions::default())
            .expect("Failed to start jar entry");
        zip.write_all(embedded.as_bytes())
            .expect("Failed to write jar entry");
        zip.finish().expect("Failed to finish jar");

        let time = format!("2019-{:02}-{:02}T10:00:00+00:00", 1 + day / 28, 1 + day % 28);
        let document = format!(
            r#"{{
  "id": "{id}",
  "type": "{release_type}",
  "releaseTime": "{time}",
  "downloads": {{
    "client": {{ "url": "file://{jar}" }}
  }}
}}"#,
            jar = jar.display(),
        );
        self.temp_dir
            .child(format!("versions/{id}.json"))
            .write_str(&document)
            .expect("Failed to write version document");
        self
    }

    /// Declares a predecessor of a semantic version in the quirks file.
    /// Repeated calls for the same version add further predecessors.
    pub fn with_branch_point(mut self, semver: &str, parent: &str) -> Self {
        match self.branch_points.iter_mut().find(|(key, _)| key == semver) {
            Some((_, parents)) => parents.push(parent.to_string()),
            None => self
                .branch_points
                .push((semver.to_string(), vec![parent.to_string()])),
        }
        self
    }

    /// Three releases plus a side build forked from the second one.
    pub fn with_scenario(self) -> Self {
        self.with_version("1.0", "1.0", "release", 0)
            .with_version("1.1", "1.1", "release", 10)
            .with_version("1.2", "1.2", "release", 20)
            .with_version("side build", "1.1.1-side.1", "snapshot", 15)
            .with_branch_point("1.1.1-side.1", "1.1")
    }

    /// Writes `.chronicle.yaml`, the quirks file and the semver cache.
    pub fn write(self) -> Self {
        let quirks: String = self
            .branch_points
            .iter()
            .map(|(key, parents)| {
                let parents: Vec<String> = parents.iter().map(|p| format!("\"{p}\"")).collect();
                format!("  \"{key}\": [{}]\n", parents.join(", "))
            })
            .collect();
        let quirks = if quirks.is_empty() {
            "branch_points: {}\n".to_string()
        } else {
            format!("branch_points:\n{quirks}")
        };
        self.temp_dir
            .child("quirks.yaml")
            .write_str(&quirks)
            .expect("Failed to write quirks file");

        let cache: serde_json::Map<String, serde_json::Value> = self
            .semver
            .iter()
            .map(|(id, key)| (id.clone(), serde_json::Value::String(key.clone())))
            .collect();
        self.temp_dir
            .child("storage/semver-cache-local.json")
            .write_str(&serde_json::to_string_pretty(&cache).expect("serializable cache"))
            .expect("Failed to write semver cache");

        let config = format!(
            r#"storage_root: "{storage}"
mapping: identity
quirks_file: "{quirks}"
sources:
  launcher_manifest: null
  local_dirs:
    - "{versions}"
"#,
            storage = self.storage_path().display(),
            quirks = self.path().join("quirks.yaml").display(),
            versions = self.path().join("versions").display(),
        );
        self.temp_dir
            .child(".chronicle.yaml")
            .write_str(&config)
            .expect("Failed to write config file");
        self
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn storage_path(&self) -> PathBuf {
        self.temp_dir.path().join("storage")
    }

    #[allow(dead_code)]
    pub fn child(&self, path: &str) -> assert_fs::fixture::ChildPath {
        self.temp_dir.child(path)
    }

    /// A command running in this fixture's directory, without colors.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("chronicle");
        cmd.current_dir(self.path())
            .env_remove("CHRONICLE_CONFIG")
            .env_remove("CHRONICLE_STORAGE")
            .env_remove("CHRONICLE_MAPPING")
            .env_remove("CHRONICLE_REPO")
            .arg("--color=never");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
