//! Integration tests for the committer against a real git repository.
//!
//! These tests require the `git` binary and only run with the
//! `integration-tests` feature:
//!
//! ```bash
//! cargo test --features integration-tests --test committer_git_integration
//! ```

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use tempfile::TempDir;

use chronicle::committer::Committer;
use chronicle::config::{ArtifactSettings, GitSettings, NetworkSettings};
use chronicle::download::HttpDownloader;
use chronicle::graph::VersionGraph;
use chronicle::pipeline::paths::ArtifactPaths;
use chronicle::pipeline::{ArtifactKey, PipelineCache, StepStatus};
use chronicle::quirks::Quirks;
use chronicle::repository::DefaultVcsOperations;
use chronicle::resolver::{DownloadingJarSource, NoLookup, SemverCache, SemverResolver};
use chronicle::version::{ReleaseType, VersionDescriptor, VersionRecord};

fn descriptor(id: &str, release_type: ReleaseType, time: &str) -> VersionDescriptor {
    let time: DateTime<FixedOffset> = DateTime::parse_from_rfc3339(time).unwrap();
    VersionDescriptor::new(id, release_type, time)
}

/// Resolves each descriptor to its paired key through manual overrides.
fn resolve(versions: Vec<(VersionDescriptor, &str)>) -> Vec<VersionRecord> {
    let overrides: String = versions
        .iter()
        .map(|(d, key)| format!("  \"{}\": \"{key}\"\n", d.id))
        .collect();
    let quirks = Quirks::from_yaml(&format!("semver_overrides:\n{overrides}")).unwrap();
    let dir = TempDir::new().unwrap();
    let downloader = Arc::new(HttpDownloader::new(&NetworkSettings::default()));
    let jars = DownloadingJarSource::new(ArtifactPaths::new(dir.path()), downloader).offline(true);
    let mut resolver = SemverResolver::new(
        Arc::new(quirks),
        Box::new(NoLookup),
        Box::new(jars),
        SemverCache::new(dir.path().join("semver-cache.json")),
    );
    resolver
        .resolve_all(versions.into_iter().map(|(d, _)| d).collect())
        .unwrap()
}

/// 1.0 -> 1.1 -> 1.2 on the mainline, with a side build forked from 1.1
/// and merged back into 1.2.
fn graph() -> VersionGraph {
    let records = resolve(vec![
        (descriptor("1.0", ReleaseType::Release, "2019-01-01T10:00:00+00:00"), "1.0"),
        (descriptor("1.1", ReleaseType::Release, "2019-02-01T10:00:00+00:00"), "1.1"),
        (
            descriptor("side build", ReleaseType::Snapshot, "2019-02-15T10:00:00+00:00"),
            "1.1.1-side.1",
        ),
        (descriptor("1.2", ReleaseType::Release, "2019-03-01T10:00:00+02:00"), "1.2"),
    ]);
    let quirks = Quirks::from_yaml(
        "branch_points:\n  \"1.1.1-side.1\": [\"1.1\"]\n  \"1.2\": [\"1.1\", \"1.1.1-side.1\"]\n",
    )
    .unwrap();
    VersionGraph::build(records, &quirks).unwrap()
}

fn write_sources(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    zip.start_file("net/minecraft/Main.java", zip::write::FileOptions::default())
        .unwrap();
    zip.write_all(b"class Main {}\n").unwrap();
    zip.finish().unwrap();
}

fn git(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .expect("git is installed");
    assert!(output.status.success(), "git {:?} failed: {:?}", args, output);
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

struct Setup {
    _temp: TempDir,
    repo: std::path::PathBuf,
    committer: Committer,
    cache: PipelineCache,
}

fn setup() -> Setup {
    let temp = TempDir::new().unwrap();
    let repo = temp.path().join("repo");
    let store = ArtifactPaths::new(temp.path().join("store"));

    let sources = temp.path().join("store/sources.jar");
    write_sources(&sources);
    let mut cache = PipelineCache::new();
    cache.insert_artifact(ArtifactKey::DecompiledSources, sources);

    let committer = Committer::new(
        Box::new(DefaultVcsOperations::open(repo.clone()).unwrap()),
        GitSettings::default(),
        ArtifactSettings::default(),
        store,
    );
    Setup {
        _temp: temp,
        repo,
        committer,
        cache,
    }
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_history_with_side_branch_and_merge() {
    let setup = setup();
    let graph = graph();

    for version in graph.ordered() {
        let status = setup
            .committer
            .commit(version, &graph, &setup.cache)
            .unwrap();
        assert_eq!(status, StepStatus::Success, "{}", version.id());
    }

    let first_parent = git(&setup.repo, &["log", "--first-parent", "--format=%s", "master"]);
    assert_eq!(first_parent, "1.2\n1.1\n1.0");

    let merge = git(&setup.repo, &["rev-list", "--parents", "-n", "1", "master"]);
    assert_eq!(merge.split_whitespace().count(), 3);

    let side = git(&setup.repo, &["log", "-1", "--format=%s", "side-build"]);
    assert_eq!(side, "side build");

    let body = git(&setup.repo, &["log", "-1", "--format=%b", "master"]);
    assert_eq!(body, "SemVer: 1.2");

    let date = git(&setup.repo, &["log", "-1", "--format=%ad", "--date=iso-strict", "master"]);
    assert_eq!(date, "2019-03-01T10:00:00+02:00");

    assert!(setup
        .repo
        .join("minecraft/src/net/minecraft/Main.java")
        .is_file());
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_replay_is_up_to_date() {
    let setup = setup();
    let graph = graph();

    for version in graph.ordered() {
        setup
            .committer
            .commit(version, &graph, &setup.cache)
            .unwrap();
    }
    let head = git(&setup.repo, &["rev-parse", "master"]);

    for version in graph.ordered() {
        let status = setup
            .committer
            .commit(version, &graph, &setup.cache)
            .unwrap();
        assert_eq!(status, StepStatus::UpToDate, "{}", version.id());
    }
    assert_eq!(git(&setup.repo, &["rev-parse", "master"]), head);
}

#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_interrupted_history_resumes() {
    let setup = setup();
    let graph = graph();
    let ordered = graph.ordered();

    for version in &ordered[..2] {
        setup
            .committer
            .commit(version, &graph, &setup.cache)
            .unwrap();
    }
    assert_eq!(git(&setup.repo, &["rev-list", "--count", "master"]), "2");

    for version in &ordered {
        setup
            .committer
            .commit(version, &graph, &setup.cache)
            .unwrap();
    }
    assert_eq!(git(&setup.repo, &["rev-list", "--count", "--all"]), "4");
}
