//! End-to-end tests for the `versions` command.
//!
//! Every fixture is offline: versions come from a local directory and their
//! semantic versions from a prefilled cache or a local client jar.

#[allow(dead_code)]
mod common;
use common::prelude::*;

/// Lines of stdout that describe a version, in printed order.
fn listed_ids(stdout: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|line| line.contains(" <- "))
        .map(|line| {
            line.split("  ")
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        })
        .collect()
}

fn line_for<'a>(stdout: &'a str, id: &str) -> &'a str {
    stdout
        .lines()
        .find(|line| line.starts_with(&format!("{id} ")))
        .unwrap_or_else(|| panic!("no line for {id} in:\n{stdout}"))
}

#[test]
fn test_versions_help() {
    let mut cmd = cargo_bin_cmd!("chronicle");
    cmd.arg("versions")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("List versions in processing order"))
        .stdout(predicate::str::contains("--mainline-only"))
        .stdout(predicate::str::contains("--exclude"));
}

#[test]
fn test_versions_lists_in_processing_order() {
    let fixture = TestFixture::new().with_scenario().write();

    let output = fixture.command().arg("versions").output().unwrap();
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(
        listed_ids(&output.stdout),
        vec!["1.0", "1.1", "side build", "1.2"]
    );
}

#[test]
fn test_versions_show_lineage_and_predecessors() {
    let fixture = TestFixture::new().with_scenario().write();

    let output = fixture.command().arg("versions").output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    let root = line_for(&stdout, "1.0");
    assert!(root.contains("mainline"));
    assert!(root.ends_with("<- (root)"));

    let side = line_for(&stdout, "side build");
    assert!(side.contains("1.1.1-side.1"));
    assert!(side.contains("branch"));
    assert!(side.ends_with("<- 1.1"));

    assert!(line_for(&stdout, "1.2").ends_with("<- 1.1"));
}

#[test]
fn test_versions_roots() {
    let fixture = TestFixture::new().with_scenario().write();

    fixture
        .command()
        .arg("versions")
        .arg("--roots")
        .assert()
        .success()
        .stdout("1.0\n");
}

#[test]
fn test_versions_mainline_only() {
    let fixture = TestFixture::new().with_scenario().write();

    let output = fixture
        .command()
        .arg("versions")
        .arg("--mainline-only")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(listed_ids(&output.stdout), vec!["1.0", "1.1", "1.2"]);
    assert!(String::from_utf8_lossy(&output.stdout).contains("filters: mainline"));
}

#[test]
fn test_versions_exclude_reconnects() {
    let fixture = TestFixture::new().with_scenario().write();

    let output = fixture
        .command()
        .arg("versions")
        .arg("--exclude")
        .arg("1.1")
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(listed_ids(&output.stdout), vec!["1.0", "side build", "1.2"]);
    assert!(line_for(&stdout, "1.2").ends_with("<- 1.0"));
    assert!(line_for(&stdout, "side build").ends_with("<- 1.0"));
    assert!(stdout.contains("filters: exclude-1.1"));
}

#[test]
fn test_versions_only_by_semver() {
    let fixture = TestFixture::new().with_scenario().write();

    let output = fixture
        .command()
        .arg("versions")
        .arg("--only")
        .arg("1.0,1.1.1-side.1")
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    assert_eq!(listed_ids(&output.stdout), vec!["1.0", "side build"]);
}

#[test]
fn test_versions_all_ignores_filters() {
    let fixture = TestFixture::new().with_scenario().write();

    let output = fixture
        .command()
        .arg("versions")
        .arg("--all")
        .arg("--mainline-only")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(listed_ids(&output.stdout).len(), 4);
}

#[test]
fn test_versions_stable_and_snapshots_conflict() {
    let fixture = TestFixture::new().with_scenario().write();

    fixture
        .command()
        .arg("versions")
        .arg("--stable-only")
        .arg("--snapshots-only")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_versions_invalid_min_version() {
    let fixture = TestFixture::new().with_scenario().write();

    fixture
        .command()
        .arg("versions")
        .arg("--min-version")
        .arg("not-a-version")
        .assert()
        .failure();
}

#[test]
fn test_versions_unresolvable_version() {
    let fixture = TestFixture::new()
        .with_scenario()
        .with_unresolved_version("mystery build")
        .write();

    fixture
        .command()
        .arg("versions")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Could not resolve a semantic version for mystery build",
        ));
}

#[test]
fn test_versions_resolves_uncached_version_from_client_jar() {
    let fixture = TestFixture::new()
        .with_scenario()
        .with_client_jar_version("19w02a", Some("1.14"), "snapshot", 25)
        .write();

    let output = fixture.command().arg("versions").output().unwrap();
    assert!(output.status.success(), "{:?}", output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(line_for(&stdout, "19w02a").contains("1.14-alpha.19.2.a"));
    fixture
        .child("storage/versions/19w02a/client.jar")
        .assert(predicate::path::is_file());

    let cache = std::fs::read_to_string(fixture.storage_path().join("semver-cache-local.json"))
        .unwrap();
    assert!(cache.contains("\"19w02a\": \"1.14-alpha.19.2.a\""));
}

#[test]
fn test_versions_offline_uses_cache_only() {
    let fixture = TestFixture::new()
        .with_scenario()
        .with_client_jar_version("19w02a", Some("1.14"), "snapshot", 25)
        .write();

    fixture
        .command()
        .arg("versions")
        .arg("--offline")
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Could not resolve a semantic version for 19w02a",
        ));
    fixture
        .child("storage/versions/19w02a/client.jar")
        .assert(predicate::path::missing());
}

#[test]
fn test_versions_missing_config() {
    let fixture = TestFixture::new().with_scenario().write();

    fixture
        .command()
        .arg("versions")
        .arg("--config")
        .arg("missing.yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration file not found"));
}
