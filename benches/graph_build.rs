//! Benchmarks for building and filtering the version graph.
//!
//! The synthetic history is shaped like the real one: a long mainline of
//! releases and weekly snapshots, plus short side lineages forking off
//! every tenth release.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset};
use chronicle::config::{FilterSettings, NetworkSettings};
use chronicle::download::HttpDownloader;
use chronicle::graph::{apply_filters, VersionGraph};
use chronicle::pipeline::paths::ArtifactPaths;
use chronicle::quirks::Quirks;
use chronicle::resolver::{DownloadingJarSource, NoLookup, SemverCache, SemverResolver};
use chronicle::version::{ReleaseType, VersionDescriptor, VersionRecord};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::TempDir;

const RELEASES: u64 = 150;

fn record(
    id: String,
    key: String,
    release_type: ReleaseType,
    day: i64,
) -> (VersionDescriptor, String) {
    let base = DateTime::parse_from_rfc3339("2011-11-18T00:00:00+00:00").unwrap();
    let time: DateTime<FixedOffset> = base + Duration::days(day);
    (VersionDescriptor::new(id, release_type, time), key)
}

/// Resolves each descriptor to its paired key through manual overrides.
fn resolve(versions: Vec<(VersionDescriptor, String)>) -> Vec<VersionRecord> {
    let mut overrides = String::from("semver_overrides:\n");
    for (descriptor, key) in &versions {
        overrides.push_str(&format!("  \"{}\": \"{key}\"\n", descriptor.id));
    }
    let dir = TempDir::new().unwrap();
    let downloader = Arc::new(HttpDownloader::new(&NetworkSettings::default()));
    let jars = DownloadingJarSource::new(ArtifactPaths::new(dir.path()), downloader).offline(true);
    let mut resolver = SemverResolver::new(
        Arc::new(Quirks::from_yaml(&overrides).unwrap()),
        Box::new(NoLookup),
        Box::new(jars),
        SemverCache::new(dir.path().join("semver-cache.json")),
    );
    resolver
        .resolve_all(versions.into_iter().map(|(descriptor, _)| descriptor).collect())
        .unwrap()
}

/// Records and the quirks document wiring up their side lineages.
fn synthetic_history() -> (Vec<VersionRecord>, Quirks) {
    let mut records = Vec::new();
    let mut branch_points = String::from("branch_points:\n");
    let mut day = 0;

    for minor in 0..RELEASES {
        for week in 0..3 {
            day += 7;
            records.push(record(
                format!("{:02}w{:02}{}", 10 + minor / 50, minor % 50, (b'a' + week) as char),
                format!("1.{minor}-alpha.{minor}.{week}"),
                ReleaseType::Snapshot,
                day,
            ));
        }
        day += 7;
        records.push(record(
            format!("1.{minor}"),
            format!("1.{minor}"),
            ReleaseType::Release,
            day,
        ));

        if minor % 10 == 0 {
            let mut parent = format!("1.{minor}");
            for step in 1..=3 {
                let key = format!("1.{minor}.1-side.{step}");
                records.push(record(
                    format!("side {minor} build {step}"),
                    key.clone(),
                    ReleaseType::Snapshot,
                    day + step,
                ));
                branch_points.push_str(&format!("  \"{key}\": [\"{parent}\"]\n"));
                parent = key;
            }
        }
    }

    (resolve(records), Quirks::from_yaml(&branch_points).unwrap())
}

fn bench_build(c: &mut Criterion) {
    let (records, quirks) = synthetic_history();
    let mut group = c.benchmark_group("graph_build");

    group.bench_function("build", |b| {
        b.iter(|| VersionGraph::build(black_box(records.clone()), &quirks).unwrap())
    });

    let graph = VersionGraph::build(records, &quirks).unwrap();
    group.bench_function("ordered", |b| b.iter(|| black_box(&graph).ordered().len()));

    group.finish();
}

fn bench_filters(c: &mut Criterion) {
    let (records, quirks) = synthetic_history();
    let graph = VersionGraph::build(records, &quirks).unwrap();
    let mut group = c.benchmark_group("graph_filter");

    group.bench_function("mainline", |b| {
        b.iter(|| black_box(&graph).filter_mainline().unwrap())
    });

    group.bench_function("stable_range", |b| {
        let settings = FilterSettings {
            stable_only: true,
            min_version: Some("1.20".to_string()),
            max_version: Some("1.120".to_string()),
            ..FilterSettings::default()
        };
        b.iter(|| apply_filters(black_box(&graph), &settings).unwrap())
    });

    group.bench_function("exclude_reconnect", |b| {
        let excluded: Vec<String> = (0..RELEASES).step_by(3).map(|m| format!("1.{m}")).collect();
        b.iter(|| black_box(&graph).filter_exclude(&excluded).unwrap())
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_filters);
criterion_main!(benches);
