//! Working-tree helpers used by the committer.
//!
//! Everything here operates on the real filesystem: clearing the tree
//! between versions, unpacking archive subtrees, placing asset objects and
//! normalizing JSON output.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::Result;

/// Removes every entry of `root` except the `.git` directory.
pub fn clear_tree(root: &Path) -> Result<()> {
    if !root.exists() {
        return Ok(());
    }
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_name() == ".git" {
            continue;
        }
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Extracts the entries of `archive` below `prefix` into `dest`, with the
/// prefix stripped. Returns the number of files written.
///
/// An empty prefix extracts the whole archive. Entries whose names would
/// escape `dest` are skipped.
pub fn extract_prefix(archive: &Path, prefix: &str, dest: &Path) -> Result<usize> {
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    let mut written = 0;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry.enclosed_name().map(Path::to_path_buf) else {
            log::warn!(
                "Skipping unsafe entry {} in {}",
                entry.name(),
                archive.display()
            );
            continue;
        };
        let Ok(relative) = name.strip_prefix(prefix) else {
            continue;
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = File::create(&target)?;
        io::copy(&mut entry, &mut out)?;
        written += 1;
    }
    Ok(written)
}

/// Places `source` at `dest`, hardlinking when asked and falling back to a
/// copy when the link cannot be made (for example across filesystems).
pub fn link_or_copy(source: &Path, dest: &Path, hardlink: bool) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    if dest.exists() {
        fs::remove_file(dest)?;
    }
    if hardlink {
        match fs::hard_link(source, dest) {
            Ok(()) => return Ok(()),
            Err(e) => log::debug!(
                "Hardlink {} -> {} failed ({}), copying",
                source.display(),
                dest.display(),
                e
            ),
        }
    }
    fs::copy(source, dest)?;
    Ok(())
}

/// Rewrites every `*.json` file below `root` in pretty form with keys
/// sorted at every depth. Files that fail to parse or write are left as
/// they are with a warning. Returns the number of files rewritten.
pub fn sort_json_files(root: &Path) -> usize {
    let files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != ".git")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();

    let mut rewritten = 0;
    for path in files {
        match sort_json_file(&path) {
            Ok(()) => rewritten += 1,
            Err(e) => log::warn!("Could not sort {}: {}", path.display(), e),
        }
    }
    rewritten
}

fn sort_json_file(path: &Path) -> Result<()> {
    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    let mut pretty = serde_json::to_string_pretty(&sorted(value))?;
    pretty.push('\n');
    fs::write(path, pretty)?;
    Ok(())
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = Map::new();
            for (key, inner) in entries {
                out.insert(key, sorted(inner));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tools::fakes::write_zip;
    use tempfile::TempDir;

    #[test]
    fn test_clear_tree_keeps_git_directory() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".git/refs")).unwrap();
        fs::write(root.join(".git/HEAD"), "ref: refs/heads/master").unwrap();
        fs::create_dir_all(root.join("minecraft/src")).unwrap();
        fs::write(root.join("minecraft/src/A.java"), "class A {}").unwrap();
        fs::write(root.join("README"), "x").unwrap();

        clear_tree(root).unwrap();

        let remaining: Vec<_> = fs::read_dir(root)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(remaining, vec![std::ffi::OsString::from(".git")]);
        assert!(root.join(".git/HEAD").exists());
    }

    #[test]
    fn test_extract_prefix_strips_and_filters() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("client.jar");
        write_zip(
            &jar,
            &[
                ("assets/minecraft/lang/en_us.json", "{}"),
                ("data/minecraft/tags/blocks/logs.json", "{}"),
                ("net/minecraft/Main.class", "cafebabe"),
            ],
        )
        .unwrap();

        let out = dir.path().join("out");
        let count = extract_prefix(&jar, "assets", &out).unwrap();
        assert_eq!(count, 1);
        assert!(out.join("minecraft/lang/en_us.json").exists());
        assert!(!out.join("net").exists());

        let all = dir.path().join("all");
        assert_eq!(extract_prefix(&jar, "", &all).unwrap(), 3);
        assert!(all.join("net/minecraft/Main.class").exists());
    }

    #[test]
    fn test_link_or_copy_replaces_existing() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("object");
        fs::write(&source, "sound").unwrap();
        let dest = dir.path().join("tree/sounds/a.ogg");

        link_or_copy(&source, &dest, true).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "sound");

        fs::write(dir.path().join("other"), "other").unwrap();
        link_or_copy(&dir.path().join("other"), &dest, false).unwrap();
        assert_eq!(fs::read_to_string(&dest).unwrap(), "other");
        assert_eq!(fs::read_to_string(&source).unwrap(), "sound");
    }

    #[test]
    fn test_sort_json_files_sorts_nested_keys() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("reports")).unwrap();
        fs::write(
            root.join("reports/blocks.json"),
            r#"{"b":1,"a":{"z":[{"y":1,"x":2}],"c":3}}"#,
        )
        .unwrap();
        fs::write(root.join("reports/broken.json"), "{not json").unwrap();
        fs::write(root.join("notes.txt"), r#"{"b":1,"a":2}"#).unwrap();

        assert_eq!(sort_json_files(root), 1);

        let sorted = fs::read_to_string(root.join("reports/blocks.json")).unwrap();
        let a = sorted.find("\"a\"").unwrap();
        let b = sorted.find("\"b\"").unwrap();
        let x = sorted.find("\"x\"").unwrap();
        let y = sorted.find("\"y\"").unwrap();
        assert!(a < b);
        assert!(x < y);
        assert!(sorted.contains('\n'));
        assert_eq!(
            fs::read_to_string(root.join("reports/broken.json")).unwrap(),
            "{not json"
        );
        assert_eq!(
            fs::read_to_string(root.join("notes.txt")).unwrap(),
            r#"{"b":1,"a":2}"#
        );
    }
}
