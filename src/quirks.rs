//! # Historical Quirks Tables
//!
//! Some released versions cannot be ordered by generic rules: their ids do
//! not parse, the lookup tool reports informal strings for them, or they
//! branched off the mainline somewhere other than their sort neighbour. All of
//! these exceptions live in data (`data/quirks.yaml`, embedded at build time)
//! instead of control flow, so each one can be audited and tested on its own.
//!
//! A user-supplied quirks file with the same layout can extend or replace
//! individual entries; see [`Quirks::load`].

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::version::SemverKey;

const BUILTIN_QUIRKS: &str = include_str!("../data/quirks.yaml");

/// Informal suffix some experimental builds report instead of a pre-release.
const EXPERIMENTAL_SUFFIX: &str = "-Experimental";
const EXPERIMENTAL_REPLACEMENT: &str = "-alpha.0.0.Experimental";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct QuirksFile {
    semver_overrides: BTreeMap<String, String>,
    semver_fixups: BTreeMap<String, String>,
    non_linear_ids: BTreeSet<String>,
    branch_points: BTreeMap<String, Vec<String>>,
}

/// Data-driven mapping from a version key to the keys it branched from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchPoints {
    entries: BTreeMap<SemverKey, Vec<SemverKey>>,
}

impl BranchPoints {
    pub fn new(entries: BTreeMap<SemverKey, Vec<SemverKey>>) -> Self {
        Self { entries }
    }

    /// Parents declared for `key`, if the table has an entry for it.
    pub fn parents(&self, key: &SemverKey) -> Option<&[SemverKey]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Whether `key` is declared as the start of its own lineage.
    pub fn is_declared_root(&self, key: &SemverKey) -> bool {
        self.entries.get(key).is_some_and(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parsed quirks tables.
#[derive(Debug, Clone)]
pub struct Quirks {
    semver_overrides: BTreeMap<String, SemverKey>,
    semver_fixups: BTreeMap<String, String>,
    non_linear_ids: BTreeSet<String>,
    branch_points: Arc<BranchPoints>,
}

impl Quirks {
    /// The tables embedded in the binary.
    pub fn builtin() -> Result<Self> {
        Self::from_yaml(BUILTIN_QUIRKS)
    }

    /// Built-in tables, extended by `extra` when given.
    ///
    /// Entries of the extra file replace built-in entries with the same key.
    pub fn load(extra: Option<&Path>) -> Result<Self> {
        let mut quirks = Self::builtin()?;
        if let Some(path) = extra {
            let content = std::fs::read_to_string(path)?;
            let file: QuirksFile = serde_yaml::from_str(&content)?;
            log::debug!("Loaded quirks overrides from {}", path.display());
            quirks.merge(file)?;
        }
        Ok(quirks)
    }

    /// Parses a complete quirks document.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file: QuirksFile = serde_yaml::from_str(content)?;
        let mut quirks = Self::empty();
        quirks.merge(file)?;
        Ok(quirks)
    }

    /// Tables with no entries at all.
    pub fn empty() -> Self {
        Self {
            semver_overrides: BTreeMap::new(),
            semver_fixups: BTreeMap::new(),
            non_linear_ids: BTreeSet::new(),
            branch_points: Arc::new(BranchPoints::default()),
        }
    }

    fn merge(&mut self, file: QuirksFile) -> Result<()> {
        for (id, raw) in file.semver_overrides {
            let key = parse_entry(&raw, "semver_overrides", &id)?;
            self.semver_overrides.insert(id, key);
        }
        for (from, to) in file.semver_fixups {
            parse_entry(&to, "semver_fixups", &from)?;
            self.semver_fixups.insert(from, to);
        }
        self.non_linear_ids.extend(file.non_linear_ids);

        let mut entries = self.branch_points.entries.clone();
        for (child, parents) in file.branch_points {
            let key = parse_entry(&child, "branch_points", &child)?;
            let parents = parents
                .iter()
                .map(|p| parse_entry(p, "branch_points", &child))
                .collect::<Result<Vec<_>>>()?;
            if parents.contains(&key) {
                return Err(Error::Quirks {
                    message: format!("branch point {child} lists itself as parent"),
                });
            }
            entries.insert(key, parents);
        }
        self.branch_points = Arc::new(BranchPoints::new(entries));
        Ok(())
    }

    /// Hand-authored key for a version id.
    pub fn semver_override(&self, id: &str) -> Option<&SemverKey> {
        self.semver_overrides.get(id)
    }

    /// Rewrites a known-anomalous lookup result into a grammar-valid one.
    pub fn apply_fixups(&self, raw: &str) -> String {
        if let Some(fixed) = self.semver_fixups.get(raw) {
            return fixed.clone();
        }
        if raw.contains(EXPERIMENTAL_SUFFIX) {
            return raw.replace(EXPERIMENTAL_SUFFIX, EXPERIMENTAL_REPLACEMENT);
        }
        raw.to_string()
    }

    /// Whether a snapshot id is always treated as a side branch.
    pub fn is_forced_non_linear(&self, id: &str) -> bool {
        self.non_linear_ids.contains(id)
    }

    pub fn branch_points(&self) -> &Arc<BranchPoints> {
        &self.branch_points
    }
}

fn parse_entry(raw: &str, table: &str, entry: &str) -> Result<SemverKey> {
    SemverKey::parse(raw).map_err(|e| Error::Quirks {
        message: format!("{table} entry {entry}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn key(s: &str) -> SemverKey {
        SemverKey::parse(s).unwrap()
    }

    #[test]
    fn test_builtin_tables_parse() {
        let quirks = Quirks::builtin().unwrap();
        assert_eq!(
            quirks.semver_override("1.16-rc1").map(|k| k.to_string()),
            Some("1.16-rc.9".to_string())
        );
        assert!(quirks.is_forced_non_linear("15w14a"));
        assert!(!quirks.branch_points().is_empty());
    }

    #[test]
    fn test_fixup_table() {
        let quirks = Quirks::builtin().unwrap();
        assert_eq!(quirks.apply_fixups("0.30.1.c"), "0.30.1-c");
        assert_eq!(quirks.apply_fixups("rd-20090515"), "0.0.0.132328-rd20090515");
        assert_eq!(
            quirks.apply_fixups("1.18-Experimental.3"),
            "1.18-alpha.0.0.Experimental.3"
        );
        assert_eq!(quirks.apply_fixups("1.20.4"), "1.20.4");
    }

    #[test]
    fn test_branch_points_with_merge_parents() {
        let quirks = Quirks::builtin().unwrap();
        let parents = quirks
            .branch_points()
            .parents(&key("1.14.5-combat.2"))
            .unwrap();
        assert_eq!(parents, &[key("1.14.4"), key("1.14.3-rc.4.combat.1")]);
        assert!(quirks.branch_points().parents(&key("1.14.4")).is_none());
    }

    #[test]
    fn test_build_metadata_keys_are_distinct_entries() {
        let quirks = Quirks::builtin().unwrap();
        let bp = quirks.branch_points();
        assert!(bp.parents(&key("1.9.2-rv+trendy")).is_some());
        assert!(bp.parents(&key("1.9.2-rv")).is_none());
    }

    #[test]
    fn test_declared_root() {
        let quirks = Quirks::from_yaml("branch_points:\n  \"2.0.0\": []\n").unwrap();
        assert!(quirks.branch_points().is_declared_root(&key("2.0.0")));
        assert!(!quirks.branch_points().is_declared_root(&key("2.0.1")));
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let result = Quirks::from_yaml("semver_overrides:\n  \"x\": \"not valid\"\n");
        assert!(matches!(result, Err(Error::Quirks { .. })));
    }

    #[test]
    fn test_self_parent_is_rejected() {
        let result = Quirks::from_yaml("branch_points:\n  \"1.0.0\": [\"1.0.0\"]\n");
        assert!(matches!(result, Err(Error::Quirks { .. })));
    }

    #[test]
    fn test_unknown_table_is_rejected() {
        assert!(Quirks::from_yaml("unknown_table: {}\n").is_err());
    }

    #[test]
    fn test_load_extends_builtin() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "semver_overrides:\n  \"1.16-rc1\": \"1.16-rc.1\"\n  \"my-build\": \"9.9.9\""
        )
        .unwrap();
        let quirks = Quirks::load(Some(file.path())).unwrap();
        assert_eq!(
            quirks.semver_override("1.16-rc1").map(|k| k.to_string()),
            Some("1.16-rc.1".to_string())
        );
        assert!(quirks.semver_override("my-build").is_some());
        assert_eq!(quirks.apply_fixups("0.30.1.c"), "0.30.1-c");
    }
}
