//! Total-order version keys.
//!
//! Game versions do not follow strict three-part semver: keys such as
//! `0.0.0.161348-rd` or `1.14` have four or two numeric components. A
//! `SemverKey` accepts any number of numeric components, reuses
//! `semver::Prerelease` for pre-release validation and precedence, and keeps
//! build metadata as a string that takes part in ordering.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use semver::{BuildMetadata, Prerelease};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// A key that failed the grammar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid semantic version {input:?}: {reason}")]
pub struct ParseKeyError {
    pub input: String,
    pub reason: String,
}

impl ParseKeyError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Ordering key for a version: `N(.N)*(-pre)?(+build)?`.
#[derive(Debug, Clone)]
pub struct SemverKey {
    raw: String,
    components: Vec<u64>,
    pre: Prerelease,
    build: String,
}

impl SemverKey {
    /// Parses `input`, returning an error when it does not fit the grammar.
    pub fn parse(input: &str) -> Result<Self, ParseKeyError> {
        if input.is_empty() {
            return Err(ParseKeyError::new(input, "empty version"));
        }

        let (rest, build) = match input.split_once('+') {
            Some((rest, build)) => {
                if build.is_empty() {
                    return Err(ParseKeyError::new(input, "empty build metadata"));
                }
                BuildMetadata::new(build)
                    .map_err(|e| ParseKeyError::new(input, format!("build metadata: {e}")))?;
                (rest, build.to_string())
            }
            None => (input, String::new()),
        };

        let (core, pre) = match rest.split_once('-') {
            Some((core, pre)) => {
                if pre.is_empty() {
                    return Err(ParseKeyError::new(input, "empty pre-release"));
                }
                let pre = Prerelease::new(pre)
                    .map_err(|e| ParseKeyError::new(input, format!("pre-release: {e}")))?;
                (core, pre)
            }
            None => (rest, Prerelease::EMPTY),
        };

        let components = core
            .split('.')
            .map(|part| {
                if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(ParseKeyError::new(
                        input,
                        format!("component {part:?} is not numeric"),
                    ));
                }
                part.parse::<u64>()
                    .map_err(|e| ParseKeyError::new(input, format!("component {part:?}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: input.to_string(),
            components,
            pre,
            build,
        })
    }

    /// A release key made of numeric components only.
    pub fn release(components: &[u64]) -> Self {
        let raw = components
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Self {
            raw,
            components: components.to_vec(),
            pre: Prerelease::EMPTY,
            build: String::new(),
        }
    }

    /// Whether `input` parses.
    pub fn is_valid(input: &str) -> bool {
        Self::parse(input).is_ok()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn components(&self) -> &[u64] {
        &self.components
    }

    pub fn prerelease(&self) -> &str {
        self.pre.as_str()
    }

    pub fn build(&self) -> &str {
        &self.build
    }

    fn component(&self, index: usize) -> u64 {
        self.components.get(index).copied().unwrap_or(0)
    }

    /// Components without trailing zeros, so `1.0` and `1.0.0` hash alike.
    fn significant_components(&self) -> &[u64] {
        let len = self
            .components
            .iter()
            .rposition(|c| *c != 0)
            .map_or(0, |i| i + 1);
        &self.components[..len]
    }
}

impl Ord for SemverKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let width = self.components.len().max(other.components.len());
        for i in 0..width {
            match self.component(i).cmp(&other.component(i)) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        self.pre
            .cmp(&other.pre)
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl PartialOrd for SemverKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SemverKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemverKey {}

impl Hash for SemverKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.significant_components().hash(state);
        self.pre.hash(state);
        self.build.hash(state);
    }
}

impl fmt::Display for SemverKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for SemverKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SemverKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for SemverKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SemverKey::parse(&raw).map_err(serde::de::Error::custom)
    }
}
