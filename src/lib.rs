//! # Chronicle
//!
//! Rebuilds the release history of a game as a git repository: every
//! published build becomes one commit holding its decompiled sources and
//! resources, and the commit graph mirrors how builds actually descended from
//! each other, including side lineages such as April-fools builds, combat
//! tests and experimental snapshots.
//!
//! ## Quick Example
//!
//! ```
//! use chronicle::version::SemverKey;
//!
//! let release = SemverKey::parse("1.14.4").unwrap();
//! let pre = SemverKey::parse("1.14.4-pre.1").unwrap();
//! assert!(pre < release);
//!
//! // Missing components compare as zero.
//! assert_eq!(
//!     SemverKey::parse("1.14").unwrap(),
//!     SemverKey::parse("1.14.0").unwrap()
//! );
//! ```
//!
//! ## Core Concepts
//!
//! - **Metadata (`manifest`)**: Loads version descriptors from the launcher
//!   manifest, extra documents and local directories.
//! - **Semantic versions (`version`, `resolver`, `quirks`)**: Attaches a
//!   totally ordered key to every descriptor, with historical exceptions kept
//!   as data.
//! - **Version graph (`graph`)**: Builds the validated DAG of versions and
//!   derives filtered views that stay connected.
//! - **Pipeline (`pipeline`)**: Runs the per-version steps with on-disk
//!   caching, so repeated runs only do new work.
//! - **Committer (`committer`, `repository`, `git`)**: Records each version as
//!   a commit on the right branch of the target repository.
//!
//! ## Execution Flow
//!
//! 1.  **Load**: Merge descriptors from every configured source.
//! 2.  **Resolve**: Attach semantic version keys, using the persistent cache.
//! 3.  **Build**: Construct and validate the version graph.
//! 4.  **Filter**: Apply the configured filters to get the processed view.
//! 5.  **Process**: Run the pipeline for every version in topological order,
//!     committing each one as it completes.

pub mod committer;
pub mod config;
pub mod defaults;
pub mod download;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod graph;
pub mod manifest;
pub mod mapping;
pub mod output;
pub mod pipeline;
pub mod quirks;
pub mod repository;
pub mod resolver;
pub mod tasks;
pub mod version;

#[cfg(test)]
mod semver_proptest;
