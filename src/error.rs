//! # Error Handling
//!
//! This module defines the centralized error type for `chronicle`. It uses
//! `thiserror` to build one `Error` enum covering every anticipated failure,
//! each variant carrying enough context to point at the version, file, or
//! command involved.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Variants fall into three groups:
//!   - *Fatal consistency errors* (graph connectivity, ordering mismatches,
//!     unresolvable versions, conflicting metadata). These mean the input
//!     data or the target repository disagree with the version graph and a
//!     human has to intervene; retrying cannot help.
//!   - *Environment errors* (git, external tools, network, checksums,
//!     configuration).
//!   - *Wrapped library errors* (`std::io`, `serde_json`, `serde_yaml`,
//!     `regex`, `url`, `zip`, `semver`).
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! Expected absences (for example a version without patch data) are never
//! errors; they are reported as `StepStatus::NotRun` by the pipeline.

use thiserror::Error;

/// Main error type for chronicle operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error occurred while parsing or validating the configuration.
    ///
    /// This error includes the specific parsing issue and optionally a hint
    /// about how to fix it.
    #[error("Configuration error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// The quirks tables (overrides, fixups, branch points) are malformed.
    #[error("Invalid quirks table: {message}")]
    Quirks { message: String },

    /// Some versions have no predecessor but are not designated roots.
    #[error("Version graph is disconnected, no predecessor for: {versions}")]
    GraphDisconnected { versions: String },

    /// The predecessor relation contains a cycle.
    #[error("Version graph contains a cycle through: {versions}")]
    GraphCycle { versions: String },

    /// Two different versions resolved to the same semantic version key.
    #[error("Versions {first} and {second} share the semantic version {key}")]
    DuplicateVersionKey {
        key: String,
        first: String,
        second: String,
    },

    /// Every resolution strategy failed to produce a parseable key.
    #[error("Could not resolve a semantic version for {id}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    UnresolvableVersion {
        id: String,
        /// Optional hint for how to resolve the version
        hint: Option<String>,
    },

    /// A metadata source delivered a version that conflicts with one already loaded.
    #[error("Conflicting metadata for version {id}: {source_name} differs from an earlier source")]
    DuplicateMetadata { id: String, source_name: String },

    /// The repository branch tip does not match any predecessor of the version.
    #[error("Repository is wrongly ordered while committing {version}: expected tip to be one of [{expected}], found {found:?}")]
    OrderingMismatch {
        version: String,
        expected: String,
        found: Option<String>,
    },

    /// A non-root version was about to become the first commit.
    #[error("Cannot commit non-root version {version} into an empty repository")]
    NonRootInEmptyRepository { version: String },

    /// A root version targets a branch that already exists.
    #[error("Root version {version} targets existing branch {branch}")]
    RootBranchExists { version: String, branch: String },

    /// No commit could be found to branch from.
    #[error("No commit found for {predecessor}, needed as branch point of {version}")]
    MissingBranchPoint {
        version: String,
        predecessor: String,
    },

    /// A step needed an artifact that no earlier step produced.
    #[error("Missing {artifact} for version {version}")]
    MissingArtifact { version: String, artifact: String },

    /// An error occurred while executing a Git command.
    #[error("Git command failed in {repo}: {command} - {stderr}")]
    GitCommand {
        command: String,
        repo: String,
        stderr: String,
    },

    /// An external tool exited unsuccessfully.
    #[error("Tool {tool} failed ({status}): {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    /// A step requires an external tool that has no command configured.
    #[error("No command configured for {tool}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ToolNotConfigured {
        tool: String,
        /// Optional hint for how to configure the tool
        hint: Option<String>,
    },

    /// An error occurred during a network operation.
    #[error("Network operation error: {url} - {message}")]
    Network { url: String, message: String },

    /// A downloaded file does not match its expected checksum.
    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    Checksum {
        path: String,
        expected: String,
        actual: String,
    },

    /// A worker in the task pool panicked or disconnected.
    #[error("Task runner error: {message}")]
    TaskPanicked { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// An archive error, wrapped from `zip::result::ZipError`.
    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A semantic versioning parsing error, wrapped from `semver::Error`.
    #[error("Semver parsing error: {0}")]
    Semver(#[from] semver::Error),
}

impl Error {
    /// Whether this error signals inconsistent data that must not be retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::GraphDisconnected { .. }
                | Error::GraphCycle { .. }
                | Error::DuplicateVersionKey { .. }
                | Error::UnresolvableVersion { .. }
                | Error::DuplicateMetadata { .. }
                | Error::OrderingMismatch { .. }
                | Error::NonRootInEmptyRepository { .. }
                | Error::RootBranchExists { .. }
                | Error::MissingBranchPoint { .. }
                | Error::MissingArtifact { .. }
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
