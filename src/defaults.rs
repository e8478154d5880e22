//! Default values for chronicle configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

use crate::version::SemverKey;

/// Configuration file looked up in the current directory.
pub const CONFIG_FILE: &str = ".chronicle.yaml";

/// Branch collecting the linear history.
pub const MAINLINE_BRANCH: &str = "master";

/// Identity recorded on generated commits.
pub const GIT_USER: &str = "Mojang";
pub const GIT_EMAIL: &str = "gitcraft@decompiled.mc";

/// Upstream launcher manifest listing every public version.
pub const LAUNCHER_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

/// Base URL of content-addressed asset objects.
pub const ASSET_OBJECTS_URL: &str = "https://resources.download.minecraft.net";

/// Name of the launcher metadata source, used in cache file names.
pub const LAUNCHER_SOURCE: &str = "mojang";

/// Parallel downloads for asset objects and version documents.
pub const FETCH_THREADS: usize = 8;

/// Attempts per download before giving up.
pub const DOWNLOAD_RETRIES: u32 = 3;

/// HTTP timeout per request.
pub const DOWNLOAD_TIMEOUT_SECS: u64 = 60;

/// First version with data generator reports (18w01a).
pub const FIRST_DATAGEN_VERSION: &str = "1.13-alpha.18.1.a";

/// Client and server can only be merged before remapping from 1.3 on.
pub fn first_mergeable_version() -> SemverKey {
    SemverKey::release(&[1, 3])
}

/// Returns the default storage root directory.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/chronicle` (XDG Base Directory)
/// - macOS: `~/Library/Caches/chronicle`
/// - Windows: `{FOLDERID_LocalAppData}\chronicle`
///
/// Falls back to `.chronicle-cache` in the current directory if the
/// platform cache directory cannot be determined.
///
/// This can be overridden by the `--storage` CLI flag, the
/// `CHRONICLE_STORAGE` environment variable, or `storage_root` in the
/// configuration file.
pub fn default_storage_root() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".chronicle-cache"))
        .join("chronicle")
}
