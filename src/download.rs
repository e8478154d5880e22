//! # Verified Downloads
//!
//! Every remote file chronicle uses (manifests, version documents, jars,
//! asset objects) goes through [`download_verified`]. A file already on disk
//! whose checksum matches is never fetched again, which is what makes a
//! second pipeline run cheap.
//!
//! ## Process
//!
//! 1.  **Check**: if `dest` exists and matches the expected checksum (or no
//!     checksum is known), report [`DownloadOutcome::Cached`].
//! 2.  **Fetch**: ask the [`Downloader`] to write the URL to `dest`. The HTTP
//!     implementation retries transport failures with a doubling backoff.
//! 3.  **Verify**: compare the checksum. On mismatch the file is deleted and
//!     fetched again; after the last attempt the mismatch becomes
//!     `Error::Checksum`.

use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crate::config::NetworkSettings;
use crate::defaults;
use crate::error::{Error, Result};

const USER_AGENT: &str = concat!("chronicle/", env!("CARGO_PKG_VERSION"));

/// Expected digest of a downloaded file, as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Checksum {
    Sha1(String),
    Sha256(String),
}

impl Checksum {
    pub fn expected(&self) -> &str {
        match self {
            Checksum::Sha1(hex) | Checksum::Sha256(hex) => hex,
        }
    }

    /// Hex digest of the file at `path` using this checksum's algorithm.
    pub fn compute(&self, path: &Path) -> Result<String> {
        let mut file = fs::File::open(path)?;
        let hex = match self {
            Checksum::Sha1(_) => format!("{:x}", hash_reader::<Sha1>(&mut file)?.finalize()),
            Checksum::Sha256(_) => format!("{:x}", hash_reader::<Sha256>(&mut file)?.finalize()),
        };
        Ok(hex)
    }

    pub fn matches(&self, path: &Path) -> Result<bool> {
        Ok(self.compute(path)?.eq_ignore_ascii_case(self.expected()))
    }
}

fn hash_reader<D: Digest>(reader: &mut impl Read) -> Result<D> {
    let mut hasher = D::new();
    let mut buffer = [0u8; 64 * 1024];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher)
}

/// Whether the file was already present or had to be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadOutcome {
    Cached,
    Downloaded,
}

/// Transport that writes the body of a URL to a file.
pub trait Downloader: Send + Sync {
    fn fetch_to(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Downloader backed by a `ureq` agent.
///
/// `file://` URLs are copied from disk, so local mirrors work without a
/// server.
pub struct HttpDownloader {
    agent: ureq::Agent,
    attempts: u32,
    backoff: Duration,
    offline: bool,
}

impl HttpDownloader {
    pub fn new(settings: &NetworkSettings) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build();
        Self {
            agent,
            attempts: settings.download_retries.max(1),
            backoff: Duration::from_millis(500),
            offline: settings.offline,
        }
    }

    /// Sets the delay before the first retry.
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn fetch_once(&self, url: &str, dest: &Path) -> Result<()> {
        let partial = partial_path(dest);
        if let Some(path) = url.strip_prefix("file://") {
            fs::copy(path, &partial).map_err(|e| Error::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        } else {
            let response = self
                .agent
                .get(url)
                .set("User-Agent", USER_AGENT)
                .call()
                .map_err(|e| Error::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            let mut reader = response.into_reader();
            let mut file = fs::File::create(&partial)?;
            std::io::copy(&mut reader, &mut file).map_err(|e| Error::Network {
                url: url.to_string(),
                message: format!("failed to read body: {e}"),
            })?;
            file.flush()?;
        }
        fs::rename(&partial, dest)?;
        Ok(())
    }
}

impl Downloader for HttpDownloader {
    fn fetch_to(&self, url: &str, dest: &Path) -> Result<()> {
        if self.offline && !url.starts_with("file://") {
            return Err(Error::Network {
                url: url.to_string(),
                message: "offline mode".to_string(),
            });
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut delay = self.backoff;
        let mut attempt = 1;
        loop {
            match self.fetch_once(url, dest) {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.attempts => {
                    log::debug!(
                        "Download of {} failed (attempt {}/{}): {}",
                        url,
                        attempt,
                        self.attempts,
                        e
                    );
                    let _ = fs::remove_file(partial_path(dest));
                    thread::sleep(delay);
                    delay *= 2;
                    attempt += 1;
                }
                Err(e) => {
                    let _ = fs::remove_file(partial_path(dest));
                    return Err(e);
                }
            }
        }
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

/// Ensures `dest` holds the content of `url`, verified against `checksum`.
pub fn download_verified(
    downloader: &dyn Downloader,
    url: &str,
    checksum: Option<&Checksum>,
    dest: &Path,
) -> Result<DownloadOutcome> {
    if dest.is_file() {
        match checksum {
            None => return Ok(DownloadOutcome::Cached),
            Some(sum) if sum.matches(dest)? => return Ok(DownloadOutcome::Cached),
            Some(_) => {
                log::debug!("Cached {} is stale, fetching again", dest.display());
                fs::remove_file(dest)?;
            }
        }
    }

    let mut attempt = 1;
    loop {
        downloader.fetch_to(url, dest)?;
        let Some(sum) = checksum else {
            return Ok(DownloadOutcome::Downloaded);
        };
        let actual = sum.compute(dest)?;
        if actual.eq_ignore_ascii_case(sum.expected()) {
            return Ok(DownloadOutcome::Downloaded);
        }
        fs::remove_file(dest)?;
        if attempt >= defaults::DOWNLOAD_RETRIES {
            return Err(Error::Checksum {
                path: dest.display().to_string(),
                expected: sum.expected().to_string(),
                actual,
            });
        }
        log::warn!(
            "Checksum mismatch for {} (attempt {}), retrying",
            url,
            attempt
        );
        attempt += 1;
    }
}
