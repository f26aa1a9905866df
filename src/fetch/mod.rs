// src/fetch/mod.rs

//! Fetcher: retrieve artifacts and verify them before anything else runs
//!
//! The fetch/verify step is a pure function memoized by content hash: given
//! the same expected hash, the fetcher either returns the cached verified
//! bytes or retrieves and verifies them anew. No partial or corrupt artifact
//! is ever handed to later stages.

pub mod cache;
pub mod client;

pub use cache::FetchCache;
pub use client::HttpClient;

use crate::error::{Error, Result};
use crate::hash::ContentHash;
use crate::recipe::SourceLocator;
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Resolve a source locator to a fetchable URL, or a local path
pub fn resolve_locator(locator: &SourceLocator) -> Resolved<'_> {
    match locator {
        SourceLocator::Url { url } => Resolved::Url(url.clone()),
        SourceLocator::Github { github } => Resolved::Url(format!(
            "https://codeload.github.com/{}/{}/tar.gz/refs/tags/{}",
            github.owner, github.repo, github.tag
        )),
        SourceLocator::Path { path } => Resolved::Local(path),
    }
}

/// A locator resolved for fetching
pub enum Resolved<'a> {
    Url(String),
    Local(&'a Path),
}

/// Artifact fetcher backed by the content-addressed cache
pub struct Fetcher {
    cache: FetchCache,
    client: HttpClient,
}

impl Fetcher {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            cache: FetchCache::open(cache_dir)?,
            client: HttpClient::new()?,
        })
    }

    /// Fetch an artifact and verify it against `expected`
    ///
    /// Returns the path of the verified cache entry. On hash mismatch the
    /// partial download is removed and [`Error::Integrity`] returned; later
    /// pipeline stages never see the bytes.
    pub fn fetch(
        &self,
        locator: &SourceLocator,
        expected: &ContentHash,
        progress: Option<&ProgressBar>,
    ) -> Result<PathBuf> {
        if let Some(cached) = self.cache.lookup(expected)? {
            return Ok(cached);
        }

        // Uniquely-named staging file, so concurrent fetches of the same
        // entry cannot interleave writes
        let staged = self.cache.stage()?;
        let actual = match resolve_locator(locator) {
            Resolved::Url(url) => {
                self.client
                    .download(&url, staged.path(), expected.algorithm, progress)?
            }
            Resolved::Local(path) => {
                debug!("Copying local source {}", path.display());
                copy_local(path, staged.path(), expected.algorithm)?
            }
        };

        if actual != *expected {
            // Dropping the staging file removes the partial download
            return Err(Error::Integrity {
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }

        // The promoted entry must be the bytes on disk, not just the stream
        // the transfer hashed
        expected.verify_file(staged.path())?;

        let entry = self.cache.commit(staged, expected)?;
        info!("Fetched and verified {}", expected);
        Ok(entry)
    }
}

/// Copy a local file into the staging path, hashing the copy
fn copy_local(
    source: &Path,
    dest: &Path,
    algorithm: crate::hash::HashAlgorithm,
) -> Result<ContentHash> {
    if !source.exists() {
        return Err(Error::Network(format!(
            "local source not found: {}",
            source.display()
        )));
    }
    fs::copy(source, dest)?;
    crate::hash::hash_file(algorithm, dest)
}
