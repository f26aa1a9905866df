// src/fetch/cache.rs

//! Content-addressed fetch cache
//!
//! Entries are keyed by the descriptor's expected hash, which makes the cache
//! safe to share across package builds: a key either names exactly the bytes
//! it claims or the entry is evicted. Lookups re-verify before handing out a
//! path so a corrupted cache file can never reach the unpacker.

use crate::error::{Error, Result};
use crate::hash::ContentHash;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Content-addressed store of verified artifacts
pub struct FetchCache {
    root: PathBuf,
}

impl FetchCache {
    /// Open (creating if needed) a cache rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory holding the cache entries
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final on-disk location for an entry
    pub fn entry_path(&self, expected: &ContentHash) -> PathBuf {
        self.root.join(expected.cache_key())
    }

    /// Look up a cached artifact, re-verifying its content
    ///
    /// A mismatching entry is evicted and `None` returned so the caller
    /// re-fetches.
    pub fn lookup(&self, expected: &ContentHash) -> Result<Option<PathBuf>> {
        let path = self.entry_path(expected);
        if !path.exists() {
            return Ok(None);
        }

        match expected.verify_file(&path) {
            Ok(()) => {
                debug!("Cache hit for {}", expected);
                Ok(Some(path))
            }
            Err(Error::Integrity { .. }) => {
                warn!("Evicting corrupt cache entry for {}", expected);
                fs::remove_file(&path)?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Open a staging file for an in-flight download
    ///
    /// Every caller gets a uniquely-named file inside the cache root, so
    /// concurrent fetches of the same entry never write through each other.
    /// Dropping the file without committing removes it.
    pub fn stage(&self) -> Result<NamedTempFile> {
        let staged = tempfile::Builder::new()
            .prefix(".part-")
            .tempfile_in(&self.root)?;
        Ok(staged)
    }

    /// Promote a fully-verified staging file to its final entry path
    ///
    /// The caller must have verified the content already; commit is just the
    /// atomic rename. When two fetches race, the loser's rename lands the
    /// same verified bytes over the winner's entry.
    pub fn commit(&self, staged: NamedTempFile, expected: &ContentHash) -> Result<PathBuf> {
        let path = self.entry_path(expected);
        staged.persist(&path).map_err(|e| Error::Io(e.error))?;
        Ok(path)
    }
}
