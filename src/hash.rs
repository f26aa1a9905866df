// src/hash.rs

//! Content hashing for artifact integrity and fetch-cache addressing
//!
//! Two algorithms are supported:
//! - **SHA-256**: cryptographic, the default for verifying fetched artifacts
//!   against descriptor checksums
//! - **XXH128**: non-cryptographic but very fast, accepted for descriptors
//!   whose artifacts come from trusted local sources
//!
//! Hashes travel as prefixed strings (`sha256:<hex>`, `xxh128:<hex>`); an
//! unprefixed string is treated as SHA-256.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use xxhash_rust::xxh3::xxh3_128;

/// Hash algorithm selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HashAlgorithm {
    /// SHA-256, cryptographic (default)
    #[default]
    Sha256,
    /// XXH128, fast non-cryptographic
    Xxh128,
}

impl HashAlgorithm {
    /// Hash output length in hex characters
    #[inline]
    pub const fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Xxh128 => 32,
        }
    }

    /// Algorithm name as used in prefixed hash strings
    #[inline]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Xxh128 => "xxh128",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "xxh128" | "xxh3" => Ok(Self::Xxh128),
            _ => Err(Error::Parse(format!(
                "unknown hash algorithm: {} (supported: sha256, xxh128)",
                s
            ))),
        }
    }
}

/// A content hash: algorithm plus lowercase hex digest
///
/// Used both as the integrity check for fetched artifacts and as the key
/// addressing entries in the fetch cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentHash {
    pub algorithm: HashAlgorithm,
    pub value: String,
}

impl ContentHash {
    /// Create a hash from an algorithm and hex digest, validating the digest
    pub fn new(algorithm: HashAlgorithm, value: impl Into<String>) -> Result<Self> {
        let value: String = value.into();

        if value.len() != algorithm.hex_len() {
            return Err(Error::Parse(format!(
                "invalid {} digest length: expected {} hex chars, got {}",
                algorithm,
                algorithm.hex_len(),
                value.len()
            )));
        }
        if !value.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Parse(format!("invalid hex in digest: {}", value)));
        }

        Ok(Self {
            algorithm,
            value: value.to_lowercase(),
        })
    }

    fn new_unchecked(algorithm: HashAlgorithm, value: String) -> Self {
        Self { algorithm, value }
    }

    /// Parse a prefixed hash string (`sha256:<hex>` or `xxh128:<hex>`)
    ///
    /// Unprefixed strings are treated as SHA-256.
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((algo, hex)) => Self::new(algo.parse()?, hex),
            None => Self::new(HashAlgorithm::Sha256, s),
        }
    }

    /// Hex digest without the algorithm prefix
    #[inline]
    pub fn hex(&self) -> &str {
        &self.value
    }

    /// Filesystem-safe cache key (`sha256_<hex>`)
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.algorithm.name(), self.value)
    }

    /// Verify that a file's content matches this hash
    ///
    /// Streams the file rather than loading it whole. Returns
    /// [`Error::Integrity`] on mismatch.
    pub fn verify_file(&self, path: &Path) -> Result<()> {
        let mut file = File::open(path)?;
        let actual = hash_reader(self.algorithm, &mut file)?;
        self.check(&actual)
    }

    /// Verify that a byte slice matches this hash
    pub fn verify_bytes(&self, data: &[u8]) -> Result<()> {
        self.check(&hash_bytes(self.algorithm, data))
    }

    fn check(&self, actual: &ContentHash) -> Result<()> {
        if actual.value == self.value {
            Ok(())
        } else {
            Err(Error::Integrity {
                expected: self.to_string(),
                actual: actual.to_string(),
            })
        }
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.name(), self.value)
    }
}

/// Incremental hasher, used to digest downloads while they stream to disk
pub struct Hasher {
    algorithm: HashAlgorithm,
    state: HasherState,
}

enum HasherState {
    Sha256(Sha256),
    // XXH3 has no incremental API in this binding, buffer the input
    Xxh128(Vec<u8>),
}

impl Hasher {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        let state = match algorithm {
            HashAlgorithm::Sha256 => HasherState::Sha256(Sha256::new()),
            HashAlgorithm::Xxh128 => HasherState::Xxh128(Vec::new()),
        };
        Self { algorithm, state }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HasherState::Sha256(h) => h.update(data),
            HasherState::Xxh128(buf) => buf.extend_from_slice(data),
        }
    }

    pub fn finalize(self) -> ContentHash {
        let value = match self.state {
            HasherState::Sha256(h) => format!("{:x}", h.finalize()),
            HasherState::Xxh128(buf) => format!("{:032x}", xxh3_128(&buf)),
        };
        ContentHash::new_unchecked(self.algorithm, value)
    }
}

/// Compute the hash of a byte slice
pub fn hash_bytes(algorithm: HashAlgorithm, data: &[u8]) -> ContentHash {
    let mut hasher = Hasher::new(algorithm);
    hasher.update(data);
    hasher.finalize()
}

/// Compute the hash of everything a reader yields
pub fn hash_reader<R: Read>(algorithm: HashAlgorithm, reader: &mut R) -> Result<ContentHash> {
    let mut hasher = Hasher::new(algorithm);
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(hasher.finalize())
}

/// Compute the hash of a file's content
pub fn hash_file(algorithm: HashAlgorithm, path: &Path) -> Result<ContentHash> {
    let mut file = File::open(path)?;
    hash_reader(algorithm, &mut file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_value() {
        let hash = hash_bytes(HashAlgorithm::Sha256, b"hello world");
        assert_eq!(
            hash.value,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_xxh128_digest_length() {
        let hash = hash_bytes(HashAlgorithm::Xxh128, b"hello world");
        assert_eq!(hash.value.len(), 32);
    }

    #[test]
    fn test_incremental_matches_oneshot() {
        let full = hash_bytes(HashAlgorithm::Sha256, b"Hello, World!");

        let mut hasher = Hasher::new(HashAlgorithm::Sha256);
        hasher.update(b"Hello, ");
        hasher.update(b"World!");
        assert_eq!(hasher.finalize(), full);
    }

    #[test]
    fn test_parse_prefixed() {
        let hash = ContentHash::parse(
            "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        )
        .unwrap();
        assert_eq!(hash.algorithm, HashAlgorithm::Sha256);

        let hash = ContentHash::parse("xxh128:00000000000000000000000000000000").unwrap();
        assert_eq!(hash.algorithm, HashAlgorithm::Xxh128);

        // Unprefixed defaults to SHA-256
        let hash = ContentHash::parse(
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9",
        )
        .unwrap();
        assert_eq!(hash.algorithm, HashAlgorithm::Sha256);
    }

    #[test]
    fn test_parse_rejects_bad_digests() {
        assert!(ContentHash::parse("sha256:abc").is_err());
        assert!(ContentHash::parse("md5:abcdef").is_err());
        assert!(
            ContentHash::parse(
                "sha256:zzzz27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
            )
            .is_err()
        );
    }

    #[test]
    fn test_verify_bytes() {
        let data = b"some artifact content";
        let good = hash_bytes(HashAlgorithm::Sha256, data);
        assert!(good.verify_bytes(data).is_ok());

        let wrong = ContentHash::new(
            HashAlgorithm::Sha256,
            "0000000000000000000000000000000000000000000000000000000000000000",
        )
        .unwrap();
        let err = wrong.verify_bytes(data).unwrap_err();
        assert!(matches!(err, Error::Integrity { .. }));
    }

    #[test]
    fn test_verify_file_streams() {
        let temp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(temp.path(), b"file bytes").unwrap();

        let expected = hash_bytes(HashAlgorithm::Sha256, b"file bytes");
        assert!(expected.verify_file(temp.path()).is_ok());

        let other = hash_bytes(HashAlgorithm::Sha256, b"different bytes");
        assert!(other.verify_file(temp.path()).is_err());
    }

    #[test]
    fn test_case_insensitive_digest() {
        let data = b"case test";
        let lower = hash_bytes(HashAlgorithm::Sha256, data);
        let upper = ContentHash::parse(&format!("sha256:{}", lower.value.to_uppercase())).unwrap();
        assert!(upper.verify_bytes(data).is_ok());
    }

    #[test]
    fn test_cache_key_is_filesystem_safe() {
        let hash = hash_bytes(HashAlgorithm::Sha256, b"x");
        let key = hash.cache_key();
        assert!(key.starts_with("sha256_"));
        assert!(!key.contains(':'));
        assert!(!key.contains('/'));
    }
}
