// src/metadata.rs

//! Metadata/test registrar
//!
//! Builds the descriptive record attached to a finished build. The record
//! never influences the artifact tree; it exists for downstream tooling
//! (catalogs, vulnerability trackers, CI). Integration-test references are
//! attached only when the host platform matches their gate, so a non-matching
//! host produces the same files with an empty test-reference set.

use crate::error::{Error, Result};
use crate::recipe::Descriptor;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Descriptive record for one built package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub name: String,
    pub version: String,
    pub description: Option<String>,
    pub license: Option<String>,
    pub maintainers: Vec<String>,
    pub platforms: Vec<String>,
    /// Integration-test identifiers attached for this host
    pub tests: Vec<String>,
}

/// Build the metadata record for `descriptor` as seen from `host_platform`
pub fn register(descriptor: &Descriptor, host_platform: &str) -> MetadataRecord {
    let meta = &descriptor.metadata;

    if !meta.platforms.is_empty() && !meta.platforms.iter().any(|p| p == host_platform) {
        warn!(
            "{} lists platforms {:?} but the host is {}",
            descriptor.package.name, meta.platforms, host_platform
        );
    }

    let tests: Vec<String> = meta
        .tests
        .iter()
        .filter(|t| t.platforms.is_empty() || t.platforms.iter().any(|p| p == host_platform))
        .map(|t| t.name.clone())
        .collect();

    debug!(
        "Registered metadata for {} ({} test ref(s) on {})",
        descriptor.package.name,
        tests.len(),
        host_platform
    );

    MetadataRecord {
        name: descriptor.package.name.clone(),
        version: descriptor.package.version.clone(),
        description: meta.description.clone(),
        license: meta.license.clone(),
        maintainers: meta.maintainers.clone(),
        platforms: meta.platforms.clone(),
        tests,
    }
}

/// Write the record as JSON next to the output directory
pub fn write_record(record: &MetadataRecord, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(record)
        .map_err(|e| Error::Parse(format!("failed to encode metadata record: {e}")))?;
    std::fs::write(path, json)?;
    Ok(())
}
