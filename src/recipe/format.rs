// src/recipe/format.rs

//! Descriptor file format definitions
//!
//! Descriptors are TOML files describing exactly one buildable package:
//! where its artifact comes from, the hash the bytes must have, the edits to
//! apply, the optional upstream build command, and the enumerated set of
//! paths that end up in the output directory.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// A complete package descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Descriptor {
    /// Package identity
    pub package: PackageSection,

    /// Primary source artifact
    pub source: SourceSection,

    /// Literal text substitutions applied in order after unpacking
    #[serde(default)]
    pub patch: Vec<PatchDirective>,

    /// Upstream build invocation (optional; prebuilt artifacts skip it)
    #[serde(default)]
    pub build: Option<BuildSection>,

    /// Enumerated paths staged into the output directory
    pub stage: Vec<StageEntry>,

    /// Descriptive metadata and test references
    #[serde(default)]
    pub metadata: MetadataSection,

    /// Variables for `%(name)s`-style substitution
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl Descriptor {
    /// Substitute `%(key)s` patterns from built-in and custom variables
    ///
    /// Built-ins: `%(name)s`, `%(version)s`.
    pub fn substitute(&self, template: &str) -> String {
        let mut result = template.to_string();

        result = result.replace("%(name)s", &self.package.name);
        result = result.replace("%(version)s", &self.package.version);

        for (key, value) in &self.variables {
            result = result.replace(&format!("%({})s", key), value);
        }

        result
    }
}

/// Package identity section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageSection {
    pub name: String,
    pub version: String,
}

/// Where an artifact comes from
///
/// Exactly one of `url`, `path`, or `github` appears in the TOML table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceLocator {
    /// Direct download URL
    Url { url: String },
    /// GitHub repository tag, resolved to the codeload tarball
    Github { github: GithubRef },
    /// Local file, copied through the same verification gate
    Path { path: PathBuf },
}

/// A GitHub `owner/repo` at a tag
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubRef {
    pub owner: String,
    pub repo: String,
    pub tag: String,
}

/// Primary source section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    #[serde(flatten)]
    pub locator: SourceLocator,

    /// Expected content hash, prefixed form (`sha256:...`)
    pub checksum: String,

    /// Additional artifacts unpacked next to the main source
    ///
    /// Used when a staged file is pulled from a sibling archive, e.g. a
    /// configuration file shipped inside another package's `.deb`.
    #[serde(default)]
    pub extra: Vec<ExtraSource>,
}

/// An additional source artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraSource {
    #[serde(flatten)]
    pub locator: SourceLocator,

    /// Expected content hash, prefixed form
    pub checksum: String,

    /// Subdirectory of the working tree to unpack into
    pub unpack_to: String,
}

/// One literal find/replace edit
///
/// The search text must occur exactly once in the target file; anything else
/// means the recipe has drifted from upstream and the pipeline fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchDirective {
    /// File to edit, relative to the working tree
    pub file: String,
    /// Literal text to find (exactly once)
    pub find: String,
    /// Literal replacement
    pub replace: String,
}

/// Upstream build invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildSection {
    /// Build command, run via `sh -c` inside the working tree
    pub command: String,

    /// Environment variables set for the build
    #[serde(default)]
    pub environment: HashMap<String, String>,

    /// Working directory within the source tree (relative)
    #[serde(default)]
    pub workdir: Option<String>,
}

/// One staged path: either kept in place or relocated
///
/// TOML accepts both the bare-string and the table form:
/// `stage = ["config.js", { path = "css/main.css", to = "css/all.css" }]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageEntry {
    /// Stage under the same relative path
    Keep(String),
    /// Stage `path` at a different relative destination
    Relocate { path: String, to: String },
}

impl StageEntry {
    /// Path in the working tree
    pub fn source(&self) -> &str {
        match self {
            StageEntry::Keep(path) => path,
            StageEntry::Relocate { path, .. } => path,
        }
    }

    /// Path in the output directory
    pub fn dest(&self) -> &str {
        match self {
            StageEntry::Keep(path) => path.trim_end_matches('/'),
            StageEntry::Relocate { to, .. } => to,
        }
    }
}

/// Descriptive metadata attached to the built package
///
/// Has no effect on the produced artifact tree.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetadataSection {
    #[serde(default)]
    pub description: Option<String>,

    /// License identifier (SPDX)
    #[serde(default)]
    pub license: Option<String>,

    #[serde(default)]
    pub maintainers: Vec<String>,

    /// Platforms the package is intended for (informational)
    #[serde(default)]
    pub platforms: Vec<String>,

    /// Integration-test identifiers, optionally gated on host platform
    #[serde(default)]
    pub tests: Vec<TestRef>,
}

/// A linked integration test
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRef {
    /// External test identifier
    pub name: String,

    /// Platforms on which this test is attached; empty means all
    #[serde(default)]
    pub platforms: Vec<String>,
}
