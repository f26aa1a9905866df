// src/lib.rs

//! Prefab Package Pipeline
//!
//! Declarative source-to-output build pipeline: fetch a pinned upstream
//! artifact, verify its content hash, unpack it, apply literal patch
//! directives, optionally run the upstream build command, and stage an
//! enumerated set of paths into an output directory.
//!
//! # Architecture
//!
//! - Descriptor-driven: one TOML descriptor fully determines one output
//! - Strictly linear: fetch, unpack, patch, build, stage; no retries
//! - Content-addressed: fetched artifacts are cached under their hash
//! - Atomic: the output directory appears whole or not at all

mod error;
pub mod fetch;
pub mod hash;
pub mod metadata;
pub mod patch;
pub mod pipeline;
pub mod recipe;
pub mod stage;
pub mod unpack;

pub use error::{Error, Result};
pub use hash::{ContentHash, HashAlgorithm, Hasher};
pub use metadata::MetadataRecord;
pub use pipeline::{Pipeline, PipelineConfig, RunReport};
pub use recipe::{
    load_descriptor, parse_descriptor, BuildSection, Descriptor, ExtraSource, GithubRef,
    MetadataSection, PackageSection, PatchDirective, SourceLocator, SourceSection, StageEntry,
    TestRef,
};
