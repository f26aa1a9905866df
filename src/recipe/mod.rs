// src/recipe/mod.rs

//! Package descriptors: the declarative recipe format
//!
//! A descriptor is a pure description of one buildable unit; the pipeline in
//! [`crate::pipeline`] turns it into a staged output directory.

pub mod format;
pub mod parser;

pub use format::{
    BuildSection, Descriptor, ExtraSource, GithubRef, MetadataSection, PackageSection,
    PatchDirective, SourceLocator, SourceSection, StageEntry, TestRef,
};
pub use parser::{load_descriptor, parse_descriptor};
