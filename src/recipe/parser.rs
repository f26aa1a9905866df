// src/recipe/parser.rs

//! Descriptor loading and validation

use crate::error::{Error, Result};
use crate::hash::ContentHash;
use crate::recipe::format::Descriptor;
use std::path::{Component, Path};
use tracing::debug;

/// Load a descriptor from a TOML file and validate it
pub fn load_descriptor(path: &Path) -> Result<Descriptor> {
    debug!("Loading descriptor from {}", path.display());

    let content = std::fs::read_to_string(path)?;
    parse_descriptor(&content)
}

/// Parse and validate a descriptor from TOML text
pub fn parse_descriptor(content: &str) -> Result<Descriptor> {
    let descriptor: Descriptor = toml::from_str(content)
        .map_err(|e| Error::Parse(format!("invalid descriptor: {}", e)))?;

    validate(&descriptor)?;
    Ok(descriptor)
}

/// Validate descriptor invariants the type system cannot express
fn validate(descriptor: &Descriptor) -> Result<()> {
    if descriptor.package.name.is_empty() {
        return Err(Error::Parse("package name must not be empty".to_string()));
    }
    if descriptor.package.version.is_empty() {
        return Err(Error::Parse("package version must not be empty".to_string()));
    }
    if descriptor.stage.is_empty() {
        return Err(Error::Parse(
            "stage list must enumerate at least one path".to_string(),
        ));
    }

    // Checksums must parse up front, before any network traffic happens
    ContentHash::parse(&descriptor.source.checksum)?;
    for extra in &descriptor.source.extra {
        ContentHash::parse(&extra.checksum)?;
        ensure_relative(&extra.unpack_to, "unpack_to")?;
    }

    for entry in &descriptor.stage {
        ensure_relative(entry.source(), "stage path")?;
        ensure_relative(entry.dest(), "stage destination")?;
    }
    for directive in &descriptor.patch {
        ensure_relative(&directive.file, "patch file")?;
        if directive.find.is_empty() {
            return Err(Error::Parse(format!(
                "patch for {} has an empty search text",
                directive.file
            )));
        }
    }
    if let Some(build) = &descriptor.build {
        if build.command.trim().is_empty() {
            return Err(Error::Parse("build command must not be empty".to_string()));
        }
        if let Some(workdir) = &build.workdir {
            ensure_relative(workdir, "build workdir")?;
        }
    }

    Ok(())
}

/// Reject absolute paths and parent-directory escapes in descriptor paths
fn ensure_relative(path: &str, what: &str) -> Result<()> {
    let p = Path::new(path);
    if p.is_absolute() {
        return Err(Error::Parse(format!("{} must be relative: {}", what, path)));
    }
    for component in p.components() {
        if matches!(component, Component::ParentDir) {
            return Err(Error::Parse(format!(
                "{} must not contain '..': {}",
                what, path
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(stage: &str) -> String {
        format!(
            r#"
stage = [{stage}]

[package]
name = "demo"
version = "1.0"

[source]
url = "https://example.com/demo-1.0.tar.gz"
checksum = "sha256:0000000000000000000000000000000000000000000000000000000000000000"
"#
        )
    }

    #[test]
    fn test_load_valid_descriptor() {
        let desc = parse_descriptor(&minimal("\"config.js\"")).unwrap();
        assert_eq!(desc.package.name, "demo");
    }

    #[test]
    fn test_empty_stage_list_rejected() {
        let err = parse_descriptor(&minimal("")).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_absolute_stage_path_rejected() {
        let err = parse_descriptor(&minimal("\"/etc/passwd\"")).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_parent_escape_rejected() {
        let err = parse_descriptor(&minimal("\"../outside\"")).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let toml_src = r#"
stage = ["a"]

[package]
name = "demo"
version = "1.0"

[source]
url = "https://example.com/demo.tar.gz"
checksum = "sha256:tooshort"
"#;
        let err = parse_descriptor(toml_src).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_empty_patch_needle_rejected() {
        let toml_src = r#"
stage = ["a"]

[package]
name = "demo"
version = "1.0"

[source]
url = "https://example.com/demo.tar.gz"
checksum = "sha256:0000000000000000000000000000000000000000000000000000000000000000"

[[patch]]
file = "a"
find = ""
replace = "x"
"#;
        let err = parse_descriptor(toml_src).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
