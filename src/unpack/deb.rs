// src/unpack/deb.rs

//! Debian binary-package extraction
//!
//! A `.deb` is an `ar` container holding `debian-binary`, `control.tar.*`
//! and `data.tar.*`. The data member becomes the working tree; the control
//! member is parsed only so diagnostics can name what was unpacked.

use crate::error::{Error, Result};
use crate::unpack::tarball::{self, Compression};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Fields read from the `control` file, diagnostics only
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebControl {
    pub package: Option<String>,
    pub version: Option<String>,
    pub architecture: Option<String>,
    pub description: Option<String>,
}

impl DebControl {
    /// Parse RFC-822-style `Key: value` lines
    fn parse(content: &str) -> Self {
        let mut control = Self::default();

        for line in content.lines() {
            // Continuation lines belong to the previous field; only the
            // description's first line matters here
            if line.starts_with(' ') || line.starts_with('\t') {
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                let value = value.trim().to_string();
                match key {
                    "Package" => control.package = Some(value),
                    "Version" => control.version = Some(value),
                    "Architecture" => control.architecture = Some(value),
                    "Description" => control.description = Some(value),
                    _ => {}
                }
            }
        }

        control
    }
}

/// Extract a `.deb` into `dest`
///
/// The data tarball's tree lands directly under `dest` (a deb's payload uses
/// `./usr/...` style paths). Missing or malformed members are a
/// [`Error::Format`] failure.
pub fn extract(archive_path: &Path, dest: &Path) -> Result<DebControl> {
    let file = File::open(archive_path)?;
    let mut archive = ar::Archive::new(file);

    let mut control: Option<DebControl> = None;
    let mut data_extracted = false;
    let mut version_checked = false;

    while let Some(entry) = archive.next_entry() {
        let mut entry =
            entry.map_err(|e| Error::Format(format!("corrupt ar container: {e}")))?;
        let name = String::from_utf8_lossy(entry.header().identifier()).to_string();

        if name == "debian-binary" {
            let mut text = String::new();
            entry
                .read_to_string(&mut text)
                .map_err(|e| Error::Format(format!("unreadable debian-binary member: {e}")))?;
            if !text.trim_start().starts_with("2.0") {
                return Err(Error::Format(format!(
                    "unsupported deb format version: {}",
                    text.trim()
                )));
            }
            version_checked = true;
        } else if name.starts_with("control.tar") {
            control = Some(read_control_member(&name, &mut entry)?);
        } else if name.starts_with("data.tar") {
            let compression = member_compression(&name)?;
            let reader = compression.decode(&mut entry)?;
            tarball::extract_stream(reader, dest)?;
            data_extracted = true;
        }
        // _gpgorigin and other members are ignored
    }

    if !version_checked {
        return Err(Error::Format(
            "not a Debian package: debian-binary member missing".to_string(),
        ));
    }
    if !data_extracted {
        return Err(Error::Format(
            "not a Debian package: data.tar member missing".to_string(),
        ));
    }

    let control = control.unwrap_or_default();
    debug!(
        "Extracted deb {} {}",
        control.package.as_deref().unwrap_or("<unnamed>"),
        control.version.as_deref().unwrap_or("<unversioned>")
    );
    Ok(control)
}

/// Map an ar member name (`data.tar.xz`) to its compression
fn member_compression(name: &str) -> Result<Compression> {
    Compression::from_filename(name)
        .ok_or_else(|| Error::Format(format!("unsupported deb member compression: {name}")))
}

/// Pull the `control` file out of the control tarball
fn read_control_member<R: Read>(name: &str, reader: &mut R) -> Result<DebControl> {
    let compression = member_compression(name)?;
    let decoded = compression.decode(reader)?;
    let mut archive = tar::Archive::new(decoded);

    for entry in archive
        .entries()
        .map_err(|e| Error::Format(format!("corrupt control tarball: {e}")))?
    {
        let mut entry =
            entry.map_err(|e| Error::Format(format!("corrupt control entry: {e}")))?;
        let path = entry
            .path()
            .map_err(|e| Error::Format(format!("bad control entry path: {e}")))?;

        if path.file_name().and_then(|n| n.to_str()) == Some("control") {
            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .map_err(|e| Error::Format(format!("unreadable control file: {e}")))?;
            return Ok(DebControl::parse(&content));
        }
    }

    // Control file absent: tolerated, the payload is what matters
    Ok(DebControl::default())
}
