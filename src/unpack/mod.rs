// src/unpack/mod.rs

//! Unpacker: turn a verified artifact into a working tree
//!
//! Two archive families are supported: the tarball family (`.tar` plus
//! gzip/xz/zstd/bzip2 compression) and Debian binary packages (an `ar`
//! container of compressed tarballs). Detection goes by file extension first
//! and falls back to magic bytes.

pub mod deb;
pub mod tarball;

pub use deb::DebControl;
pub use tarball::Compression;

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Recognized archive container kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Tar, optionally compressed
    Tarball(Compression),
    /// Debian binary package
    Deb,
}

/// Detect the archive kind of a file
///
/// Unrecognized containers are a [`Error::Format`] failure: a descriptor
/// never names an artifact the pipeline cannot unpack.
pub fn detect(path: &Path) -> Result<ArchiveKind> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

    if name.ends_with(".deb") {
        return Ok(ArchiveKind::Deb);
    }
    if let Some(compression) = Compression::from_filename(name) {
        return Ok(ArchiveKind::Tarball(compression));
    }

    // Cache entries are named by hash, so extension detection usually fails
    // for them; fall back to magic bytes.
    let mut file = File::open(path)?;
    let mut magic = [0u8; 8];
    let n = file.read(&mut magic)?;
    let magic = &magic[..n];

    if magic.starts_with(b"!<arch>") {
        return Ok(ArchiveKind::Deb);
    }
    if let Some(compression) = Compression::from_magic(magic) {
        return Ok(ArchiveKind::Tarball(compression));
    }
    // Plain tar has its magic at offset 257; probe for "ustar"
    let mut header = [0u8; 262];
    let mut file = File::open(path)?;
    if file.read(&mut header)? == 262 && &header[257..262] == b"ustar" {
        return Ok(ArchiveKind::Tarball(Compression::None));
    }

    Err(Error::Format(format!(
        "unrecognized archive container: {}",
        path.display()
    )))
}

/// Unpack a verified artifact into `dest`
///
/// Returns Debian control metadata when the artifact was a `.deb`, for
/// diagnostics only.
pub fn unpack(archive: &Path, dest: &Path) -> Result<Option<DebControl>> {
    std::fs::create_dir_all(dest)?;

    match detect(archive)? {
        ArchiveKind::Tarball(compression) => {
            debug!(
                "Unpacking tarball ({:?}) {} -> {}",
                compression,
                archive.display(),
                dest.display()
            );
            tarball::extract(archive, compression, dest)?;
            Ok(None)
        }
        ArchiveKind::Deb => {
            debug!("Unpacking deb {} -> {}", archive.display(), dest.display());
            let control = deb::extract(archive, dest)?;
            Ok(Some(control))
        }
    }
}
