// src/unpack/tarball.rs

//! Tarball extraction through library decoders
//!
//! No external `tar` binary: the archive is streamed through the matching
//! decompressor into `tar::Archive`. Entries that would escape the
//! destination (absolute paths, `..`) mark the container as corrupt.

use crate::error::{Error, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::Read;
use std::path::{Component, Path};
use tar::Archive;
use xz2::read::XzDecoder;

/// Compression wrapped around a tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Xz,
    Zstd,
    Bzip2,
}

impl Compression {
    /// Detect compression from a tarball filename
    pub fn from_filename(name: &str) -> Option<Self> {
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::Gzip)
        } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
            Some(Self::Xz)
        } else if name.ends_with(".tar.zst") {
            Some(Self::Zstd)
        } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
            Some(Self::Bzip2)
        } else if name.ends_with(".tar") {
            Some(Self::None)
        } else {
            None
        }
    }

    /// Detect compression from leading magic bytes
    pub fn from_magic(magic: &[u8]) -> Option<Self> {
        if magic.starts_with(&[0x1f, 0x8b]) {
            Some(Self::Gzip)
        } else if magic.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
            Some(Self::Xz)
        } else if magic.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
            Some(Self::Zstd)
        } else if magic.starts_with(b"BZh") {
            Some(Self::Bzip2)
        } else {
            None
        }
    }

    /// Wrap a raw reader in the matching decompressor
    pub fn decode<'a, R: Read + 'a>(&self, reader: R) -> Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Self::None => Box::new(reader),
            Self::Gzip => Box::new(GzDecoder::new(reader)),
            Self::Xz => Box::new(XzDecoder::new(reader)),
            Self::Zstd => Box::new(
                zstd::Decoder::new(reader)
                    .map_err(|e| Error::Format(format!("zstd stream error: {e}")))?,
            ),
            Self::Bzip2 => Box::new(BzDecoder::new(reader)),
        })
    }
}

/// Extract a tarball into `dest`
pub fn extract(archive_path: &Path, compression: Compression, dest: &Path) -> Result<()> {
    let file = File::open(archive_path)?;
    let reader = compression.decode(file)?;
    extract_stream(reader, dest)
}

/// Extract a tar stream (already decompressed) into `dest`
pub fn extract_stream<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = Archive::new(reader);
    archive.set_preserve_permissions(true);

    for entry in archive
        .entries()
        .map_err(|e| Error::Format(format!("corrupt tar stream: {e}")))?
    {
        let mut entry = entry.map_err(|e| Error::Format(format!("corrupt tar entry: {e}")))?;

        let path = entry
            .path()
            .map_err(|e| Error::Format(format!("bad entry path: {e}")))?
            .into_owned();
        ensure_contained(&path)?;

        entry
            .unpack_in(dest)
            .map_err(|e| Error::Format(format!("failed to unpack {}: {e}", path.display())))?;
    }

    Ok(())
}

/// Reject entry paths that would land outside the destination
fn ensure_contained(path: &Path) -> Result<()> {
    if path.is_absolute() {
        return Err(Error::Format(format!(
            "archive entry has absolute path: {}",
            path.display()
        )));
    }
    for component in path.components() {
        if matches!(component, Component::ParentDir) {
            return Err(Error::Format(format!(
                "archive entry escapes destination: {}",
                path.display()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression as GzLevel;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn make_tar(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());

        for (path, content) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, path, *content).unwrap();
        }

        builder.into_inner().unwrap()
    }

    fn make_targz(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
        encoder.write_all(&make_tar(files)).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_extract_gzip_tarball() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("src.tar.gz");
        std::fs::write(
            &archive,
            make_targz(&[("app/config.js", b"var x = 1;"), ("app/static/a.js", b"a")]),
        )
        .unwrap();

        let dest = dir.path().join("tree");
        extract(&archive, Compression::Gzip, &dest).unwrap();

        assert_eq!(
            std::fs::read(dest.join("app/config.js")).unwrap(),
            b"var x = 1;"
        );
        assert!(dest.join("app/static/a.js").exists());
    }

    #[test]
    fn test_extract_xz_tarball() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("src.tar.xz");

        let mut encoder = xz2::write::XzEncoder::new(Vec::new(), 6);
        encoder
            .write_all(&make_tar(&[("app/a.txt", b"xz payload")]))
            .unwrap();
        std::fs::write(&archive, encoder.finish().unwrap()).unwrap();

        let dest = dir.path().join("tree");
        extract(&archive, Compression::Xz, &dest).unwrap();
        assert_eq!(std::fs::read(dest.join("app/a.txt")).unwrap(), b"xz payload");
    }

    #[test]
    fn test_extract_zstd_tarball() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("src.tar.zst");

        let tar = make_tar(&[("app/b.txt", b"zstd payload")]);
        std::fs::write(&archive, zstd::encode_all(&tar[..], 0).unwrap()).unwrap();

        let dest = dir.path().join("tree");
        extract(&archive, Compression::Zstd, &dest).unwrap();
        assert_eq!(
            std::fs::read(dest.join("app/b.txt")).unwrap(),
            b"zstd payload"
        );
    }

    #[test]
    fn test_extract_bzip2_tarball() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("src.tar.bz2");

        let mut encoder =
            bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        encoder
            .write_all(&make_tar(&[("app/c.txt", b"bzip2 payload")]))
            .unwrap();
        std::fs::write(&archive, encoder.finish().unwrap()).unwrap();

        let dest = dir.path().join("tree");
        extract(&archive, Compression::Bzip2, &dest).unwrap();
        assert_eq!(
            std::fs::read(dest.join("app/c.txt")).unwrap(),
            b"bzip2 payload"
        );
    }

    #[test]
    fn test_escaping_entry_rejected() {
        assert!(ensure_contained(Path::new("ok/file.txt")).is_ok());
        assert!(matches!(
            ensure_contained(Path::new("../evil")).unwrap_err(),
            Error::Format(_)
        ));
        assert!(matches!(
            ensure_contained(Path::new("/etc/passwd")).unwrap_err(),
            Error::Format(_)
        ));
    }

    #[test]
    fn test_corrupt_stream_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("tree");
        std::fs::create_dir_all(&dest).unwrap();

        // Valid gzip wrapping that is not a tar stream
        let mut encoder = GzEncoder::new(Vec::new(), GzLevel::default());
        encoder.write_all(b"this is not a tar archive").unwrap();
        let bytes = encoder.finish().unwrap();

        let err = extract_stream(std::io::Cursor::new(bytes), &dest);
        // Short garbage may decode as an empty archive; anything else must be
        // reported as a format problem.
        if let Err(e) = err {
            assert!(matches!(e, Error::Format(_)));
        }
    }

    #[test]
    fn test_filename_detection() {
        assert_eq!(Compression::from_filename("a.tar.gz"), Some(Compression::Gzip));
        assert_eq!(Compression::from_filename("a.tgz"), Some(Compression::Gzip));
        assert_eq!(Compression::from_filename("a.tar.xz"), Some(Compression::Xz));
        assert_eq!(Compression::from_filename("a.tar.zst"), Some(Compression::Zstd));
        assert_eq!(Compression::from_filename("a.tar.bz2"), Some(Compression::Bzip2));
        assert_eq!(Compression::from_filename("a.tar"), Some(Compression::None));
        assert_eq!(Compression::from_filename("a.zip"), None);
    }
}
