// src/stage.rs

//! Installer: stage enumerated paths into the output directory
//!
//! Staging is strict and atomic. Every enumerated path must exist in the
//! working tree (a missing one means upstream changed shape and the recipe is
//! stale), and the output directory appears only after every copy succeeded:
//! files land in a scratch sibling that is promoted with a single rename, so
//! an aborted pipeline never leaves a partially-populated output.

use crate::error::{Error, Result};
use crate::recipe::StageEntry;
use std::fs;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Copy the enumerated paths from `working_tree` into `output_dir`
///
/// An existing `output_dir` is replaced (rebuild case); the replacement is
/// still all-or-nothing.
pub fn stage_all(working_tree: &Path, entries: &[StageEntry], output_dir: &Path) -> Result<()> {
    // Strict existence check before a single byte is copied
    for entry in entries {
        let source = working_tree.join(entry.source());
        if !source.exists() {
            return Err(Error::MissingPath(source));
        }
    }

    let parent = output_dir.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)?;

    // Scratch directory next to the output so the final rename stays on one
    // filesystem
    let scratch = tempfile::Builder::new()
        .prefix(".prefab-stage-")
        .tempdir_in(parent)?;

    for entry in entries {
        let source = working_tree.join(entry.source());
        let dest = scratch.path().join(entry.dest());
        copy_path(&source, &dest)?;
        debug!("Staged {} -> {}", entry.source(), entry.dest());
    }

    // Promote: one rename, after which the output is complete. Any previous
    // output is parked aside first and deleted only once the new tree is in
    // place, so a failed rename cannot destroy it.
    let scratch = scratch.into_path();
    let previous = if output_dir.exists() {
        let holding = tempfile::Builder::new()
            .prefix(".prefab-old-")
            .tempdir_in(parent)?;
        let parked = holding.path().join("previous");
        fs::rename(output_dir, &parked)?;
        Some((holding, parked))
    } else {
        None
    };

    if let Err(e) = fs::rename(&scratch, output_dir) {
        if let Some((_, parked)) = &previous {
            let _ = fs::rename(parked, output_dir);
        }
        let _ = fs::remove_dir_all(&scratch);
        return Err(e.into());
    }

    // Dropping the holding dir removes the parked previous output
    drop(previous);

    info!(
        "Staged {} path(s) into {}",
        entries.len(),
        output_dir.display()
    );
    Ok(())
}

/// Copy a file or directory tree, preserving structure and permissions
fn copy_path(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }

    if source.is_dir() {
        for item in WalkDir::new(source).sort_by_file_name() {
            let item = item.map_err(|e| {
                Error::Io(std::io::Error::other(format!(
                    "walk failed under {}: {e}",
                    source.display()
                )))
            })?;

            let relative = item
                .path()
                .strip_prefix(source)
                .expect("walkdir yields children of its root");
            let target = dest.join(relative);

            if item.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(item.path(), &target)?;
            }
        }
    } else {
        fs::copy(source, dest)?;
    }

    Ok(())
}
