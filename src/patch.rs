// src/patch.rs

//! Patcher: literal find/replace edits with strict matching
//!
//! Each directive's search text must occur exactly once in its target file.
//! Zero occurrences means upstream changed under the recipe; more than one
//! means the edit would be ambiguous. Both abort the pipeline so drift never
//! goes unnoticed.

use crate::error::{Error, Result};
use crate::recipe::PatchDirective;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Apply all patch directives in order against the working tree
pub fn apply_all(working_tree: &Path, directives: &[PatchDirective]) -> Result<()> {
    for directive in directives {
        apply_one(working_tree, directive)?;
    }
    Ok(())
}

/// Apply a single directive, enforcing the exactly-once rule
fn apply_one(working_tree: &Path, directive: &PatchDirective) -> Result<()> {
    let target = working_tree.join(&directive.file);

    if !target.exists() {
        // A vanished target file is the same staleness signal as absent text
        return Err(Error::PatchMismatch {
            file: directive.file.clone(),
            needle: directive.find.clone(),
            found: 0,
        });
    }

    let content = fs::read_to_string(&target)?;
    let found = content.matches(&directive.find).count();
    if found != 1 {
        return Err(Error::PatchMismatch {
            file: directive.file.clone(),
            needle: directive.find.clone(),
            found,
        });
    }

    let patched = content.replacen(&directive.find, &directive.replace, 1);
    fs::write(&target, patched)?;

    debug!("Patched {}", directive.file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directive(file: &str, find: &str, replace: &str) -> PatchDirective {
        PatchDirective {
            file: file.to_string(),
            find: find.to_string(),
            replace: replace.to_string(),
        }
    }

    #[test]
    fn test_single_match_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("run.sh"), "#!/usr/bin/env bash\nset -e\n").unwrap();

        apply_all(
            dir.path(),
            &[directive("run.sh", "/usr/bin/env bash", "/bin/sh")],
        )
        .unwrap();

        let content = std::fs::read_to_string(dir.path().join("run.sh")).unwrap();
        assert_eq!(content, "#!/bin/sh\nset -e\n");
    }

    #[test]
    fn test_absent_text_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();

        let err = apply_all(
            dir.path(),
            &[directive("index.html", "<base href=\"/\"/>", "<base/>")],
        )
        .unwrap_err();

        match err {
            Error::PatchMismatch { found, file, .. } => {
                assert_eq!(found, 0);
                assert_eq!(file, "index.html");
            }
            other => panic!("expected PatchMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_multiple_occurrences_fail() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x xx x").unwrap();

        let err = apply_all(dir.path(), &[directive("a.txt", "x", "y")]).unwrap_err();
        assert!(matches!(err, Error::PatchMismatch { found: 4, .. }));
    }

    #[test]
    fn test_missing_target_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = apply_all(dir.path(), &[directive("nope.txt", "a", "b")]).unwrap_err();
        assert!(matches!(err, Error::PatchMismatch { found: 0, .. }));
    }

    #[test]
    fn test_directives_apply_in_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f"), "one").unwrap();

        // The second directive only matches after the first rewrote the file
        apply_all(
            dir.path(),
            &[directive("f", "one", "two"), directive("f", "two", "three")],
        )
        .unwrap();

        assert_eq!(std::fs::read_to_string(dir.path().join("f")).unwrap(), "three");
    }

    #[test]
    fn test_failed_directive_leaves_earlier_edits() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f"), "alpha beta").unwrap();

        let result = apply_all(
            dir.path(),
            &[
                directive("f", "alpha", "ALPHA"),
                directive("f", "gamma", "GAMMA"),
            ],
        );

        assert!(result.is_err());
        // The working tree is ephemeral, so partial edits are fine; the
        // pipeline aborts before anything is staged.
        assert_eq!(
            std::fs::read_to_string(dir.path().join("f")).unwrap(),
            "ALPHA beta"
        );
    }
}
