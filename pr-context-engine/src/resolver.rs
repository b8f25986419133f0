//! Review-comment line resolution.
//!
//! The hosting platform only accepts inline comments on right-side lines
//! that are part of the diff (added or context lines inside a hunk); any
//! other line number is rejected with HTTP 422. These helpers find or
//! validate such lines. Fallback policy belongs to the caller
//! (see `publish::plan_comments`).

use serde::{Deserialize, Serialize};

use crate::git_providers::types::{DiffFile, DiffLine, ParsedDiff};
use crate::parser::parse_unified_diff;

/// A diff-addressable comment location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentTarget {
    /// New path of the file.
    pub path: String,
    /// New-file line number.
    pub line: u32,
}

/// Outcome of validating a proposed comment line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineResolution {
    pub valid: bool,
    pub normalized_line: Option<u32>,
}

impl LineResolution {
    fn valid(line: u32) -> Self {
        Self {
            valid: true,
            normalized_line: Some(line),
        }
    }

    fn invalid() -> Self {
        Self {
            valid: false,
            normalized_line: None,
        }
    }
}

/// First added line of the whole diff, in file → hunk → line order.
///
/// Returns `None` when the diff adds nothing (e.g. pure deletions).
pub fn first_added_line(raw_diff: &str) -> Option<CommentTarget> {
    first_added_line_in(&parse_unified_diff(raw_diff))
}

/// Same as [`first_added_line`] over an already parsed diff.
pub fn first_added_line_in(diff: &ParsedDiff) -> Option<CommentTarget> {
    diff.files().iter().find_map(|file| {
        first_addition(file).map(|line| CommentTarget {
            path: file.new_path.clone(),
            line,
        })
    })
}

/// New-file line number of the first addition in `file`.
pub fn first_addition(file: &DiffFile) -> Option<u32> {
    file.lines()
        .filter(|l| l.is_addition())
        .find_map(DiffLine::new_line)
}

/// First right-side (added or context) line of the file's first hunk that
/// has one.
pub fn first_right_side_line(file: &DiffFile) -> Option<u32> {
    file.lines().find_map(DiffLine::new_line)
}

/// Checks whether `candidate` is an added or context line of `file`.
///
/// A valid candidate is returned unchanged; nothing is guessed otherwise.
pub fn resolve_comment_line(file: &DiffFile, candidate: u32) -> LineResolution {
    let addressable = file
        .hunks
        .iter()
        .filter(|h| h.covers_new_line(candidate))
        .flat_map(|h| h.lines.iter())
        .any(|l| l.new_line() == Some(candidate));

    if addressable {
        LineResolution::valid(candidate)
    } else {
        LineResolution::invalid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_patch_fragment;

    #[test]
    fn first_addition_skips_deletion_only_files() {
        let diff = "\
diff --git a/first.txt b/first.txt
--- a/first.txt
+++ b/first.txt
@@ -1,2 +1,0 @@
-a
-b
diff --git a/second.txt b/second.txt
--- a/second.txt
+++ b/second.txt
@@ -3,2 +3,3 @@
 c
 d
+e
";
        assert_eq!(
            first_added_line(diff),
            Some(CommentTarget {
                path: "second.txt".into(),
                line: 5
            })
        );
    }

    #[test]
    fn pure_deletion_has_no_first_addition() {
        let diff = "\
diff --git a/only.txt b/only.txt
deleted file mode 100644
--- a/only.txt
+++ /dev/null
@@ -1,2 +0,0 @@
-x
-y
";
        assert_eq!(first_added_line(diff), None);
        assert_eq!(first_added_line(""), None);
    }

    #[test]
    fn comment_line_must_be_on_the_right_side() {
        let file = parse_patch_fragment(
            "src/app.js",
            "@@ -10,3 +20,4 @@\n a\n-b\n+c\n+d\n e\n",
        );

        assert_eq!(
            resolve_comment_line(&file, 20),
            LineResolution {
                valid: true,
                normalized_line: Some(20)
            }
        );
        assert!(resolve_comment_line(&file, 23).valid);
        assert!(!resolve_comment_line(&file, 19).valid);
        assert_eq!(
            resolve_comment_line(&file, 999),
            LineResolution {
                valid: false,
                normalized_line: None
            }
        );
    }

    #[test]
    fn removed_line_numbers_are_not_addressable() {
        // Old line 30 is deleted; new side jumps from 40 to 41.
        let file = parse_patch_fragment("f", "@@ -29,2 +40,1 @@\n ctx\n-gone\n");
        assert!(resolve_comment_line(&file, 40).valid);
        assert!(!resolve_comment_line(&file, 41).valid);
        assert!(!resolve_comment_line(&file, 30).valid);
    }

    #[test]
    fn right_side_fallbacks() {
        let file = parse_patch_fragment("f", "@@ -1,2 +1,2 @@\n keep\n-x\n+y\n");
        assert_eq!(first_right_side_line(&file), Some(1));
        assert_eq!(first_addition(&file), Some(2));
    }
}
