//! Unified-diff parser.
//!
//! Turns the raw text of a pull request diff into addressable files, hunks
//! and lines. Line numbers come from running counters seeded at the hunk
//! header's declared starts: the first added/context line of
//! `@@ -10,3 +20,4 @@` is new line 20.
//!
//! The parser is tolerant. Malformed hunk headers are skipped (the hunk is
//! absent from the output), text before the first `diff --git` boundary is
//! ignored, and non-diff input yields an empty result. It never fails.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::errors::DiffParseError;
use crate::git_providers::types::{DiffFile, DiffHunk, DiffLine, FileStatus, ParsedDiff};

fn file_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^diff --git a/(.+) b/(.+)$").expect("valid boundary regex"))
}

fn hunk_header_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@(.*)$")
            .expect("valid hunk header regex")
    })
}

fn index_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^index ([0-9a-fA-F]+)\.\.([0-9a-fA-F]+)(?: [0-7]+)?$")
            .expect("valid index regex")
    })
}

/// Parses a complete unified diff (as produced by `git diff` or the hosting
/// platform's diff media type) into per-file records keyed by new path.
///
/// Parsing the same text twice yields equal results.
pub fn parse_unified_diff(raw: &str) -> ParsedDiff {
    let mut parser = DiffParser::default();
    for line in raw.lines() {
        parser.feed(line);
    }
    let parsed = parser.finish();
    debug!(files = parsed.len(), "unified diff parsed");
    parsed
}

/// Parses a file-scoped patch fragment (hunks only, no `diff --git` line),
/// as returned in the provider's changed-files listing.
pub fn parse_patch_fragment(path: &str, patch: &str) -> DiffFile {
    let mut parser = DiffParser::default();
    parser.open_file(path, path);
    for line in patch.lines() {
        parser.feed(line);
    }
    parser
        .finish()
        .into_files()
        .into_iter()
        .next()
        .unwrap_or_else(|| DiffFile::new(path, path))
}

/// Old and new paths of a `diff --git` line, prefixes stripped.
///
/// Handles both the plain form and git's C-quoted form, used for names with
/// non-ASCII bytes, tabs, quotes or backslashes:
/// `diff --git "a/caf\303\251.txt" "b/caf\303\251.txt"`.
fn parse_file_boundary(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("diff --git ")?;

    if !rest.contains('"') {
        let caps = file_boundary_re().captures(line)?;
        return Some((caps[1].to_string(), caps[2].to_string()));
    }

    let (old, tail) = if rest.starts_with('"') {
        let (old, tail) = unquote_c_path(rest)?;
        (old, tail.strip_prefix(' ')?.to_string())
    } else {
        // Only the new name is quoted: `a/plain "b/caf\303\251"`.
        let split = rest.find(" \"b/")?;
        (rest[..split].to_string(), rest[split + 1..].to_string())
    };

    let new = if tail.starts_with('"') {
        let (new, trailing) = unquote_c_path(&tail)?;
        if !trailing.is_empty() {
            return None;
        }
        new
    } else {
        tail
    };

    Some((
        old.strip_prefix("a/")?.to_string(),
        new.strip_prefix("b/")?.to_string(),
    ))
}

/// Decodes one leading `"..."` token with git's C escapes (`\t`, `\"`,
/// `\\`, three-digit octal bytes). Returns the text and what follows the
/// closing quote.
fn unquote_c_path(s: &str) -> Option<(String, &str)> {
    let body = s.strip_prefix('"')?;
    let raw = body.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        match raw[i] {
            b'"' => {
                let text = String::from_utf8_lossy(&out).into_owned();
                return Some((text, &body[i + 1..]));
            }
            b'\\' => {
                let esc = *raw.get(i + 1)?;
                i += 2;
                let byte = match esc {
                    b'n' => b'\n',
                    b't' => b'\t',
                    b'r' => b'\r',
                    b'a' => 0x07,
                    b'b' => 0x08,
                    b'f' => 0x0c,
                    b'v' => 0x0b,
                    b'"' | b'\\' => esc,
                    b'0'..=b'7' => {
                        let digits = raw.get(i - 1..i + 2)?;
                        let text = std::str::from_utf8(digits).ok()?;
                        i += 2;
                        u8::from_str_radix(text, 8).ok()?
                    }
                    _ => return None,
                };
                out.push(byte);
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    None
}

/// Numbers taken from a well-formed `@@` header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HunkHeader {
    old_start: u32,
    old_lines: u32,
    new_start: u32,
    new_lines: u32,
    context: String,
}

/// Parses `@@ -a[,b] +c[,d] @@ ctx`; omitted counts default to 1.
fn parse_hunk_header(line: &str) -> Result<HunkHeader, DiffParseError> {
    let caps = hunk_header_re()
        .captures(line)
        .ok_or_else(|| DiffParseError::InvalidHunkHeader(line.to_string()))?;

    let num = |idx: usize| -> Result<u32, DiffParseError> {
        match caps.get(idx) {
            None => Ok(1),
            Some(m) => m
                .as_str()
                .parse::<u32>()
                .map_err(|_| DiffParseError::Overflow(line.to_string())),
        }
    };

    Ok(HunkHeader {
        old_start: num(1)?,
        old_lines: num(2)?,
        new_start: num(3)?,
        new_lines: num(4)?,
        context: caps
            .get(5)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
    })
}

/// Running position inside the current hunk.
///
/// `old_next`/`new_next` are the numbers the next line receives; the
/// `*_left` counters track how much of the declared range is unconsumed.
#[derive(Debug, Clone, Copy)]
struct HunkCursor {
    old_next: u32,
    new_next: u32,
    old_left: u32,
    new_left: u32,
}

impl HunkCursor {
    fn new(h: &HunkHeader) -> Self {
        Self {
            old_next: h.old_start,
            new_next: h.new_start,
            old_left: h.old_lines,
            new_left: h.new_lines,
        }
    }

    fn is_exhausted(&self) -> bool {
        self.old_left == 0 && self.new_left == 0
    }
}

#[derive(Debug, Default)]
struct DiffParser {
    files: Vec<DiffFile>,
    /// Index of the file receiving lines.
    current: Option<usize>,
    /// Between a boundary and its first `@@` (extended headers live here).
    in_header: bool,
    cursor: Option<HunkCursor>,
}

impl DiffParser {
    fn open_file(&mut self, old_path: &str, new_path: &str) {
        self.cursor = None;
        self.in_header = true;

        // Keep new paths unique: a repeated path continues the earlier entry.
        if let Some(idx) = self.files.iter().position(|f| f.new_path == new_path) {
            debug!(path = new_path, "repeated file in diff, appending hunks");
            self.current = Some(idx);
            return;
        }

        self.files.push(DiffFile::new(old_path, new_path));
        self.current = Some(self.files.len() - 1);
    }

    fn feed(&mut self, line: &str) {
        if line.starts_with("diff --git ") {
            match parse_file_boundary(line) {
                Some((old_path, new_path)) => self.open_file(&old_path, &new_path),
                None => {
                    // Unreadable boundary: its hunks must not land on the previous file.
                    debug!(line, "unrecognized file boundary, skipping file");
                    self.current = None;
                    self.cursor = None;
                    self.in_header = false;
                }
            }
            return;
        }

        let Some(idx) = self.current else {
            // Prelude before any boundary.
            return;
        };

        if line.starts_with("@@") {
            self.in_header = false;
            self.start_hunk(idx, line);
            return;
        }

        if line.starts_with('\\') {
            // "\ No newline at end of file" and friends: metadata only.
            return;
        }

        if let Some(cursor) = self.cursor.as_mut() {
            let hunk_lines = &mut self.files[idx].hunks;
            match push_hunk_line(cursor, hunk_lines, line) {
                LineOutcome::Consumed => {
                    if cursor.is_exhausted() {
                        self.cursor = None;
                    }
                }
                LineOutcome::Rejected => {
                    debug!(line, "line does not fit the open hunk, closing it");
                    self.cursor = None;
                }
            }
            return;
        }

        if self.in_header {
            apply_extended_header(&mut self.files[idx], line);
        }
    }

    fn start_hunk(&mut self, idx: usize, line: &str) {
        match parse_hunk_header(line) {
            Ok(h) => {
                let cursor = HunkCursor::new(&h);
                self.files[idx].hunks.push(DiffHunk {
                    old_start: h.old_start,
                    old_lines: h.old_lines,
                    new_start: h.new_start,
                    new_lines: h.new_lines,
                    header_context: h.context,
                    lines: Vec::new(),
                });
                self.cursor = (!cursor.is_exhausted()).then_some(cursor);
            }
            Err(err) => {
                debug!(error = %err, "skipping malformed hunk");
                self.cursor = None;
            }
        }
    }

    fn finish(self) -> ParsedDiff {
        ParsedDiff::from_files(self.files)
    }
}

enum LineOutcome {
    Consumed,
    Rejected,
}

/// Classifies one hunk body line and appends it to the last hunk.
///
/// A line is rejected when its marker is unknown or when it would overrun
/// the range declared by the header.
fn push_hunk_line(cursor: &mut HunkCursor, hunks: &mut [DiffHunk], line: &str) -> LineOutcome {
    let Some(hunk) = hunks.last_mut() else {
        return LineOutcome::Rejected;
    };

    let entry = if let Some(rest) = line.strip_prefix('+') {
        if cursor.new_left == 0 {
            return LineOutcome::Rejected;
        }
        let entry = DiffLine::Added {
            new_line: cursor.new_next,
            content: rest.to_string(),
        };
        cursor.new_next = cursor.new_next.saturating_add(1);
        cursor.new_left -= 1;
        entry
    } else if let Some(rest) = line.strip_prefix('-') {
        if cursor.old_left == 0 {
            return LineOutcome::Rejected;
        }
        let entry = DiffLine::Removed {
            old_line: cursor.old_next,
            content: rest.to_string(),
        };
        cursor.old_next = cursor.old_next.saturating_add(1);
        cursor.old_left -= 1;
        entry
    } else if line.is_empty() || line.starts_with(' ') {
        if cursor.old_left == 0 || cursor.new_left == 0 {
            return LineOutcome::Rejected;
        }
        let entry = DiffLine::Context {
            old_line: cursor.old_next,
            new_line: cursor.new_next,
            content: line.get(1..).unwrap_or_default().to_string(),
        };
        cursor.old_next = cursor.old_next.saturating_add(1);
        cursor.new_next = cursor.new_next.saturating_add(1);
        cursor.old_left -= 1;
        cursor.new_left -= 1;
        entry
    } else {
        return LineOutcome::Rejected;
    };

    hunk.lines.push(entry);
    LineOutcome::Consumed
}

/// Applies a git extended header line (between the boundary and the first
/// hunk) to the file record. Unknown lines are ignored.
fn apply_extended_header(file: &mut DiffFile, line: &str) {
    if let Some(caps) = index_line_re().captures(line) {
        file.old_blob_hash = caps.get(1).map(|m| m.as_str().to_string());
        file.new_blob_hash = caps.get(2).map(|m| m.as_str().to_string());
    } else if line.starts_with("new file mode") || line == "--- /dev/null" {
        file.status = FileStatus::Added;
    } else if line.starts_with("deleted file mode") || line == "+++ /dev/null" {
        file.status = FileStatus::Removed;
    } else if let Some(from) = line.strip_prefix("rename from ") {
        file.old_path = from.to_string();
        file.status = FileStatus::Renamed;
    } else if line.starts_with("rename to ") {
        file.status = FileStatus::Renamed;
    } else if line.starts_with("GIT binary patch")
        || (line.starts_with("Binary files ") && line.ends_with(" differ"))
    {
        file.is_binary = true;
    }
    // `--- a/…`, `+++ b/…`, mode changes, similarity: nothing to record.
}
