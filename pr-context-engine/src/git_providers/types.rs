//! Provider-agnostic data model for pull requests and diffs.
//!
//! Everything here is created fresh per webhook event and dropped once the
//! analysis-and-comment cycle is over.

use std::collections::BTreeMap;

use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

/// A unique reference to a pull request.
///
/// * `project` – "owner/repo".
/// * `iid`     – pull request number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeRequestId {
    pub project: String,
    pub iid: u64,
}

/// Identifying metadata of a pull request, as handed to the review agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrInfo {
    pub number: u64,
    pub title: String,
    /// "owner/repo" of the base repository.
    pub repository: String,
    pub author: Option<String>,
    pub base_ref: String,
    pub head_ref: String,
    pub base_sha: String,
    pub head_sha: String,
    pub html_url: Option<String>,
}

/// Change status of a file within a pull request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Modified,
    Removed,
    Renamed,
}

impl FileStatus {
    /// Maps the provider's status string; unknown values (`copied`,
    /// `changed`, `unchanged`) are treated as modifications.
    pub fn from_provider(status: &str) -> Self {
        match status {
            "added" => FileStatus::Added,
            "removed" => FileStatus::Removed,
            "renamed" => FileStatus::Renamed,
            _ => FileStatus::Modified,
        }
    }
}

/// One entry of the provider's changed-files listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangedFile {
    pub filename: String,
    pub status: FileStatus,
    pub additions: u32,
    pub deletions: u32,
    pub changes: u32,
    /// File-scoped diff text; absent for binary or oversized files.
    pub patch: Option<String>,
    pub previous_filename: Option<String>,
    pub blob_url: Option<String>,
    pub raw_url: Option<String>,
    /// Blob SHA of the file at the head revision, as reported by the provider.
    pub sha: Option<String>,
}

/// One physical line inside a hunk.
///
/// Metadata lines (`\ No newline at end of file`) are never represented.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum DiffLine {
    Added {
        new_line: u32,
        content: String,
    },
    Removed {
        old_line: u32,
        content: String,
    },
    Context {
        old_line: u32,
        new_line: u32,
        content: String,
    },
}

impl DiffLine {
    /// Line number in the new file (right side), for added/context lines.
    pub fn new_line(&self) -> Option<u32> {
        match self {
            DiffLine::Added { new_line, .. } | DiffLine::Context { new_line, .. } => {
                Some(*new_line)
            }
            DiffLine::Removed { .. } => None,
        }
    }

    /// Line number in the old file (left side), for removed/context lines.
    pub fn old_line(&self) -> Option<u32> {
        match self {
            DiffLine::Removed { old_line, .. } | DiffLine::Context { old_line, .. } => {
                Some(*old_line)
            }
            DiffLine::Added { .. } => None,
        }
    }

    /// Line text without its leading marker.
    pub fn content(&self) -> &str {
        match self {
            DiffLine::Added { content, .. }
            | DiffLine::Removed { content, .. }
            | DiffLine::Context { content, .. } => content,
        }
    }

    pub fn is_addition(&self) -> bool {
        matches!(self, DiffLine::Added { .. })
    }
}

/// A diff hunk (continuous block of changes).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiffHunk {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
    /// Free text after the closing `@@`, often the enclosing function.
    pub header_context: String,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    /// True if `line` falls inside the hunk's declared new-file range.
    pub fn covers_new_line(&self, line: u32) -> bool {
        line >= self.new_start && (line - self.new_start) < self.new_lines
    }
}

/// One file's change record within a parsed diff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DiffFile {
    pub old_path: String,
    pub new_path: String,
    pub old_blob_hash: Option<String>,
    pub new_blob_hash: Option<String>,
    pub status: FileStatus,
    pub is_binary: bool,
    /// In order of appearance in the diff text.
    pub hunks: Vec<DiffHunk>,
}

impl DiffFile {
    /// An empty record for `old_path` → `new_path`.
    pub fn new(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        let old_path = old_path.into();
        let new_path = new_path.into();
        let status = if old_path == new_path {
            FileStatus::Modified
        } else {
            FileStatus::Renamed
        };
        Self {
            old_path,
            new_path,
            old_blob_hash: None,
            new_blob_hash: None,
            status,
            is_binary: false,
            hunks: Vec::new(),
        }
    }

    /// Iterates over every line of every hunk, in diff order.
    pub fn lines(&self) -> impl Iterator<Item = &DiffLine> {
        self.hunks.iter().flat_map(|h| h.lines.iter())
    }
}

/// Parsed form of a whole unified diff.
///
/// Keeps files in the order they appear in the raw text and serializes as a
/// JSON object keyed by new path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDiff {
    files: Vec<DiffFile>,
}

impl ParsedDiff {
    pub(crate) fn from_files(files: Vec<DiffFile>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[DiffFile] {
        &self.files
    }

    /// Looks a file up by its new path.
    pub fn get(&self, new_path: &str) -> Option<&DiffFile> {
        self.files.iter().find(|f| f.new_path == new_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn into_files(self) -> Vec<DiffFile> {
        self.files
    }
}

impl Serialize for ParsedDiff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.files.iter().map(|f| (f.new_path.as_str(), f)))
    }
}

/// Size/URL/hash facts about a file, alongside its content.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub additions: u32,
    pub deletions: u32,
    pub changes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_sha: Option<String>,
    /// Set for renamed files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_path: Option<String>,
}

/// Record for an added file: its full text at the head revision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddedFile {
    pub content: Option<String>,
    /// Hex SHA-256 of `content`.
    pub content_hash: Option<String>,
    pub metadata: FileMetadata,
}

/// Record for a removed file: its full text at the base revision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemovedFile {
    pub content: Option<String>,
    pub content_hash: Option<String>,
    pub metadata: FileMetadata,
}

/// Record for a modified (or renamed) file.
///
/// Either side may be absent: binary files, or a revision without the path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModifiedFile {
    pub before_content: Option<String>,
    pub after_content: Option<String>,
    /// File-scoped diff supplied by the provider.
    #[serde(rename = "diff")]
    pub patch: Option<String>,
    pub before_hash: Option<String>,
    pub after_hash: Option<String>,
    pub metadata: FileMetadata,
}

/// Per-status file records, keyed by path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilesByStatus {
    pub added: BTreeMap<String, AddedFile>,
    pub modified: BTreeMap<String, ModifiedFile>,
    pub removed: BTreeMap<String, RemovedFile>,
}

/// File counts by status. `total_files` is the sum of the three counts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub total_files: usize,
    pub added_files: usize,
    pub modified_files: usize,
    pub removed_files: usize,
    /// Files for which at least one expected revision could not be fetched.
    pub files_without_content: usize,
}

/// Raw and parsed form of the pull request diff.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct DiffBundle {
    /// The raw input text, verbatim.
    pub unified: String,
    pub parsed: ParsedDiff,
}

/// Aggregate handed to the review agent and to comment planning.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrAnalysis {
    pub pr_info: PrInfo,
    pub summary: AnalysisSummary,
    pub files: FilesByStatus,
    pub diffs: DiffBundle,
}

impl PrAnalysis {
    pub fn unified_diff(&self) -> &str {
        &self.diffs.unified
    }

    pub fn parsed_diff(&self) -> &ParsedDiff {
        &self.diffs.parsed
    }
}
