//! Pull-request analysis assembly.
//!
//! Combines the provider's changed-files listing, per-file content at the
//! base/head revisions and the parsed unified diff into one [`PrAnalysis`].
//!
//! Fetch failures are isolated per file: a failed or missing revision leaves
//! the corresponding content field empty and processing moves on. Files are
//! handled one at a time to keep load on the provider API bounded; only the
//! two revisions of a modified file are fetched concurrently.

use std::future::Future;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::errors::GitContextResult;
use crate::git_providers::types::{
    AddedFile, AnalysisSummary, ChangedFile, DiffBundle, FileMetadata, FileStatus, FilesByStatus,
    ModifiedFile, PrAnalysis, PrInfo, RemovedFile,
};
use crate::parser::parse_unified_diff;

/// Source of file text at a given revision.
///
/// `Ok(None)` means the path does not exist at that revision (or is not
/// text); `Err` is any other failure. Both end up as an absent field.
pub trait ContentSource {
    fn fetch_content(
        &self,
        path: &str,
        revision: &str,
    ) -> impl Future<Output = GitContextResult<Option<String>>> + Send;
}

/// Builds the analysis record for one pull request.
///
/// `summary.total_files` always equals `changed_files.len()`; the parsed
/// diff is produced from `raw_diff` regardless of fetch outcomes.
pub async fn assemble<S>(
    pr_info: PrInfo,
    changed_files: &[ChangedFile],
    source: &S,
    raw_diff: &str,
) -> PrAnalysis
where
    S: ContentSource + Sync,
{
    let t0 = Instant::now();
    let mut files = FilesByStatus::default();
    let mut summary = AnalysisSummary {
        total_files: changed_files.len(),
        ..AnalysisSummary::default()
    };

    for file in changed_files {
        let complete = match file.status {
            FileStatus::Added => {
                summary.added_files += 1;
                let content = fetch_or_absent(source, &file.filename, &pr_info.head_sha).await;
                let complete = content.is_some();
                files.added.insert(
                    file.filename.clone(),
                    AddedFile {
                        content_hash: content.as_deref().map(content_hash),
                        content,
                        metadata: metadata_for(file),
                    },
                );
                complete
            }
            FileStatus::Removed => {
                summary.removed_files += 1;
                let content = fetch_or_absent(source, &file.filename, &pr_info.base_sha).await;
                let complete = content.is_some();
                files.removed.insert(
                    file.filename.clone(),
                    RemovedFile {
                        content_hash: content.as_deref().map(content_hash),
                        content,
                        metadata: metadata_for(file),
                    },
                );
                complete
            }
            FileStatus::Modified | FileStatus::Renamed => {
                summary.modified_files += 1;
                let before_path = file.previous_filename.as_deref().unwrap_or(&file.filename);
                let (before, after) = tokio::join!(
                    fetch_or_absent(source, before_path, &pr_info.base_sha),
                    fetch_or_absent(source, &file.filename, &pr_info.head_sha),
                );
                let complete = before.is_some() && after.is_some();
                files.modified.insert(
                    file.filename.clone(),
                    ModifiedFile {
                        before_hash: before.as_deref().map(content_hash),
                        after_hash: after.as_deref().map(content_hash),
                        before_content: before,
                        after_content: after,
                        patch: file.patch.clone(),
                        metadata: metadata_for(file),
                    },
                );
                complete
            }
        };

        if !complete {
            summary.files_without_content += 1;
        }
    }

    let parsed = parse_unified_diff(raw_diff);

    info!(
        pr = pr_info.number,
        total = summary.total_files,
        added = summary.added_files,
        modified = summary.modified_files,
        removed = summary.removed_files,
        without_content = summary.files_without_content,
        parsed_files = parsed.len(),
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "pull request analysis assembled"
    );

    PrAnalysis {
        pr_info,
        summary,
        files,
        diffs: DiffBundle {
            unified: raw_diff.to_string(),
            parsed,
        },
    }
}

/// Fetches one revision, turning absence and errors into `None`.
async fn fetch_or_absent<S>(source: &S, path: &str, revision: &str) -> Option<String>
where
    S: ContentSource + Sync,
{
    match source.fetch_content(path, revision).await {
        Ok(Some(content)) => Some(content),
        Ok(None) => {
            debug!(path, revision, "content not available at revision");
            None
        }
        Err(err) => {
            warn!(path, revision, error = %err, "content fetch failed, continuing without it");
            None
        }
    }
}

fn metadata_for(file: &ChangedFile) -> FileMetadata {
    FileMetadata {
        additions: file.additions,
        deletions: file.deletions,
        changes: file.changes,
        blob_url: file.blob_url.clone(),
        raw_url: file.raw_url.clone(),
        blob_sha: file.sha.clone(),
        previous_path: file.previous_filename.clone(),
    }
}

/// Lowercase hex SHA-256 of a file's text.
fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::errors::{GitContextError, ProviderError};

    /// In-memory revisions; paths listed in `failing` always error.
    #[derive(Default)]
    struct MemorySource {
        blobs: HashMap<(String, String), String>,
        failing: Vec<String>,
    }

    impl MemorySource {
        fn with(mut self, path: &str, rev: &str, text: &str) -> Self {
            self.blobs
                .insert((path.to_string(), rev.to_string()), text.to_string());
            self
        }
    }

    impl ContentSource for MemorySource {
        fn fetch_content(
            &self,
            path: &str,
            revision: &str,
        ) -> impl Future<Output = GitContextResult<Option<String>>> + Send {
            let result = if self.failing.iter().any(|p| p == path) {
                Err(GitContextError::Provider(ProviderError::Server(502)))
            } else {
                Ok(self
                    .blobs
                    .get(&(path.to_string(), revision.to_string()))
                    .cloned())
            };
            async move { result }
        }
    }

    fn pr() -> PrInfo {
        PrInfo {
            number: 7,
            title: "Tidy".into(),
            repository: "octo/repo".into(),
            author: Some("octocat".into()),
            base_ref: "main".into(),
            head_ref: "feature".into(),
            base_sha: "base".into(),
            head_sha: "head".into(),
            html_url: None,
        }
    }

    fn changed(name: &str, status: FileStatus) -> ChangedFile {
        ChangedFile {
            filename: name.into(),
            status,
            additions: 1,
            deletions: 0,
            changes: 1,
            patch: Some("@@ -1 +1 @@\n-a\n+b".into()),
            previous_filename: None,
            blob_url: None,
            raw_url: None,
            sha: None,
        }
    }

    const RAW: &str = "\
diff --git a/a.rs b/a.rs
--- a/a.rs
+++ b/a.rs
@@ -1 +1 @@
-a
+b
";

    #[tokio::test]
    async fn one_failing_file_does_not_abort_the_rest() {
        let source = MemorySource {
            failing: vec!["broken.rs".into()],
            ..MemorySource::default()
        }
        .with("a.rs", "base", "a\n")
        .with("a.rs", "head", "b\n")
        .with("c.rs", "base", "c\n")
        .with("c.rs", "head", "cc\n");

        let files = vec![
            changed("a.rs", FileStatus::Modified),
            changed("broken.rs", FileStatus::Modified),
            changed("c.rs", FileStatus::Modified),
        ];

        let analysis = assemble(pr(), &files, &source, RAW).await;

        assert_eq!(analysis.summary.total_files, 3);
        assert_eq!(analysis.summary.modified_files, 3);
        assert_eq!(analysis.summary.files_without_content, 1);

        let broken = &analysis.files.modified["broken.rs"];
        assert!(broken.before_content.is_none());
        assert!(broken.after_content.is_none());
        assert!(broken.before_hash.is_none());

        for ok in ["a.rs", "c.rs"] {
            let rec = &analysis.files.modified[ok];
            assert!(rec.before_content.is_some() && rec.after_content.is_some());
            assert!(rec.after_hash.is_some());
        }
        assert_eq!(analysis.unified_diff(), RAW);
        assert_eq!(analysis.parsed_diff().len(), 1);
    }

    #[tokio::test]
    async fn statuses_pick_the_right_revision() {
        let source = MemorySource::default()
            .with("new.txt", "head", "fresh")
            .with("old.txt", "base", "stale")
            .with("before.txt", "base", "v1")
            .with("after.txt", "head", "v2");

        let mut renamed = changed("after.txt", FileStatus::Renamed);
        renamed.previous_filename = Some("before.txt".into());

        let files = vec![
            changed("new.txt", FileStatus::Added),
            changed("old.txt", FileStatus::Removed),
            renamed,
        ];

        let analysis = assemble(pr(), &files, &source, "").await;
        let s = analysis.summary;
        assert_eq!(
            (s.total_files, s.added_files, s.removed_files, s.modified_files),
            (3, 1, 1, 1)
        );
        assert_eq!(
            s.total_files,
            s.added_files + s.modified_files + s.removed_files
        );

        assert_eq!(
            analysis.files.added["new.txt"].content.as_deref(),
            Some("fresh")
        );
        assert_eq!(
            analysis.files.removed["old.txt"].content.as_deref(),
            Some("stale")
        );
        let moved = &analysis.files.modified["after.txt"];
        assert_eq!(moved.before_content.as_deref(), Some("v1"));
        assert_eq!(moved.after_content.as_deref(), Some("v2"));
        assert_eq!(moved.metadata.previous_path.as_deref(), Some("before.txt"));
        assert!(analysis.parsed_diff().is_empty());
    }

    #[tokio::test]
    async fn parsed_diff_survives_total_fetch_failure() {
        let source = MemorySource {
            failing: vec!["a.rs".into()],
            ..MemorySource::default()
        };
        let analysis = assemble(pr(), &[changed("a.rs", FileStatus::Added)], &source, RAW).await;
        assert!(analysis.files.added["a.rs"].content.is_none());
        assert!(analysis.parsed_diff().get("a.rs").is_some());
    }

    #[test]
    fn serialized_shape_matches_agent_contract() {
        let analysis = PrAnalysis {
            pr_info: pr(),
            summary: AnalysisSummary::default(),
            files: FilesByStatus::default(),
            diffs: DiffBundle {
                unified: RAW.into(),
                parsed: parse_unified_diff(RAW),
            },
        };
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["prInfo"]["headSha"], "head");
        assert_eq!(json["summary"]["totalFiles"], 0);
        assert!(json["files"]["added"].is_object());
        assert_eq!(json["diffs"]["unified"], RAW);
        let file = &json["diffs"]["parsed"]["a.rs"];
        assert_eq!(file["newPath"], "a.rs");
        assert_eq!(file["isBinary"], false);
        assert_eq!(file["hunks"][0]["newStart"], 1);
        assert_eq!(file["hunks"][0]["lines"][1]["kind"], "added");
        assert_eq!(file["hunks"][0]["lines"][1]["newLine"], 1);
        assert_eq!(file["hunks"][0]["lines"][0]["oldLine"], 1);
    }
}
