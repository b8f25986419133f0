//! GitHub provider (REST v3) for PR metadata, diffs, contents and comments.
//!
//! Endpoints used:
//!   * GET  /repos/{owner}/{repo}/pulls/{number}            (json and diff media types)
//!   * GET  /repos/{owner}/{repo}/pulls/{number}/files
//!   * GET  /repos/{owner}/{repo}/contents/{path}?ref={ref}
//!   * POST /repos/{owner}/{repo}/pulls/{number}/comments

use std::future::Future;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analysis::ContentSource;
use crate::errors::{GitContextError, GitContextResult, ProviderError};
use crate::git_providers::ProviderConfig;
use crate::git_providers::types::*;
use crate::publish::{PublishConfig, PublishReport};
use crate::review::ReviewComment;

const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_DIFF: &str = "application/vnd.github.v3.diff";
const ACCEPT_RAW: &str = "application/vnd.github.v3.raw";

const FILES_PER_PAGE: usize = 100;
/// The files endpoint stops at 3000 entries.
const MAX_FILE_PAGES: u32 = 30;

/// GitHub HTTP client wrapper.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_api: String, // "https://api.github.com"
    token: String,
}

impl GitHubClient {
    /// Constructs a GitHub client with a shared HTTP instance and auth token.
    pub fn new(http: Client, base_api: String, token: String) -> Self {
        debug!("Creating GitHubClient with base_api={}", base_api);
        Self {
            http,
            base_api,
            token,
        }
    }

    /// Builds the HTTP client with a stable user agent so GitHub can
    /// identify the integration, and a per-request timeout.
    pub fn from_config(cfg: ProviderConfig) -> GitContextResult<Self> {
        let http = Client::builder()
            .user_agent(concat!("pr-review-bot/", env!("CARGO_PKG_VERSION")))
            .timeout(cfg.timeout)
            .build()?;
        Ok(Self::new(http, cfg.base_api, cfg.token))
    }

    fn get(&self, url: &str, accept: &str) -> RequestBuilder {
        self.http
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", accept)
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    fn pull_url(&self, owner: &str, repo: &str, number: u64) -> String {
        format!("{}/repos/{}/{}/pulls/{}", self.base_api, owner, repo, number)
    }

    /// Fetches PR metadata: title, author, refs and SHAs.
    pub async fn get_pr_info(&self, id: &ChangeRequestId) -> GitContextResult<PrInfo> {
        let (owner, repo) = split_owner_repo(&id.project)?;
        let url = self.pull_url(&owner, &repo, id.iid);
        debug!("GitHub get_pr_info: {}", url);

        let resp = check_status(self.get(&url, ACCEPT_JSON).send().await?)?;
        let pr: GitHubPr = resp.json().await?;
        Ok(pr.into_pr_info(&id.project))
    }

    /// Fetches the whole PR as one unified diff.
    pub async fn get_raw_diff(&self, id: &ChangeRequestId) -> GitContextResult<String> {
        let (owner, repo) = split_owner_repo(&id.project)?;
        let url = self.pull_url(&owner, &repo, id.iid);
        debug!("GitHub get_raw_diff: {}", url);

        let resp = check_status(self.get(&url, ACCEPT_DIFF).send().await?)?;
        Ok(resp.text().await?)
    }

    /// Lists every changed file, following pagination until a short page.
    pub async fn list_changed_files(
        &self,
        id: &ChangeRequestId,
    ) -> GitContextResult<Vec<ChangedFile>> {
        let (owner, repo) = split_owner_repo(&id.project)?;
        let url = format!("{}/files", self.pull_url(&owner, &repo, id.iid));

        let mut files = Vec::new();
        for page in 1..=MAX_FILE_PAGES {
            debug!("GitHub list_changed_files: url={}, page={}", url, page);
            let resp = check_status(
                self.get(&url, ACCEPT_JSON)
                    .query(&[("per_page", FILES_PER_PAGE as u32), ("page", page)])
                    .send()
                    .await?,
            )?;
            let batch: Vec<GitHubPrFile> = resp.json().await?;
            let short = batch.len() < FILES_PER_PAGE;
            files.extend(batch.into_iter().map(ChangedFile::from));
            if short {
                return Ok(files);
            }
        }

        warn!(
            project = %id.project,
            iid = id.iid,
            files = files.len(),
            "changed-files listing hit the page cap, list may be truncated"
        );
        Ok(files)
    }

    /// Fetches raw file bytes at a specific ref in the repository.
    ///
    /// Returns `Ok(Some(bytes))` on success, `Ok(None)` if the file does not
    /// exist at the given ref (404).
    pub async fn get_file_raw(
        &self,
        owner: &str,
        repo: &str,
        repo_relative_path: &str,
        git_ref: &str,
    ) -> GitContextResult<Option<Vec<u8>>> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.base_api,
            owner,
            repo,
            encode_content_path(repo_relative_path)
        );
        debug!("GitHub get_file_raw: url={}, ref={}", url, git_ref);

        let resp = self
            .get(&url, ACCEPT_RAW)
            .query(&[("ref", git_ref)])
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!("GitHub file not found at given ref");
            return Ok(None);
        }

        let bytes = check_status(resp)?.bytes().await?;
        Ok(Some(bytes.to_vec()))
    }

    /// Content source scoped to one repository, for analysis assembly.
    pub fn content_source(&self, id: &ChangeRequestId) -> GitContextResult<RepoContents<'_>> {
        let (owner, repo) = split_owner_repo(&id.project)?;
        Ok(RepoContents {
            client: self,
            owner,
            repo,
        })
    }

    /// Posts review comments one by one on the PR's head commit.
    ///
    /// Individual failures are logged and counted; only an invalid
    /// repository id fails the whole call.
    pub async fn post_review_comments(
        &self,
        pr: &PrInfo,
        comments: &[ReviewComment],
        cfg: &PublishConfig,
    ) -> GitContextResult<PublishReport> {
        let mut report = PublishReport::default();
        if comments.is_empty() {
            debug!("No comments to post for GitHub PR");
            return Ok(report);
        }

        let (owner, repo) = split_owner_repo(&pr.repository)?;
        let url = format!("{}/comments", self.pull_url(&owner, &repo, pr.number));
        debug!(
            "GitHub post_review_comments: url={}, count={}, dry_run={}",
            url,
            comments.len(),
            cfg.dry_run
        );

        for (i, comment) in comments.iter().enumerate() {
            if cfg.dry_run {
                info!(
                    path = %comment.path,
                    line = comment.line,
                    body = %comment.body,
                    "dry run, review comment not posted"
                );
                report.skipped += 1;
                continue;
            }

            if i > 0 && !cfg.post_delay.is_zero() {
                tokio::time::sleep(cfg.post_delay).await;
            }

            let payload = GitHubReviewCommentCreate {
                body: &comment.body,
                commit_id: &pr.head_sha,
                path: &comment.path,
                line: comment.line,
                side: "RIGHT",
            };

            let sent = self
                .http
                .post(&url)
                .bearer_auth(&self.token)
                .header("Accept", ACCEPT_JSON)
                .json(&payload)
                .send()
                .await;

            let resp = match sent {
                Ok(resp) => resp,
                Err(err) => {
                    warn!(path = %comment.path, line = comment.line, error = %err, "review comment request failed");
                    report.failed += 1;
                    continue;
                }
            };

            let status = resp.status();
            match status {
                s if s.is_success() => {
                    debug!(path = %comment.path, line = comment.line, "review comment posted");
                    report.posted += 1;
                }
                StatusCode::UNPROCESSABLE_ENTITY => {
                    warn!(path = %comment.path, line = comment.line, "review comment rejected: line not part of the diff");
                    report.failed += 1;
                }
                StatusCode::NOT_FOUND => {
                    warn!(path = %comment.path, line = comment.line, "review comment rejected: file or commit not found");
                    report.failed += 1;
                }
                other => {
                    warn!(path = %comment.path, line = comment.line, status = other.as_u16(), "review comment rejected");
                    report.failed += 1;
                }
            }

            if let Err(err) = resp.bytes().await {
                debug!(path = %comment.path, error = %err, "failed to drain comment response body");
            }
        }

        info!(
            repository = %pr.repository,
            pr = pr.number,
            posted = report.posted,
            failed = report.failed,
            skipped = report.skipped,
            "review comments published"
        );
        Ok(report)
    }
}

/// [`ContentSource`] over one repository's contents API.
#[derive(Debug, Clone)]
pub struct RepoContents<'a> {
    client: &'a GitHubClient,
    owner: String,
    repo: String,
}

impl ContentSource for RepoContents<'_> {
    /// Binary blobs (not valid UTF-8) are reported as absent.
    fn fetch_content(
        &self,
        path: &str,
        revision: &str,
    ) -> impl Future<Output = GitContextResult<Option<String>>> + Send {
        async move {
            let bytes = self
                .client
                .get_file_raw(&self.owner, &self.repo, path, revision)
                .await?;
            Ok(bytes.and_then(|b| utf8_text(path, revision, b)))
        }
    }
}

/// File bytes as text; anything that is not UTF-8 counts as binary.
fn utf8_text(path: &str, revision: &str, bytes: Vec<u8>) -> Option<String> {
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(_) => {
            debug!(path, revision, "file is not UTF-8 text, treating as binary");
            None
        }
    }
}

/// Maps non-2xx responses to [`ProviderError`], keeping `Retry-After`.
fn check_status(resp: Response) -> GitContextResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let err = match ProviderError::from_status(status.as_u16()) {
        ProviderError::RateLimited { .. } => ProviderError::RateLimited {
            retry_after_secs: resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok()),
        },
        other => other,
    };
    warn!(url = %resp.url(), status = status.as_u16(), "GitHub request failed");
    Err(err.into())
}

/// Splits "owner/repo" into components or returns a validation error.
fn split_owner_repo(project: &str) -> GitContextResult<(String, String)> {
    let mut parts = project.split('/');
    let owner = parts.next().unwrap_or("").trim();
    let repo = parts.next().unwrap_or("").trim();

    if owner.is_empty() || repo.is_empty() || parts.next().is_some() {
        return Err(GitContextError::Validation(format!(
            "invalid GitHub project id '{}', expected 'owner/repo'",
            project
        )));
    }

    Ok((owner.to_string(), repo.to_string()))
}

/// Percent-encodes each path segment, keeping the separators.
fn encode_content_path(path: &str) -> String {
    path.split('/')
        .map(|seg| urlencoding::encode(seg).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// GitHub PR response (subset).
#[derive(Debug, Deserialize)]
struct GitHubPr {
    number: u64,
    title: String,
    html_url: Option<String>,
    user: Option<GitHubUser>,
    base: GitHubRef,
    head: GitHubRef,
}

impl GitHubPr {
    fn into_pr_info(self, fallback_repo: &str) -> PrInfo {
        let repository = self
            .base
            .repo
            .map(|r| r.full_name)
            .unwrap_or_else(|| fallback_repo.to_string());
        PrInfo {
            number: self.number,
            title: self.title,
            repository,
            author: self.user.map(|u| u.login),
            base_ref: self.base.r#ref,
            head_ref: self.head.r#ref,
            base_sha: self.base.sha,
            head_sha: self.head.sha,
            html_url: self.html_url,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GitHubRef {
    #[serde(rename = "ref")]
    r#ref: String,
    sha: String,
    #[serde(default)]
    repo: Option<GitHubRepo>,
}

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct GitHubPrFile {
    filename: String,
    status: String,
    #[serde(default)]
    additions: u32,
    #[serde(default)]
    deletions: u32,
    #[serde(default)]
    changes: u32,
    #[serde(default)]
    patch: Option<String>,
    #[serde(default)]
    previous_filename: Option<String>,
    #[serde(default)]
    blob_url: Option<String>,
    #[serde(default)]
    raw_url: Option<String>,
    #[serde(default)]
    sha: Option<String>,
}

impl From<GitHubPrFile> for ChangedFile {
    fn from(f: GitHubPrFile) -> Self {
        ChangedFile {
            status: FileStatus::from_provider(&f.status),
            filename: f.filename,
            additions: f.additions,
            deletions: f.deletions,
            changes: f.changes,
            patch: f.patch,
            previous_filename: f.previous_filename,
            blob_url: f.blob_url,
            raw_url: f.raw_url,
            sha: f.sha,
        }
    }
}

#[derive(Debug, Serialize)]
struct GitHubReviewCommentCreate<'a> {
    body: &'a str,
    commit_id: &'a str,
    path: &'a str,
    line: u32,
    side: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_utf8_content_is_treated_as_binary() {
        assert_eq!(
            utf8_text("a.rs", "h3ad", b"fn main() {}".to_vec()).as_deref(),
            Some("fn main() {}")
        );
        assert_eq!(utf8_text("logo.png", "h3ad", vec![0x89, b'P', 0xff, 0xfe]), None);
    }

    #[tokio::test]
    async fn dry_run_posts_nothing() {
        // Nothing listens on port 9, so a real POST would be counted as failed.
        let client = GitHubClient::new(
            Client::new(),
            "http://127.0.0.1:9".to_string(),
            "token".to_string(),
        );
        let pr = PrInfo {
            number: 5,
            title: "t".into(),
            repository: "octo/repo".into(),
            author: None,
            base_ref: "main".into(),
            head_ref: "feat".into(),
            base_sha: "b4se".into(),
            head_sha: "h3ad".into(),
            html_url: None,
        };
        let comments = vec![
            ReviewComment {
                path: "a.rs".into(),
                line: 1,
                body: "one".into(),
            },
            ReviewComment {
                path: "b.rs".into(),
                line: 2,
                body: "two".into(),
            },
        ];
        let cfg = PublishConfig {
            dry_run: true,
            ..PublishConfig::default()
        };

        let report = client.post_review_comments(&pr, &comments, &cfg).await.unwrap();
        assert_eq!(
            report,
            PublishReport {
                posted: 0,
                failed: 0,
                skipped: 2
            }
        );
    }

    #[test]
    fn owner_repo_must_have_two_parts() {
        assert_eq!(
            split_owner_repo("octo/repo").unwrap(),
            ("octo".to_string(), "repo".to_string())
        );
        assert!(split_owner_repo("octo").is_err());
        assert!(split_owner_repo("a/b/c").is_err());
        assert!(split_owner_repo("/repo").is_err());
    }

    #[test]
    fn content_paths_are_encoded_per_segment() {
        assert_eq!(encode_content_path("src/main.rs"), "src/main.rs");
        assert_eq!(
            encode_content_path("docs/my file#1.md"),
            "docs/my%20file%231.md"
        );
    }

    #[test]
    fn pr_payload_maps_to_pr_info() {
        let raw = r#"{
            "number": 42,
            "title": "Add parser",
            "html_url": "https://github.com/octo/repo/pull/42",
            "user": {"login": "octocat", "id": 1},
            "base": {"ref": "main", "sha": "b4se", "repo": {"full_name": "octo/repo"}},
            "head": {"ref": "feat", "sha": "h3ad", "repo": {"full_name": "fork/repo"}}
        }"#;
        let pr: GitHubPr = serde_json::from_str(raw).unwrap();
        let info = pr.into_pr_info("ignored/repo");
        assert_eq!(info.number, 42);
        assert_eq!(info.repository, "octo/repo");
        assert_eq!(info.author.as_deref(), Some("octocat"));
        assert_eq!((info.base_sha.as_str(), info.head_sha.as_str()), ("b4se", "h3ad"));
    }

    #[test]
    fn changed_file_payload_maps_status_and_rename() {
        let raw = r#"[
            {"filename": "new.rs", "status": "added", "additions": 3, "deletions": 0, "changes": 3, "patch": "@@ -0,0 +1,3 @@"},
            {"filename": "b.rs", "previous_filename": "a.rs", "status": "renamed"},
            {"filename": "img.png", "status": "modified"},
            {"filename": "c.rs", "status": "copied"}
        ]"#;
        let files: Vec<ChangedFile> = serde_json::from_str::<Vec<GitHubPrFile>>(raw)
            .unwrap()
            .into_iter()
            .map(ChangedFile::from)
            .collect();

        assert_eq!(files[0].status, FileStatus::Added);
        assert_eq!(files[0].additions, 3);
        assert_eq!(files[1].status, FileStatus::Renamed);
        assert_eq!(files[1].previous_filename.as_deref(), Some("a.rs"));
        assert!(files[2].patch.is_none());
        assert_eq!(files[3].status, FileStatus::Modified);
    }

    #[test]
    fn comment_payload_targets_right_side() {
        let payload = GitHubReviewCommentCreate {
            body: "b",
            commit_id: "sha",
            path: "p",
            line: 7,
            side: "RIGHT",
        };
        let v = serde_json::to_value(&payload).unwrap();
        assert_eq!(v["side"], "RIGHT");
        assert_eq!(v["line"], 7);
        assert_eq!(v["commit_id"], "sha");
    }
}
