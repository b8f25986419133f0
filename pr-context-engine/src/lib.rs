//! Pull-request context for the review bot: unified-diff parsing, comment
//! line resolution, analysis assembly and the GitHub round trip.

pub mod analysis;
pub mod config;
pub mod errors;
pub mod git_providers;
pub mod parser;
pub mod publish;
pub mod resolver;
pub mod review;

use serde::Serialize;
use tracing::{debug, info, warn};

pub use crate::config::ReviewConfig;
pub use crate::errors::{GitContextError, GitContextResult};
pub use crate::review::{ReviewAgent, ReviewComment, ReviewOutcome};

use crate::git_providers::github::GitHubClient;
use crate::git_providers::types::{ChangeRequestId, PrAnalysis};
use crate::publish::{PublishReport, plan_comments};

/// Summary of one review cycle, returned to the manual trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewReport {
    pub repository: String,
    pub pr_number: u64,
    pub files_analyzed: usize,
    /// Comments the agent returned.
    pub comments_proposed: usize,
    pub comments_relocated: usize,
    pub comments_dropped: usize,
    pub publish: PublishReport,
    /// Set when the agent failed; no comments are posted then.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_error: Option<String>,
}

/// Runs the full review pipeline for a single pull request.
///
/// Steps:
///   * fetch PR info, the changed-files listing and the raw diff
///   * assemble the analysis (per-file fetch failures are tolerated)
///   * ask the review agent for comments
///   * validate comment lines against the diff and publish them
///
/// Provider failures on the first three fetches abort the run; everything
/// after that degrades into the report.
pub async fn run_review<A>(
    client: &GitHubClient,
    agent: &A,
    id: &ChangeRequestId,
    cfg: &ReviewConfig,
) -> GitContextResult<ReviewReport>
where
    A: ReviewAgent + Sync,
{
    info!(project = %id.project, iid = id.iid, "run_review started");

    let pr_info = client.get_pr_info(id).await?;
    let changed_files = client.list_changed_files(id).await?;
    let raw_diff = client.get_raw_diff(id).await?;
    debug!(
        project = %id.project,
        iid = id.iid,
        files = changed_files.len(),
        diff_bytes = raw_diff.len(),
        "pull request data fetched from provider"
    );

    let source = client.content_source(id)?;
    let analysis = analysis::assemble(pr_info, &changed_files, &source, &raw_diff).await;

    review_and_publish(client, agent, &analysis, cfg).await
}

/// Second half of [`run_review`]: asks the agent, plans the comments
/// against the parsed diff and publishes them.
///
/// A failed agent run is reported in [`ReviewReport::agent_error`] and
/// nothing is posted.
pub async fn review_and_publish<A>(
    client: &GitHubClient,
    agent: &A,
    analysis: &PrAnalysis,
    cfg: &ReviewConfig,
) -> GitContextResult<ReviewReport>
where
    A: ReviewAgent + Sync,
{
    let repository = &analysis.pr_info.repository;
    let number = analysis.pr_info.number;

    let mut report = ReviewReport {
        repository: repository.clone(),
        pr_number: number,
        files_analyzed: analysis.summary.total_files,
        ..ReviewReport::default()
    };

    let outcome = agent.review(analysis).await;
    if !outcome.success {
        let error = outcome
            .error
            .unwrap_or_else(|| "review agent failed".to_string());
        warn!(%repository, number, error = %error, "review agent failed, nothing to post");
        report.agent_error = Some(error);
        return Ok(report);
    }

    report.comments_proposed = outcome.comments.len();
    if outcome.comments.is_empty() {
        info!(%repository, number, "no comments generated for this PR");
        return Ok(report);
    }

    let plan = plan_comments(
        analysis.parsed_diff(),
        outcome.comments,
        cfg.publish.fallback,
    );
    report.comments_relocated = plan.relocated;
    report.comments_dropped = plan.dropped;

    report.publish = client
        .post_review_comments(&analysis.pr_info, &plan.comments, &cfg.publish)
        .await?;

    info!(
        %repository,
        number,
        proposed = report.comments_proposed,
        relocated = report.comments_relocated,
        dropped = report.comments_dropped,
        posted = report.publish.posted,
        failed = report.publish.failed,
        "run_review finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use super::*;
    use crate::analysis::{ContentSource, assemble};
    use crate::git_providers::types::{ChangedFile, FileStatus, PrInfo};
    use crate::publish::PublishConfig;

    const DIFF: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,1 +1,2 @@
 fn a() {}
+fn b() {}
";

    struct NoContent;

    impl ContentSource for NoContent {
        fn fetch_content(
            &self,
            _path: &str,
            _revision: &str,
        ) -> impl Future<Output = GitContextResult<Option<String>>> + Send {
            async { Ok(None) }
        }
    }

    struct FixedAgent(ReviewOutcome);

    impl ReviewAgent for FixedAgent {
        fn review(&self, _analysis: &PrAnalysis) -> impl Future<Output = ReviewOutcome> + Send {
            let outcome = self.0.clone();
            async move { outcome }
        }
    }

    /// Nothing listens on port 9; any real request would count as failed.
    fn offline_client() -> GitHubClient {
        GitHubClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9".to_string(),
            "token".to_string(),
        )
    }

    async fn analysis() -> PrAnalysis {
        let pr = PrInfo {
            number: 3,
            title: "Add b".into(),
            repository: "octo/repo".into(),
            author: None,
            base_ref: "main".into(),
            head_ref: "feat".into(),
            base_sha: "b4se".into(),
            head_sha: "h3ad".into(),
            html_url: None,
        };
        let files = vec![ChangedFile {
            filename: "src/lib.rs".into(),
            status: FileStatus::Modified,
            additions: 1,
            deletions: 0,
            changes: 1,
            patch: None,
            previous_filename: None,
            blob_url: None,
            raw_url: None,
            sha: None,
        }];
        assemble(pr, &files, &NoContent, DIFF).await
    }

    fn comment(line: u32) -> ReviewComment {
        ReviewComment {
            path: "src/lib.rs".into(),
            line,
            body: "nit".into(),
        }
    }

    #[tokio::test]
    async fn agent_failure_stops_before_publishing() {
        let analysis = analysis().await;
        let agent = FixedAgent(ReviewOutcome::failed("agent down"));

        let report = review_and_publish(&offline_client(), &agent, &analysis, &ReviewConfig::default())
            .await
            .unwrap();

        assert_eq!(report.agent_error.as_deref(), Some("agent down"));
        assert_eq!(report.files_analyzed, 1);
        assert_eq!(report.comments_proposed, 0);
        assert_eq!(report.publish, PublishReport::default());
    }

    #[tokio::test]
    async fn dry_run_plans_and_skips_every_comment() {
        let analysis = analysis().await;
        let agent = FixedAgent(ReviewOutcome::succeeded(vec![comment(2), comment(40)]));
        let cfg = ReviewConfig {
            publish: PublishConfig {
                dry_run: true,
                ..PublishConfig::default()
            },
        };

        let report = review_and_publish(&offline_client(), &agent, &analysis, &cfg)
            .await
            .unwrap();

        assert_eq!(report.comments_proposed, 2);
        assert_eq!(report.comments_dropped, 1);
        assert_eq!(report.publish.skipped, 1);
        assert_eq!((report.publish.posted, report.publish.failed), (0, 0));
        assert!(report.agent_error.is_none());
    }
}
