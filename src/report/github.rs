//! Pull request comment reporter.
//!
//! Configured from the GitHub Actions environment: `GITHUB_TOKEN`,
//! `GITHUB_REPOSITORY` (`owner/repo`), `GITHUB_REF`
//! (`refs/pull/<n>/merge`) and optionally `GITHUB_API_URL`. The first
//! snapshot creates a comment; later snapshots edit it in place. A fatal
//! run failure is posted as a separate comment.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::{debug, warn};

use super::{BenchmarkReport, MarkdownRenderer, Reporter};
use crate::error::{BenchError, Result};

const DEFAULT_API_URL: &str = "https://api.github.com";

/// Pull request number from a `refs/pull/<n>/merge` ref.
#[must_use]
pub fn parse_pull_ref(git_ref: &str) -> Option<u64> {
    git_ref
        .strip_prefix("refs/pull/")?
        .strip_suffix("/merge")?
        .parse()
        .ok()
}

/// Split `owner/repo`.
#[must_use]
pub fn parse_repository(repository: &str) -> Option<(String, String)> {
    let (owner, repo) = repository.split_once('/')?;
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Where comments go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestTarget {
    pub api_url: String,
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PullRequestTarget {
    /// Resolve the target from environment-style lookups.
    ///
    /// `Ok(None)` when the ref is not a pull request merge ref.
    ///
    /// # Errors
    ///
    /// Returns `Config` if a required variable is missing or malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<(Self, String)>> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| BenchError::Config(format!("{name} is required for the GitHub commenter")))
        };

        let token = required("GITHUB_TOKEN")?;
        let repository = required("GITHUB_REPOSITORY")?;
        let (owner, repo) = parse_repository(&repository).ok_or_else(|| {
            BenchError::Config("GITHUB_REPOSITORY must be in the format owner/repo".to_string())
        })?;
        let git_ref = required("GITHUB_REF")?;
        let Some(number) = parse_pull_ref(&git_ref) else {
            warn!(git_ref = %git_ref, "GITHUB_REF is not a pull request ref, not commenting");
            return Ok(None);
        };
        let api_url = lookup("GITHUB_API_URL")
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Ok(Some((
            Self {
                api_url: api_url.trim_end_matches('/').to_string(),
                owner,
                repo,
                number,
            },
            token,
        )))
    }

    fn create_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_url, self.owner, self.repo, self.number
        )
    }

    fn edit_url(&self, comment_id: u64) -> String {
        format!(
            "{}/repos/{}/{}/issues/comments/{comment_id}",
            self.api_url, self.owner, self.repo
        )
    }
}

/// Body of the comment posted when a run fails.
#[must_use]
pub fn error_comment(error: &str) -> String {
    format!("benchdiff error:\n```\n{error}\n```\n")
}

#[derive(Debug, Deserialize)]
struct CommentResponse {
    id: u64,
}

/// Keeps one pull request comment in sync with the latest snapshot.
pub struct GitHubCommentReporter {
    client: Client,
    token: String,
    target: PullRequestTarget,
    renderer: MarkdownRenderer,
    comment_id: Option<u64>,
}

impl GitHubCommentReporter {
    /// # Errors
    ///
    /// Returns `Http` if the client cannot be built.
    pub fn new(target: PullRequestTarget, token: String, share_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("benchdiff/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let renderer = MarkdownRenderer::new(share_url).with_compare_link(&target.owner, &target.repo);
        Ok(Self {
            client,
            token,
            target,
            renderer,
            comment_id: None,
        })
    }

    /// Build from the process environment; `Ok(None)` outside pull requests.
    ///
    /// # Errors
    ///
    /// Returns `Config` for missing variables.
    pub fn from_env(share_url: &str) -> Result<Option<Self>> {
        match PullRequestTarget::from_lookup(|name| std::env::var(name).ok())? {
            Some((target, token)) => Self::new(target, token, share_url).map(Some),
            None => Ok(None),
        }
    }

    fn send(&self, request: RequestBuilder, body: &str) -> Result<Response> {
        let payload = serde_json::json!({ "body": body });
        request
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(ACCEPT, "application/vnd.github+json")
            .json(&payload)
            .send()
            .and_then(Response::error_for_status)
            .map_err(|e| BenchError::Reporter {
                reporter: "github".to_string(),
                reason: e.to_string(),
            })
    }

    fn post(&mut self, body: &str) -> Result<()> {
        let request = match self.comment_id {
            Some(id) => self.client.patch(self.target.edit_url(id)),
            None => self.client.post(self.target.create_url()),
        };
        let response = self.send(request, body)?;

        if self.comment_id.is_none() {
            let created: CommentResponse = response.json().map_err(|e| BenchError::Reporter {
                reporter: "github".to_string(),
                reason: format!("unexpected comment response: {e}"),
            })?;
            debug!(comment_id = created.id, pr = self.target.number, "created comment");
            self.comment_id = Some(created.id);
        }
        Ok(())
    }
}

impl Reporter for GitHubCommentReporter {
    fn name(&self) -> &'static str {
        "github"
    }

    fn report(&mut self, report: &BenchmarkReport, finished: bool) -> Result<()> {
        let body = self.renderer.render(report, finished);
        self.post(&body)
    }

    fn report_error(&mut self, error: &str) -> Result<()> {
        let request = self.client.post(self.target.create_url());
        self.send(request, &error_comment(error))?;
        debug!(pr = self.target.number, "posted error comment");
        Ok(())
    }
}
