//! GitHub API effect types.
//!
//! These types describe GitHub API operations as data, without executing them.
//! An interpreter scoped to one repository executes them.

use serde::{Deserialize, Serialize};

use crate::types::{CheckRunId, PrNumber, PullRequestInfo, PullRequestRef, Sha};

/// Content of a check run: its name plus the `output` block GitHub renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckRunOutput {
    /// The check run name shown in the PR's checks list.
    pub name: String,
    pub title: String,
    /// Markdown body of the check run.
    pub summary: String,
}

/// A GitHub API effect.
///
/// Effects are repo-scoped: the interpreter is constructed with a `RepoId`, so
/// effects don't include it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GitHubEffect {
    // ─── Queries ──────────────────────────────────────────────────────────────
    /// Fetch a pull request with its reviews, labels and the check suites of
    /// its most recent commit (GraphQL).
    GetPullRequestInfo { pr: PrNumber },

    /// List open pull requests whose head is the given branch (GraphQL).
    ListAssociatedPullRequests { branch: String },

    /// Read a file from the repository's default branch.
    GetFileContents { path: String },

    // ─── Check runs ───────────────────────────────────────────────────────────
    /// Create a completed check run on `head_sha`.
    CreateCheckRun {
        head_sha: Sha,
        output: CheckRunOutput,
    },

    /// Overwrite an existing check run's name, title and summary.
    UpdateCheckRun {
        check_run_id: CheckRunId,
        output: CheckRunOutput,
    },
}

/// Response from a GitHub effect.
///
/// Each variant corresponds to the response from a particular effect type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GitHubResponse {
    /// Response to `GetPullRequestInfo`.
    PullRequestInfo(Box<PullRequestInfo>),

    /// Response to `ListAssociatedPullRequests`.
    ///
    /// Entries may point at other repositories (pull requests from forks
    /// report the base repository).
    PullRequests(Vec<PullRequestRef>),

    /// Response to `GetFileContents`. `None` if the file doesn't exist.
    FileContents(Option<String>),

    /// Response to `CreateCheckRun`.
    CheckRunCreated { id: CheckRunId },

    /// Response to `UpdateCheckRun`.
    CheckRunUpdated,
}

impl GitHubResponse {
    /// Short name of the variant, used in "unexpected response" errors.
    pub fn kind(&self) -> &'static str {
        match self {
            GitHubResponse::PullRequestInfo(_) => "pull_request_info",
            GitHubResponse::PullRequests(_) => "pull_requests",
            GitHubResponse::FileContents(_) => "file_contents",
            GitHubResponse::CheckRunCreated { .. } => "check_run_created",
            GitHubResponse::CheckRunUpdated => "check_run_updated",
        }
    }
}
