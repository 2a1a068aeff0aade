//! Snapshot of a pull request as fetched from GitHub.
//!
//! `PullRequestInfo` is read once per work item and never mutated. Enum
//! variants deserialize directly from GitHub's GraphQL enum values; values the
//! bot doesn't know about land in an `Other` variant instead of failing the
//! whole fetch.

use serde::{Deserialize, Serialize};

use super::ids::{AppId, CheckRunId, PrNumber, Sha};

/// Lifecycle state of a pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PullRequestState {
    Open,
    Closed,
    Merged,
}

/// State of a single review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    #[serde(other)]
    Other,
}

/// A submitted review. `author` is `None` for deleted ("ghost") accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub author: Option<String>,
    pub state: ReviewState,
}

/// Progress of a check suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    Requested,
    Queued,
    InProgress,
    Waiting,
    Pending,
    Completed,
    #[serde(other)]
    Other,
}

/// Outcome of a completed check suite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckConclusion {
    Success,
    Failure,
    Neutral,
    Cancelled,
    TimedOut,
    ActionRequired,
    Stale,
    Skipped,
    StartupFailure,
    #[serde(other)]
    Other,
}

impl CheckConclusion {
    /// Whether this conclusion lets a pull request proceed.
    pub fn is_passing(&self) -> bool {
        matches!(
            self,
            CheckConclusion::Success | CheckConclusion::Neutral | CheckConclusion::Skipped
        )
    }
}

/// A check run inside a check suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunInfo {
    pub id: CheckRunId,
    pub name: String,
}

/// A check suite reported against a commit by one GitHub App.
///
/// `app_id` is `None` for suites whose app GitHub no longer reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSuiteInfo {
    pub app_id: Option<AppId>,
    pub app_name: Option<String>,
    pub status: CheckStatus,
    pub conclusion: Option<CheckConclusion>,
    pub check_runs: Vec<CheckRunInfo>,
}

/// The most recent commit of a pull request and the suites attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub oid: Sha,
    pub check_suites: Vec<CheckSuiteInfo>,
}

/// Everything per-pull-request processing needs to know about one PR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInfo {
    pub number: PrNumber,
    pub title: String,
    pub state: PullRequestState,
    pub is_draft: bool,
    pub base_ref: String,
    pub head_ref: String,
    pub head_sha: Sha,
    pub labels: Vec<String>,
    pub reviews: Vec<Review>,
    /// `None` only for pull requests GitHub reports without commits.
    pub last_commit: Option<CommitInfo>,
}

impl PullRequestInfo {
    /// Check suites attached to the most recent commit.
    pub fn check_suites(&self) -> &[CheckSuiteInfo] {
        self.last_commit
            .as_ref()
            .map(|c| c.check_suites.as_slice())
            .unwrap_or_default()
    }
}
