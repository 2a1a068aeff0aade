//! GitHub webhook event types.
//!
//! Typed representations of the webhook events that can change whether a pull
//! request is ready to merge. Every event carries the installation it was
//! delivered for, since processing authenticates as that installation.
//!
//! # Event Types
//!
//! - `pull_request` - lifecycle, labels, draft state
//! - `pull_request_review` - reviews submitted, edited or dismissed
//! - `check_run` - individual CI results (Checks API)
//! - `check_suite` - CI suites requested or completed (Checks API)
//! - `status` - CI results from the legacy Status API

use serde::{Deserialize, Serialize};

use crate::types::{AppId, InstallationId, PrNumber, RepoId, Sha};

/// A parsed GitHub webhook event.
///
/// Only relevant events and actions are represented; the parser returns
/// `None` for everything else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GitHubEvent {
    PullRequest(PullRequestEvent),
    PullRequestReview(PullRequestReviewEvent),
    CheckRun(CheckRunEvent),
    CheckSuite(CheckSuiteEvent),

    /// A commit status was updated (legacy Status API).
    ///
    /// Statuses are attached to commits, not pull requests, so the affected
    /// pull requests have to be looked up through the commit's branches.
    Status(StatusEvent),
}

impl GitHubEvent {
    /// Returns the repository this event belongs to.
    pub fn repo_id(&self) -> &RepoId {
        match self {
            GitHubEvent::PullRequest(e) => &e.repo,
            GitHubEvent::PullRequestReview(e) => &e.repo,
            GitHubEvent::CheckRun(e) => &e.repo,
            GitHubEvent::CheckSuite(e) => &e.repo,
            GitHubEvent::Status(e) => &e.repo,
        }
    }

    pub fn installation(&self) -> InstallationId {
        match self {
            GitHubEvent::PullRequest(e) => e.installation,
            GitHubEvent::PullRequestReview(e) => e.installation,
            GitHubEvent::CheckRun(e) => e.installation,
            GitHubEvent::CheckSuite(e) => e.installation,
            GitHubEvent::Status(e) => e.installation,
        }
    }
}

/// Pull request actions that can change the merge conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrAction {
    Opened,
    Edited,
    Reopened,
    /// PR head was updated (new commits pushed).
    Synchronize,
    Labeled,
    Unlabeled,
    ReadyForReview,
    ConvertedToDraft,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestEvent {
    pub repo: RepoId,
    pub installation: InstallationId,
    pub action: PrAction,
    pub pr_number: PrNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Submitted,
    Edited,
    Dismissed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestReviewEvent {
    pub repo: RepoId,
    pub installation: InstallationId,
    pub action: ReviewAction,
    pub pr_number: PrNumber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckRunAction {
    Created,
    Completed,
    /// Someone pressed "Re-run" on the check.
    Rerequested,
    /// Someone pressed one of the check's action buttons.
    RequestedAction,
}

impl CheckRunAction {
    /// Whether this action is a person asking this check to run again, as
    /// opposed to a check reporting progress.
    pub fn is_user_request(&self) -> bool {
        matches!(
            self,
            CheckRunAction::Rerequested | CheckRunAction::RequestedAction
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunEvent {
    pub repo: RepoId,
    pub installation: InstallationId,
    pub action: CheckRunAction,

    /// The app owning the run's check suite, if GitHub reported one.
    pub app_id: Option<AppId>,

    /// Pull requests in this repository whose head is the run's commit.
    /// Empty for pull requests from forks.
    pub pull_requests: Vec<PrNumber>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckSuiteAction {
    Requested,
    Rerequested,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSuiteEvent {
    pub repo: RepoId,
    pub installation: InstallationId,
    pub action: CheckSuiteAction,
    pub pull_requests: Vec<PrNumber>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub repo: RepoId,
    pub installation: InstallationId,
    pub sha: Sha,

    /// Branches whose head is `sha`.
    pub branches: Vec<String>,

    /// The repository's default branch.
    pub default_branch: String,
}
