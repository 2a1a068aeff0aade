//! GitHub webhook payload parser.
//!
//! This module parses raw webhook JSON payloads into typed [`GitHubEvent`] values.
//! The parser is designed to be robust against unknown fields and event types.
//!
//! # Parsing Strategy
//!
//! 1. The event type is determined from the `X-GitHub-Event` header
//! 2. The payload is parsed according to the event type
//! 3. Unknown event types and irrelevant actions return `Ok(None)` (ignored, not error)
//! 4. Malformed payloads return `Err` with details

use serde::Deserialize;
use thiserror::Error;

use crate::types::{AppId, InstallationId, PrNumber, RepoId, Sha};

use super::events::{
    CheckRunAction, CheckRunEvent, CheckSuiteAction, CheckSuiteEvent, GitHubEvent, PrAction,
    PullRequestEvent, PullRequestReviewEvent, ReviewAction, StatusEvent,
};

/// Error type for webhook parsing failures.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON deserialization failed (includes missing required fields).
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Field has invalid value (e.g., malformed SHA).
    #[error("invalid field value for {field}: {value}")]
    InvalidField { field: &'static str, value: String },
}

/// Parses a webhook payload into a typed event.
///
/// * `Ok(Some(event))` - a relevant event
/// * `Ok(None)` - unknown event type or irrelevant action
/// * `Err(e)` - malformed payload or missing required fields
///
/// # Examples
///
/// ```
/// use auto_merge_bot::webhooks::parse_webhook;
///
/// let payload = br#"{
///     "action": "labeled",
///     "pull_request": { "number": 42 },
///     "repository": { "owner": { "login": "owner" }, "name": "repo" },
///     "installation": { "id": 7 }
/// }"#;
///
/// let event = parse_webhook("pull_request", payload).unwrap();
/// assert!(event.is_some());
/// ```
pub fn parse_webhook(event_type: &str, payload: &[u8]) -> Result<Option<GitHubEvent>, ParseError> {
    match event_type {
        "pull_request" => parse_pull_request(payload).map(|e| e.map(GitHubEvent::PullRequest)),
        "pull_request_review" => {
            parse_pull_request_review(payload).map(|e| e.map(GitHubEvent::PullRequestReview))
        }
        "check_run" => parse_check_run(payload).map(|e| e.map(GitHubEvent::CheckRun)),
        "check_suite" => parse_check_suite(payload).map(|e| e.map(GitHubEvent::CheckSuite)),
        "status" => parse_status(payload).map(|e| Some(GitHubEvent::Status(e))),
        // Unknown event types are ignored (not an error)
        _ => Ok(None),
    }
}

// ============================================================================
// Shared payload structures
// ============================================================================

/// Minimal repository info present in all webhook payloads.
#[derive(Debug, Deserialize)]
struct RawRepository {
    owner: RawOwner,
    name: String,
}

impl RawRepository {
    fn into_repo_id(self) -> RepoId {
        RepoId::new(self.owner.login, self.name)
    }
}

#[derive(Debug, Deserialize)]
struct RawOwner {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawInstallation {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct RawPullRequestNumber {
    number: u64,
}

#[derive(Debug, Deserialize)]
struct RawApp {
    id: u64,
}

fn pr_numbers(raw: Vec<RawPullRequestNumber>) -> Vec<PrNumber> {
    raw.into_iter().map(|pr| PrNumber(pr.number)).collect()
}

// ============================================================================
// pull_request event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPullRequestPayload {
    action: String,
    pull_request: RawPullRequestNumber,
    repository: RawRepository,
    installation: RawInstallation,
}

fn parse_pull_request(payload: &[u8]) -> Result<Option<PullRequestEvent>, ParseError> {
    let raw: RawPullRequestPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "opened" => PrAction::Opened,
        "edited" => PrAction::Edited,
        "reopened" => PrAction::Reopened,
        "synchronize" => PrAction::Synchronize,
        "labeled" => PrAction::Labeled,
        "unlabeled" => PrAction::Unlabeled,
        "ready_for_review" => PrAction::ReadyForReview,
        "converted_to_draft" => PrAction::ConvertedToDraft,
        // closed, assigned, review_requested, ... don't affect the status check
        _ => return Ok(None),
    };

    Ok(Some(PullRequestEvent {
        repo: raw.repository.into_repo_id(),
        installation: InstallationId(raw.installation.id),
        action,
        pr_number: PrNumber(raw.pull_request.number),
    }))
}

// ============================================================================
// pull_request_review event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawPullRequestReviewPayload {
    action: String,
    pull_request: RawPullRequestNumber,
    repository: RawRepository,
    installation: RawInstallation,
}

fn parse_pull_request_review(payload: &[u8]) -> Result<Option<PullRequestReviewEvent>, ParseError> {
    let raw: RawPullRequestReviewPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "submitted" => ReviewAction::Submitted,
        "edited" => ReviewAction::Edited,
        "dismissed" => ReviewAction::Dismissed,
        _ => return Ok(None),
    };

    Ok(Some(PullRequestReviewEvent {
        repo: raw.repository.into_repo_id(),
        installation: InstallationId(raw.installation.id),
        action,
        pr_number: PrNumber(raw.pull_request.number),
    }))
}

// ============================================================================
// check_run event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawCheckRunPayload {
    action: String,
    check_run: RawCheckRun,
    repository: RawRepository,
    installation: RawInstallation,
}

#[derive(Debug, Deserialize)]
struct RawCheckRun {
    app: Option<RawApp>,
    check_suite: Option<RawCheckRunSuite>,
    #[serde(default)]
    pull_requests: Vec<RawPullRequestNumber>,
}

#[derive(Debug, Deserialize)]
struct RawCheckRunSuite {
    app: Option<RawApp>,
}

fn parse_check_run(payload: &[u8]) -> Result<Option<CheckRunEvent>, ParseError> {
    let raw: RawCheckRunPayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "created" => CheckRunAction::Created,
        "completed" => CheckRunAction::Completed,
        "rerequested" => CheckRunAction::Rerequested,
        "requested_action" => CheckRunAction::RequestedAction,
        _ => return Ok(None),
    };

    // The suite's app owns the run; `check_run.app` is the same app in every
    // payload GitHub sends today, so it serves as a fallback.
    let app_id = raw
        .check_run
        .check_suite
        .and_then(|suite| suite.app)
        .or(raw.check_run.app)
        .map(|app| AppId(app.id));

    Ok(Some(CheckRunEvent {
        repo: raw.repository.into_repo_id(),
        installation: InstallationId(raw.installation.id),
        action,
        app_id,
        pull_requests: pr_numbers(raw.check_run.pull_requests),
    }))
}

// ============================================================================
// check_suite event
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawCheckSuitePayload {
    action: String,
    check_suite: RawCheckSuite,
    repository: RawRepository,
    installation: RawInstallation,
}

#[derive(Debug, Deserialize)]
struct RawCheckSuite {
    #[serde(default)]
    pull_requests: Vec<RawPullRequestNumber>,
}

fn parse_check_suite(payload: &[u8]) -> Result<Option<CheckSuiteEvent>, ParseError> {
    let raw: RawCheckSuitePayload = serde_json::from_slice(payload)?;

    let action = match raw.action.as_str() {
        "requested" => CheckSuiteAction::Requested,
        "rerequested" => CheckSuiteAction::Rerequested,
        "completed" => CheckSuiteAction::Completed,
        _ => return Ok(None),
    };

    Ok(Some(CheckSuiteEvent {
        repo: raw.repository.into_repo_id(),
        installation: InstallationId(raw.installation.id),
        action,
        pull_requests: pr_numbers(raw.check_suite.pull_requests),
    }))
}

// ============================================================================
// status event (legacy Status API)
// ============================================================================

#[derive(Debug, Deserialize)]
struct RawStatusPayload {
    sha: String,
    #[serde(default)]
    branches: Vec<RawBranch>,
    repository: RawStatusRepository,
    installation: RawInstallation,
}

#[derive(Debug, Deserialize)]
struct RawBranch {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawStatusRepository {
    owner: RawOwner,
    name: String,
    default_branch: String,
}

fn parse_status(payload: &[u8]) -> Result<StatusEvent, ParseError> {
    let raw: RawStatusPayload = serde_json::from_slice(payload)?;

    let sha = Sha::parse(&raw.sha).map_err(|_| ParseError::InvalidField {
        field: "sha",
        value: raw.sha.clone(),
    })?;

    Ok(StatusEvent {
        repo: RepoId::new(raw.repository.owner.login, raw.repository.name),
        installation: InstallationId(raw.installation.id),
        sha,
        branches: raw.branches.into_iter().map(|b| b.name).collect(),
        default_branch: raw.repository.default_branch,
    })
}
