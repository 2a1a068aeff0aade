//! Error reporting for failed work items.

use std::error::Error;

use tracing::error;

use crate::github::{GitHubApiError, GitHubErrorKind};
use crate::types::PullRequestRef;

use super::queue::WorkItemError;

/// Receives every work item failure exactly once.
///
/// Called synchronously from the repository's drain task, so implementations
/// should return quickly and must not panic.
pub trait ErrorReporter: Send + Sync + 'static {
    fn report(&self, pull_request: &PullRequestRef, error: &WorkItemError);
}

/// Logs failures as `error!` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, pull_request: &PullRequestRef, err: &WorkItemError) {
        let kind = github_error_kind(err).map_or("unclassified", |kind| kind.as_str());
        error!(
            owner = %pull_request.owner,
            repo = %pull_request.repo,
            pr = %pull_request.number,
            kind,
            error = %error_chain(err),
            "Failed to process pull request"
        );
    }
}

/// Renders an error and its sources as `outer: inner: innermost`.
///
/// Every layer is expected to print only its own message.
pub fn error_chain(err: &dyn Error) -> String {
    let mut rendered = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        rendered.push_str(": ");
        rendered.push_str(&cause.to_string());
        source = cause.source();
    }
    rendered
}

/// The classification of the first GitHub API error behind `err`, if any.
pub fn github_error_kind(err: &WorkItemError) -> Option<GitHubErrorKind> {
    let WorkItemError::Failed(failure) = err else {
        return None;
    };

    let mut current: Option<&(dyn Error + 'static)> = Some(failure.as_ref());
    while let Some(e) = current {
        if let Some(github) = e.downcast_ref::<GitHubApiError>() {
            return Some(github.kind);
        }
        current = e.source();
    }
    None
}
