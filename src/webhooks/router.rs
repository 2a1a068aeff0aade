//! Maps parsed events to the pull requests whose status check they affect.

use std::collections::BTreeSet;

use tracing::debug;

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::github::GitHubApiError;
use crate::types::{AppId, InstallationId, PrNumber, PullRequestRef, RepoId};

use super::events::GitHubEvent;

/// What to enqueue for an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routing {
    /// Nothing to do.
    Ignore,

    /// Enqueue these pull requests directly.
    PullRequests {
        installation: InstallationId,
        pull_requests: Vec<PullRequestRef>,
    },

    /// Resolve each branch to its open pull requests first.
    Branches {
        installation: InstallationId,
        repo: RepoId,
        branches: Vec<String>,
    },
}

/// Decides which pull requests `event` affects.
///
/// `own_app` keeps the bot from reacting to progress reports of its own
/// check runs, which would otherwise re-trigger it after every update.
pub fn route(event: &GitHubEvent, own_app: AppId) -> Routing {
    let installation = event.installation();
    let repo = event.repo_id();
    let direct = |numbers: &[PrNumber]| {
        if numbers.is_empty() {
            return Routing::Ignore;
        }
        Routing::PullRequests {
            installation,
            pull_requests: numbers
                .iter()
                .map(|&n| PullRequestRef::new(repo, n))
                .collect(),
        }
    };

    match event {
        GitHubEvent::PullRequest(e) => direct(std::slice::from_ref(&e.pr_number)),
        GitHubEvent::PullRequestReview(e) => direct(std::slice::from_ref(&e.pr_number)),
        GitHubEvent::CheckRun(e) => {
            if !e.action.is_user_request() && e.app_id == Some(own_app) {
                debug!(repo = %repo, "Ignoring progress of own check run");
                return Routing::Ignore;
            }
            direct(&e.pull_requests)
        }
        GitHubEvent::CheckSuite(e) => direct(&e.pull_requests),
        GitHubEvent::Status(e) => {
            let branches: Vec<String> = e
                .branches
                .iter()
                .filter(|b| **b != e.default_branch)
                .cloned()
                .collect();
            if branches.is_empty() {
                return Routing::Ignore;
            }
            Routing::Branches {
                installation,
                repo: repo.clone(),
                branches,
            }
        }
    }
}

/// Resolves branches to the open pull requests whose head they are.
///
/// The result is deduplicated, so a pull request reachable through several
/// branches is processed once.
pub async fn resolve_branches<G: GitHubInterpreter>(
    github: &G,
    branches: &[String],
) -> Result<Vec<PullRequestRef>, GitHubApiError> {
    let mut seen = BTreeSet::new();
    let mut resolved = Vec::new();

    for branch in branches {
        let response = github
            .interpret(GitHubEffect::ListAssociatedPullRequests {
                branch: branch.clone(),
            })
            .await?;

        let pull_requests = match response {
            GitHubResponse::PullRequests(pull_requests) => pull_requests,
            other => {
                return Err(GitHubApiError::unexpected_response(
                    "pull_requests",
                    other.kind(),
                ));
            }
        };

        debug!(branch = %branch, count = pull_requests.len(), "Resolved branch");
        for pr in pull_requests {
            if seen.insert((pr.owner.clone(), pr.repo.clone(), pr.number)) {
                resolved.push(pr);
            }
        }
    }

    Ok(resolved)
}
