//! Shared test utilities: an in-memory GitHub, fixtures and arbitrary
//! generators for property-based testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::github::{GitHubApiError, InstallationAuth};
use crate::types::{
    AppId, CheckConclusion, CheckRunId, CheckRunInfo, CheckStatus, CheckSuiteInfo, CommitInfo,
    InstallationId, PrNumber, PullRequestInfo, PullRequestRef, PullRequestState, RepoId, Review,
    ReviewState, Sha,
};

// ─── MockGitHub ───────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MockState {
    responses: HashMap<GitHubEffect, Result<GitHubResponse, String>>,
    effects: Vec<GitHubEffect>,
    next_check_run_id: u64,
}

/// An in-memory GitHub that records every effect it interprets.
///
/// Responses are canned per effect and may be answered any number of times.
/// `CreateCheckRun` without a canned response succeeds with a fresh ID. Any
/// other unexpected effect fails with a permanent error.
#[derive(Debug, Clone, Default)]
pub struct MockGitHub {
    state: Arc<Mutex<MockState>>,
}

impl MockGitHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, effect: GitHubEffect, response: GitHubResponse) {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(effect, Ok(response));
    }

    pub fn fail(&self, effect: GitHubEffect, message: &str) {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert(effect, Err(message.to_string()));
    }

    /// Answers `GetPullRequestInfo` for `info.number`.
    pub fn respond_pull_request(&self, info: PullRequestInfo) {
        self.respond(
            GitHubEffect::GetPullRequestInfo { pr: info.number },
            GitHubResponse::PullRequestInfo(Box::new(info)),
        );
    }

    /// Answers the configuration fetch at `path` with `body`.
    pub fn respond_config(&self, path: &str, body: Option<&str>) {
        self.respond(
            GitHubEffect::GetFileContents {
                path: path.to_string(),
            },
            GitHubResponse::FileContents(body.map(String::from)),
        );
    }

    /// Every effect interpreted so far, in order.
    pub fn effects(&self) -> Vec<GitHubEffect> {
        self.state.lock().unwrap().effects.clone()
    }

    /// Effects that write check runs.
    pub fn check_run_writes(&self) -> Vec<GitHubEffect> {
        self.effects()
            .into_iter()
            .filter(|e| {
                matches!(
                    e,
                    GitHubEffect::CreateCheckRun { .. } | GitHubEffect::UpdateCheckRun { .. }
                )
            })
            .collect()
    }
}

impl GitHubInterpreter for MockGitHub {
    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, GitHubApiError> {
        let mut state = self.state.lock().unwrap();
        state.effects.push(effect.clone());

        match state.responses.get(&effect) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(GitHubApiError::permanent_without_source(message.clone())),
            None => match effect {
                GitHubEffect::CreateCheckRun { .. } => {
                    state.next_check_run_id += 1;
                    Ok(GitHubResponse::CheckRunCreated {
                        id: CheckRunId(1000 + state.next_check_run_id),
                    })
                }
                GitHubEffect::UpdateCheckRun { .. } => Ok(GitHubResponse::CheckRunUpdated),
                other => Err(GitHubApiError::permanent_without_source(format!(
                    "no canned response for {:?}",
                    other
                ))),
            },
        }
    }
}

// ─── MockAuth ─────────────────────────────────────────────────────────────────

/// Hands out one shared `MockGitHub` per repository and counts
/// authentications.
#[derive(Debug, Clone, Default)]
pub struct MockAuth {
    clients: Arc<Mutex<HashMap<RepoId, MockGitHub>>>,
    authentications: Arc<AtomicUsize>,
    failing: Arc<Mutex<Option<String>>>,
}

impl MockAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mock GitHub that clients for `repo` talk to.
    pub fn github(&self, repo: &RepoId) -> MockGitHub {
        self.clients
            .lock()
            .unwrap()
            .entry(repo.clone())
            .or_default()
            .clone()
    }

    pub fn authentications(&self) -> usize {
        self.authentications.load(Ordering::SeqCst)
    }

    /// Makes every later authentication fail with `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failing.lock().unwrap() = Some(message.to_string());
    }
}

impl InstallationAuth for MockAuth {
    type Client = MockGitHub;

    async fn authenticate(
        &self,
        _installation: InstallationId,
        repo: &RepoId,
    ) -> Result<MockGitHub, GitHubApiError> {
        self.authentications.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing.lock().unwrap().clone();
        if let Some(message) = failing {
            return Err(GitHubApiError::permanent_without_source(message));
        }
        Ok(self.github(repo))
    }
}

// ─── Fixtures ─────────────────────────────────────────────────────────────────

pub const OWN_APP: AppId = AppId(1);
pub const OTHER_APP: AppId = AppId(2);

pub fn sha(c: char) -> Sha {
    Sha::parse(c.to_string().repeat(40)).unwrap()
}

pub fn repo() -> RepoId {
    RepoId::new("owner", "repo")
}

pub fn pr_ref(number: u64) -> PullRequestRef {
    PullRequestRef::new(&repo(), number)
}

/// An open, approved, unlabelled pull request with no check suites.
pub fn pull_request(number: u64) -> PullRequestInfo {
    PullRequestInfo {
        number: PrNumber(number),
        title: format!("PR {}", number),
        state: PullRequestState::Open,
        is_draft: false,
        base_ref: "main".to_string(),
        head_ref: format!("feature-{}", number),
        head_sha: sha('a'),
        labels: Vec::new(),
        reviews: vec![Review {
            author: Some("reviewer".to_string()),
            state: ReviewState::Approved,
        }],
        last_commit: Some(CommitInfo {
            oid: sha('a'),
            check_suites: Vec::new(),
        }),
    }
}

pub fn with_suites(mut info: PullRequestInfo, suites: Vec<CheckSuiteInfo>) -> PullRequestInfo {
    info.last_commit = Some(CommitInfo {
        oid: info.head_sha.clone(),
        check_suites: suites,
    });
    info
}

/// A completed check suite owned by `app` with the given check run IDs.
pub fn suite(app: AppId, runs: &[u64]) -> CheckSuiteInfo {
    CheckSuiteInfo {
        app_id: Some(app),
        app_name: Some(format!("app-{}", app)),
        status: CheckStatus::Completed,
        conclusion: Some(CheckConclusion::Success),
        check_runs: runs
            .iter()
            .map(|&id| CheckRunInfo {
                id: CheckRunId(id),
                name: "check".to_string(),
            })
            .collect(),
    }
}

// ─── Generators ───────────────────────────────────────────────────────────────

pub fn arb_pr_number() -> impl Strategy<Value = PrNumber> {
    any::<u64>().prop_map(PrNumber)
}

pub fn arb_sha() -> impl Strategy<Value = Sha> {
    "[0-9a-f]{40}".prop_map(|s| Sha::parse(s).unwrap())
}

pub fn arb_app_id() -> impl Strategy<Value = AppId> {
    (1u64..5).prop_map(AppId)
}

pub fn arb_check_suite() -> impl Strategy<Value = CheckSuiteInfo> {
    (
        prop::option::of(arb_app_id()),
        prop::collection::vec(1u64..10_000, 0..3),
        any::<bool>(),
    )
        .prop_map(|(app_id, runs, completed)| CheckSuiteInfo {
            app_id,
            app_name: None,
            status: if completed {
                CheckStatus::Completed
            } else {
                CheckStatus::InProgress
            },
            conclusion: completed.then_some(CheckConclusion::Success),
            check_runs: runs
                .into_iter()
                .map(|id| CheckRunInfo {
                    id: CheckRunId(id),
                    name: "check".to_string(),
                })
                .collect(),
        })
}

pub fn arb_pull_request_info() -> impl Strategy<Value = PullRequestInfo> {
    (
        1u64..1000,
        arb_sha(),
        prop::collection::vec(arb_check_suite(), 0..4),
    )
        .prop_map(|(number, head, suites)| {
            let mut info = pull_request(number);
            info.head_sha = head;
            with_suites(info, suites)
        })
}
