//! Status report reconciliation.
//!
//! Keeps exactly one check run owned by this app on a pull request's head
//! commit in sync with the latest computed title and summary. The decision is
//! a pure function of the configuration flag and the check suites GitHub
//! reported, so invoking the reconciler repeatedly against unchanged remote
//! state issues the same single call every time and never accumulates runs.

use tracing::{debug, info};

use crate::effects::{CheckRunOutput, GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::github::{GitHubApiError, InstallationAuth};
use crate::types::{AppId, CheckRunId, PullRequestInfo, Sha};
use crate::worker::WorkerContext;

/// What the reconciler found about this app's own check on the head commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckSuiteState {
    pub own_app_id: AppId,
    pub own_check_run: Option<CheckRunId>,
}

impl CheckSuiteState {
    /// Locates this app's check run among the last commit's check suites.
    ///
    /// GitHub may attach more than one suite per app (an empty one is created
    /// on every push), so the first own suite that contains a run wins.
    pub fn from_pull_request(info: &PullRequestInfo, own_app_id: AppId) -> Self {
        let own_check_run = info
            .check_suites()
            .iter()
            .filter(|suite| suite.app_id == Some(own_app_id))
            .find_map(|suite| suite.check_runs.first())
            .map(|run| run.id);

        CheckSuiteState {
            own_app_id,
            own_check_run,
        }
    }

    pub fn has_own_check_run(&self) -> bool {
        self.own_check_run.is_some()
    }
}

/// The single action the reconciler takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconciliationDecision {
    /// Nothing to publish.
    None,
    /// Publish a new check run on the head commit.
    Create,
    /// Overwrite the existing check run.
    Update(CheckRunId),
}

/// Decides what to do with the status check.
///
/// | `report_status` | own check run | decision |
/// |---|---|---|
/// | false | none | `None` |
/// | false | exists | `Update` |
/// | true | exists | `Update` |
/// | true | none | `Create` |
///
/// An existing run is updated even with reporting disabled so it never shows a
/// stale verdict after a repository turns reporting off.
pub fn decide(report_status: bool, state: &CheckSuiteState) -> ReconciliationDecision {
    match (state.own_check_run, report_status) {
        (Some(id), _) => ReconciliationDecision::Update(id),
        (None, true) => ReconciliationDecision::Create,
        (None, false) => ReconciliationDecision::None,
    }
}

/// The remote call that carries out `decision`, if any.
pub fn to_effect(
    decision: ReconciliationDecision,
    head_sha: &Sha,
    output: CheckRunOutput,
) -> Option<GitHubEffect> {
    match decision {
        ReconciliationDecision::None => None,
        ReconciliationDecision::Create => Some(GitHubEffect::CreateCheckRun {
            head_sha: head_sha.clone(),
            output,
        }),
        ReconciliationDecision::Update(check_run_id) => Some(GitHubEffect::UpdateCheckRun {
            check_run_id,
            output,
        }),
    }
}

/// Decides and performs at most one check run write through `github`.
pub async fn reconcile<G: GitHubInterpreter>(
    github: &G,
    report_status: bool,
    own_app_id: AppId,
    info: &PullRequestInfo,
    output: CheckRunOutput,
) -> Result<ReconciliationDecision, GitHubApiError> {
    let state = CheckSuiteState::from_pull_request(info, own_app_id);
    let decision = decide(report_status, &state);
    apply(github, decision, info, output).await?;
    Ok(decision)
}

/// Performs the check run write `decision` calls for, if any.
pub async fn apply<G: GitHubInterpreter>(
    github: &G,
    decision: ReconciliationDecision,
    info: &PullRequestInfo,
    output: CheckRunOutput,
) -> Result<(), GitHubApiError> {
    let Some(effect) = to_effect(decision, &info.head_sha, output) else {
        debug!(pr = %info.number, "Status reporting disabled and no check run to update");
        return Ok(());
    };

    match (decision, github.interpret(effect).await?) {
        (ReconciliationDecision::Create, GitHubResponse::CheckRunCreated { id }) => {
            info!(
                pr = %info.number,
                check_run_id = %id,
                sha = %info.head_sha.short(),
                "Created status check"
            );
            Ok(())
        }
        (ReconciliationDecision::Update(id), GitHubResponse::CheckRunUpdated) => {
            debug!(pr = %info.number, check_run_id = %id, "Updated status check");
            Ok(())
        }
        (ReconciliationDecision::Create, other) => Err(GitHubApiError::unexpected_response(
            "check_run_created",
            other.kind(),
        )),
        (_, other) => Err(GitHubApiError::unexpected_response(
            "check_run_updated",
            other.kind(),
        )),
    }
}

/// Synchronizes the status check of `info` with `title` and `summary`, using
/// the context's configuration, identity and client.
///
/// The client is only requested when a remote call is actually needed.
pub async fn update_status_report_check<A: InstallationAuth>(
    context: &WorkerContext<A>,
    info: &PullRequestInfo,
    title: &str,
    summary: &str,
) -> Result<ReconciliationDecision, GitHubApiError> {
    let state = CheckSuiteState::from_pull_request(info, context.app_id());
    let decision = decide(context.config().report_status, &state);
    if decision == ReconciliationDecision::None {
        return Ok(decision);
    }

    let output = CheckRunOutput {
        name: context.check_name().to_string(),
        title: title.to_string(),
        summary: summary.to_string(),
    };
    let github = context.github().await?;
    apply(github, decision, info, output).await?;
    Ok(decision)
}
