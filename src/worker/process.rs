//! Per-pull-request processing: fetch, evaluate, report.

use thiserror::Error;
use tracing::{Instrument, info, instrument};

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::github::{GitHubApiError, InstallationAuth};
use crate::status::{
    ReconciliationDecision, evaluate, format_summary, format_title, update_status_report_check,
};
use crate::types::PullRequestInfo;

use super::context::{ContextError, WorkerContext, WorkerContextFactory};
use super::queue::{PullRequestHandler, WorkItem};

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("GitHub request failed")]
    GitHub(#[from] GitHubApiError),
}

/// The production [`PullRequestHandler`]: builds a context per item and
/// synchronizes the pull request's status check.
pub struct PullRequestProcessor<A> {
    factory: WorkerContextFactory<A>,
}

impl<A: InstallationAuth> PullRequestProcessor<A> {
    pub fn new(factory: WorkerContextFactory<A>) -> Self {
        Self { factory }
    }
}

impl<A: InstallationAuth> PullRequestHandler for PullRequestProcessor<A> {
    type Error = ProcessError;

    async fn handle(&self, item: &WorkItem) -> Result<(), ProcessError> {
        let context = self
            .factory
            .build(item.installation, &item.pull_request)
            .await?;
        let span = context.span().clone();
        process_pull_request(&context).instrument(span).await?;
        Ok(())
    }
}

/// Fetches a fresh snapshot, evaluates the merge conditions and reconciles
/// the status check.
#[instrument(skip(context), fields(pr = %context.pull_request()))]
pub async fn process_pull_request<A: InstallationAuth>(
    context: &WorkerContext<A>,
) -> Result<ReconciliationDecision, ProcessError> {
    let github = context.github().await?;
    let info = fetch_pull_request(github, context).await?;

    let outcomes = evaluate(&info, context.config(), context.app_id());
    let title = format_title(&outcomes);
    let summary = format_summary(&outcomes);

    let decision = update_status_report_check(context, &info, &title, &summary).await?;
    info!(title = %title, decision = ?decision, "Processed pull request");
    Ok(decision)
}

async fn fetch_pull_request<G: GitHubInterpreter, A: InstallationAuth>(
    github: &G,
    context: &WorkerContext<A>,
) -> Result<PullRequestInfo, GitHubApiError> {
    let response = github
        .interpret(GitHubEffect::GetPullRequestInfo {
            pr: context.pull_request().number,
        })
        .await?;

    match response {
        GitHubResponse::PullRequestInfo(info) => Ok(*info),
        other => Err(GitHubApiError::unexpected_response(
            "pull_request_info",
            other.kind(),
        )),
    }
}
