//! Core domain types for the auto-merge bot.

pub mod ids;
pub mod pull_request;

pub use ids::{
    AppId, CheckRunId, DeliveryId, InstallationId, InvalidPullRequest, InvalidSha, PrNumber,
    PullRequestRef, RepoId, Sha,
};
pub use pull_request::{
    CheckConclusion, CheckRunInfo, CheckStatus, CheckSuiteInfo, CommitInfo, PullRequestInfo,
    PullRequestState, Review, ReviewState,
};
