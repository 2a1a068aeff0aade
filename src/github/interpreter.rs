//! GitHub effect interpreter using octocrab.
//!
//! Key implementation details:
//! - GraphQL for pull request info (reviews, labels and check suites with
//!   their owning app in one round trip) and for branch → PR resolution
//! - REST for check run writes and file contents
//! - No retries: every failure is categorized and returned to the caller

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::effects::{CheckRunOutput, GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::types::{
    AppId, CheckConclusion, CheckRunId, CheckRunInfo, CheckStatus, CheckSuiteInfo, CommitInfo,
    PrNumber, PullRequestInfo, PullRequestRef, PullRequestState, RepoId, Review, ReviewState, Sha,
};

use super::client::OctocrabClient;
use super::error::GitHubApiError;

// ─── GraphQL Plumbing ─────────────────────────────────────────────────────────

/// Envelope of every GraphQL response.
#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// A GraphQL connection. Individual nodes may be null.
#[derive(Debug, Deserialize)]
struct Nodes<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

impl<T> Nodes<T> {
    fn into_items(self) -> impl Iterator<Item = T> {
        self.nodes.into_iter().flatten()
    }
}

async fn graphql<T: DeserializeOwned>(
    client: &OctocrabClient,
    query: &str,
    variables: serde_json::Value,
) -> Result<T, GitHubApiError> {
    let response: GraphQlResponse<T> = client
        .inner()
        .graphql(&serde_json::json!({
            "query": query,
            "variables": variables,
        }))
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    unwrap_graphql(response)
}

fn unwrap_graphql<T>(response: GraphQlResponse<T>) -> Result<T, GitHubApiError> {
    match response.data {
        Some(data) => Ok(data),
        None => {
            let messages: Vec<_> = response.errors.into_iter().map(|e| e.message).collect();
            Err(GitHubApiError::permanent_without_source(format!(
                "GraphQL query returned no data: {}",
                messages.join("; ")
            )))
        }
    }
}

// ─── Pull Request Info Query ──────────────────────────────────────────────────

const PULL_REQUEST_INFO_QUERY: &str = r#"
query($owner: String!, $repo: String!, $number: Int!) {
    repository(owner: $owner, name: $repo) {
        pullRequest(number: $number) {
            number
            title
            state
            isDraft
            baseRefName
            headRefName
            headRefOid
            labels(first: 100) { nodes { name } }
            reviews(last: 100) { nodes { state author { login } } }
            commits(last: 1) {
                nodes {
                    commit {
                        oid
                        checkSuites(first: 100) {
                            nodes {
                                app { databaseId name }
                                status
                                conclusion
                                checkRuns(first: 100) { nodes { databaseId name } }
                            }
                        }
                    }
                }
            }
        }
    }
}
"#;

#[derive(Debug, Deserialize)]
struct PullRequestInfoData {
    repository: Option<PullRequestInfoRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullRequestInfoRepository {
    pull_request: Option<RawPullRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPullRequest {
    number: u64,
    title: String,
    state: PullRequestState,
    is_draft: bool,
    base_ref_name: String,
    head_ref_name: String,
    head_ref_oid: String,
    labels: Option<Nodes<RawLabel>>,
    reviews: Option<Nodes<RawReview>>,
    commits: Nodes<RawCommitNode>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawReview {
    state: ReviewState,
    author: Option<RawActor>,
}

#[derive(Debug, Deserialize)]
struct RawActor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct RawCommitNode {
    commit: RawCommit,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCommit {
    oid: String,
    check_suites: Option<Nodes<RawCheckSuite>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCheckSuite {
    app: Option<RawApp>,
    status: CheckStatus,
    conclusion: Option<CheckConclusion>,
    check_runs: Option<Nodes<RawCheckRun>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawApp {
    database_id: Option<u64>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCheckRun {
    database_id: Option<u64>,
    name: String,
}

fn parse_sha(field: &str, value: &str) -> Result<Sha, GitHubApiError> {
    Sha::parse(value).map_err(|e| {
        GitHubApiError::permanent_without_source(format!("invalid {}: {}", field, e))
    })
}

/// Converts the raw GraphQL pull request into the domain snapshot.
fn into_pull_request_info(raw: RawPullRequest) -> Result<PullRequestInfo, GitHubApiError> {
    let head_sha = parse_sha("headRefOid", &raw.head_ref_oid)?;

    let last_commit = match raw.commits.into_items().last() {
        Some(node) => Some(into_commit_info(node.commit)?),
        None => None,
    };

    Ok(PullRequestInfo {
        number: PrNumber(raw.number),
        title: raw.title,
        state: raw.state,
        is_draft: raw.is_draft,
        base_ref: raw.base_ref_name,
        head_ref: raw.head_ref_name,
        head_sha,
        labels: raw
            .labels
            .map(|l| l.into_items().map(|label| label.name).collect())
            .unwrap_or_default(),
        reviews: raw
            .reviews
            .map(|r| {
                r.into_items()
                    .map(|review| Review {
                        author: review.author.map(|a| a.login),
                        state: review.state,
                    })
                    .collect()
            })
            .unwrap_or_default(),
        last_commit,
    })
}

fn into_commit_info(raw: RawCommit) -> Result<CommitInfo, GitHubApiError> {
    let oid = parse_sha("commit.oid", &raw.oid)?;
    let check_suites = raw
        .check_suites
        .map(|suites| suites.into_items().map(into_check_suite_info).collect())
        .unwrap_or_default();

    Ok(CommitInfo { oid, check_suites })
}

fn into_check_suite_info(raw: RawCheckSuite) -> CheckSuiteInfo {
    let (app_id, app_name) = match raw.app {
        Some(app) => (app.database_id.map(AppId), app.name),
        None => (None, None),
    };

    CheckSuiteInfo {
        app_id,
        app_name,
        status: raw.status,
        conclusion: raw.conclusion,
        check_runs: raw
            .check_runs
            .map(|runs| {
                runs.into_items()
                    .filter_map(|run| {
                        run.database_id.map(|id| CheckRunInfo {
                            id: CheckRunId(id),
                            name: run.name,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default(),
    }
}

// ─── Associated Pull Requests Query ───────────────────────────────────────────

const ASSOCIATED_PULL_REQUESTS_QUERY: &str = r#"
query($owner: String!, $repo: String!, $qualifiedName: String!) {
    repository(owner: $owner, name: $repo) {
        ref(qualifiedName: $qualifiedName) {
            associatedPullRequests(first: 10, states: OPEN) {
                nodes {
                    number
                    repository { name owner { login } }
                }
            }
        }
    }
}
"#;

#[derive(Debug, Deserialize)]
struct AssociatedData {
    repository: Option<AssociatedRepository>,
}

#[derive(Debug, Deserialize)]
struct AssociatedRepository {
    #[serde(rename = "ref")]
    git_ref: Option<AssociatedRef>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssociatedRef {
    associated_pull_requests: Nodes<AssociatedPullRequest>,
}

#[derive(Debug, Deserialize)]
struct AssociatedPullRequest {
    number: u64,
    repository: AssociatedPullRequestRepository,
}

#[derive(Debug, Deserialize)]
struct AssociatedPullRequestRepository {
    name: String,
    owner: RawActor,
}

/// Flattens the associated pull requests; a missing repository or ref (e.g.
/// the branch was deleted) yields an empty list.
fn into_pull_request_refs(data: AssociatedData) -> Vec<PullRequestRef> {
    data.repository
        .and_then(|r| r.git_ref)
        .map(|r| {
            r.associated_pull_requests
                .into_items()
                .map(|pr| {
                    let repo = RepoId::new(pr.repository.owner.login, pr.repository.name);
                    PullRequestRef::new(&repo, pr.number)
                })
                .collect()
        })
        .unwrap_or_default()
}

// ─── Interpreter Implementation ───────────────────────────────────────────────

impl GitHubInterpreter for OctocrabClient {
    async fn interpret(&self, effect: GitHubEffect) -> Result<GitHubResponse, GitHubApiError> {
        debug!(repo = %self.repo(), effect = ?effect, "Executing GitHub effect");

        match effect {
            GitHubEffect::GetPullRequestInfo { pr } => get_pull_request_info(self, pr).await,
            GitHubEffect::ListAssociatedPullRequests { branch } => {
                list_associated_pull_requests(self, &branch).await
            }
            GitHubEffect::GetFileContents { path } => get_file_contents(self, &path).await,
            GitHubEffect::CreateCheckRun { head_sha, output } => {
                create_check_run(self, &head_sha, &output).await
            }
            GitHubEffect::UpdateCheckRun {
                check_run_id,
                output,
            } => update_check_run(self, check_run_id, &output).await,
        }
    }
}

async fn get_pull_request_info(
    client: &OctocrabClient,
    pr: PrNumber,
) -> Result<GitHubResponse, GitHubApiError> {
    let data: PullRequestInfoData = graphql(
        client,
        PULL_REQUEST_INFO_QUERY,
        serde_json::json!({
            "owner": client.owner(),
            "repo": client.repo_name(),
            "number": pr.0,
        }),
    )
    .await?;

    let raw = data
        .repository
        .and_then(|r| r.pull_request)
        .ok_or_else(|| {
            GitHubApiError::permanent_without_source(format!(
                "pull request {} not found in {}",
                pr,
                client.repo()
            ))
        })?;

    Ok(GitHubResponse::PullRequestInfo(Box::new(
        into_pull_request_info(raw)?,
    )))
}

async fn list_associated_pull_requests(
    client: &OctocrabClient,
    branch: &str,
) -> Result<GitHubResponse, GitHubApiError> {
    let data: AssociatedData = graphql(
        client,
        ASSOCIATED_PULL_REQUESTS_QUERY,
        serde_json::json!({
            "owner": client.owner(),
            "repo": client.repo_name(),
            "qualifiedName": format!("refs/heads/{}", branch),
        }),
    )
    .await?;

    Ok(GitHubResponse::PullRequests(into_pull_request_refs(data)))
}

async fn get_file_contents(
    client: &OctocrabClient,
    path: &str,
) -> Result<GitHubResponse, GitHubApiError> {
    let result = client
        .inner()
        .repos(client.owner(), client.repo_name())
        .get_content()
        .path(path)
        .send()
        .await;

    match result {
        Ok(contents) => {
            let body = contents
                .items
                .into_iter()
                .next()
                .and_then(|item| item.decoded_content());
            Ok(GitHubResponse::FileContents(body))
        }
        Err(e) => {
            let err = GitHubApiError::from_octocrab(e);
            if err.is_not_found() {
                Ok(GitHubResponse::FileContents(None))
            } else {
                Err(err)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct CheckRunOutputBody<'a> {
    title: &'a str,
    summary: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateCheckRunRequest<'a> {
    name: &'a str,
    head_sha: &'a str,
    status: &'static str,
    conclusion: &'static str,
    completed_at: chrono::DateTime<Utc>,
    output: CheckRunOutputBody<'a>,
}

#[derive(Debug, Serialize)]
struct UpdateCheckRunRequest<'a> {
    name: &'a str,
    status: &'static str,
    conclusion: &'static str,
    completed_at: chrono::DateTime<Utc>,
    output: CheckRunOutputBody<'a>,
}

#[derive(Debug, Deserialize)]
struct CheckRunCreatedBody {
    id: u64,
}

/// The status check is informational, so it is always published completed
/// with a neutral conclusion; the title carries the actual verdict.
const CHECK_STATUS: &str = "completed";
const CHECK_CONCLUSION: &str = "neutral";

async fn create_check_run(
    client: &OctocrabClient,
    head_sha: &Sha,
    output: &CheckRunOutput,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/check-runs",
        client.owner(),
        client.repo_name()
    );

    let request = CreateCheckRunRequest {
        name: &output.name,
        head_sha: head_sha.as_str(),
        status: CHECK_STATUS,
        conclusion: CHECK_CONCLUSION,
        completed_at: Utc::now(),
        output: CheckRunOutputBody {
            title: &output.title,
            summary: &output.summary,
        },
    };

    let result: Result<CheckRunCreatedBody, _> = client.inner().post(url, Some(&request)).await;

    match result {
        Ok(body) => Ok(GitHubResponse::CheckRunCreated {
            id: CheckRunId(body.id),
        }),
        Err(e) => Err(GitHubApiError::from_octocrab(e)),
    }
}

async fn update_check_run(
    client: &OctocrabClient,
    check_run_id: CheckRunId,
    output: &CheckRunOutput,
) -> Result<GitHubResponse, GitHubApiError> {
    let url = format!(
        "/repos/{}/{}/check-runs/{}",
        client.owner(),
        client.repo_name(),
        check_run_id
    );

    let request = UpdateCheckRunRequest {
        name: &output.name,
        status: CHECK_STATUS,
        conclusion: CHECK_CONCLUSION,
        completed_at: Utc::now(),
        output: CheckRunOutputBody {
            title: &output.title,
            summary: &output.summary,
        },
    };

    let result: Result<serde_json::Value, _> = client.inner().patch(url, Some(&request)).await;

    match result {
        Ok(_) => Ok(GitHubResponse::CheckRunUpdated),
        Err(e) => Err(GitHubApiError::from_octocrab(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sha(c: char) -> String {
        c.to_string().repeat(40)
    }

    fn pull_request_json() -> serde_json::Value {
        json!({
            "data": {
                "repository": {
                    "pullRequest": {
                        "number": 42,
                        "title": "Add feature",
                        "state": "OPEN",
                        "isDraft": false,
                        "baseRefName": "main",
                        "headRefName": "feature",
                        "headRefOid": sha('a'),
                        "labels": { "nodes": [{ "name": "automerge" }] },
                        "reviews": { "nodes": [
                            { "state": "APPROVED", "author": { "login": "alice" } },
                            { "state": "COMMENTED", "author": null },
                            null
                        ] },
                        "commits": { "nodes": [{
                            "commit": {
                                "oid": sha('a'),
                                "checkSuites": { "nodes": [
                                    {
                                        "app": { "databaseId": 1, "name": "auto-merge" },
                                        "status": "COMPLETED",
                                        "conclusion": "NEUTRAL",
                                        "checkRuns": { "nodes": [
                                            { "databaseId": 99, "name": "auto-merge" }
                                        ] }
                                    },
                                    {
                                        "app": null,
                                        "status": "QUEUED",
                                        "conclusion": null,
                                        "checkRuns": null
                                    }
                                ] }
                            }
                        }] }
                    }
                }
            }
        })
    }

    #[test]
    fn pull_request_info_from_graphql() {
        let response: GraphQlResponse<PullRequestInfoData> =
            serde_json::from_value(pull_request_json()).unwrap();
        let raw = unwrap_graphql(response)
            .unwrap()
            .repository
            .unwrap()
            .pull_request
            .unwrap();

        let info = into_pull_request_info(raw).unwrap();

        assert_eq!(info.number, PrNumber(42));
        assert_eq!(info.state, PullRequestState::Open);
        assert_eq!(info.labels, vec!["automerge".to_string()]);
        assert_eq!(info.reviews.len(), 2);
        assert_eq!(info.reviews[0].author.as_deref(), Some("alice"));
        assert_eq!(info.reviews[1].author, None);

        let suites = info.check_suites();
        assert_eq!(suites.len(), 2);
        assert_eq!(suites[0].app_id, Some(AppId(1)));
        assert_eq!(suites[0].check_runs[0].id, CheckRunId(99));
        assert_eq!(suites[1].app_id, None);
        assert_eq!(suites[1].status, CheckStatus::Queued);
        assert!(suites[1].check_runs.is_empty());
    }

    #[test]
    fn pull_request_info_rejects_bad_head_sha() {
        let mut json = pull_request_json();
        json["data"]["repository"]["pullRequest"]["headRefOid"] = json!("not-a-sha");

        let response: GraphQlResponse<PullRequestInfoData> = serde_json::from_value(json).unwrap();
        let raw = unwrap_graphql(response)
            .unwrap()
            .repository
            .unwrap()
            .pull_request
            .unwrap();

        assert!(into_pull_request_info(raw).is_err());
    }

    #[test]
    fn graphql_errors_without_data_are_reported() {
        let response: GraphQlResponse<PullRequestInfoData> = serde_json::from_value(json!({
            "data": null,
            "errors": [{ "message": "Could not resolve to a Repository" }]
        }))
        .unwrap();

        let err = unwrap_graphql(response).unwrap_err();
        assert!(err.message.contains("Could not resolve to a Repository"));
    }

    #[test]
    fn associated_pull_requests_flatten() {
        let data: AssociatedData = serde_json::from_value(json!({
            "repository": {
                "ref": {
                    "associatedPullRequests": {
                        "nodes": [
                            { "number": 3, "repository": { "name": "repo", "owner": { "login": "owner" } } },
                            { "number": 5, "repository": { "name": "repo", "owner": { "login": "owner" } } }
                        ]
                    }
                }
            }
        }))
        .unwrap();

        let refs = into_pull_request_refs(data);
        let repo = RepoId::new("owner", "repo");
        assert_eq!(
            refs,
            vec![PullRequestRef::new(&repo, 3), PullRequestRef::new(&repo, 5)]
        );
    }

    #[test]
    fn associated_pull_requests_missing_ref_is_empty() {
        let data: AssociatedData =
            serde_json::from_value(json!({ "repository": { "ref": null } })).unwrap();
        assert!(into_pull_request_refs(data).is_empty());
    }

    #[test]
    fn create_request_shape() {
        let request = CreateCheckRunRequest {
            name: "auto-merge",
            head_sha: "abc",
            status: CHECK_STATUS,
            conclusion: CHECK_CONCLUSION,
            completed_at: Utc::now(),
            output: CheckRunOutputBody {
                title: "t",
                summary: "s",
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["status"], "completed");
        assert_eq!(json["conclusion"], "neutral");
        assert_eq!(json["output"]["title"], "t");
        assert!(json["completed_at"].is_string());
    }
}
