//! Webhook endpoint handler.
//!
//! Accepts GitHub webhook deliveries, validates signatures, and queues the
//! affected pull requests before returning 202 Accepted. The actual
//! processing happens asynchronously in per-repo workers.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{Instrument, debug, info, info_span, warn};

use super::AppState;
use crate::github::{GitHubApiError, InstallationAuth};
use crate::types::{DeliveryId, InstallationId, InvalidPullRequest, PullRequestRef, RepoId};
use crate::webhooks::{ParseError, Routing, parse_webhook, resolve_branches, route, verify_signature};
use crate::worker::WorkItem;

/// Header name for GitHub event type.
const HEADER_EVENT: &str = "x-github-event";
/// Header name for GitHub delivery ID.
const HEADER_DELIVERY: &str = "x-github-delivery";
/// Header name for GitHub signature.
const HEADER_SIGNATURE: &str = "x-hub-signature-256";

/// Errors that can occur when processing a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid payload: {0}")]
    Parse(#[from] ParseError),

    #[error("invalid pull request: {0}")]
    InvalidPullRequest(#[from] InvalidPullRequest),
}

impl IntoResponse for WebhookError {
    fn into_response(self) -> Response {
        let status = match &self {
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::MissingHeader(_)
            | WebhookError::Parse(_)
            | WebhookError::InvalidPullRequest(_) => StatusCode::BAD_REQUEST,
        };

        (status, self.to_string()).into_response()
    }
}

/// Webhook handler.
///
/// # Request
///
/// - Method: POST
/// - Required headers:
///   - `X-GitHub-Event`: Event type (e.g., "pull_request", "check_suite")
///   - `X-GitHub-Delivery`: Delivery ID, used for logging
///   - `X-Hub-Signature-256`: HMAC-SHA256 signature of the payload
/// - Body: JSON webhook payload
///
/// # Response
///
/// - 202 Accepted: pull requests queued, or the event was irrelevant
/// - 400 Bad Request: missing header or malformed payload
/// - 401 Unauthorized: invalid signature
pub async fn webhook_handler<A: InstallationAuth>(
    State(app_state): State<AppState<A>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), WebhookError> {
    let event_type = get_header(&headers, HEADER_EVENT)?;
    let signature_header = get_header(&headers, HEADER_SIGNATURE)?;
    let delivery_id = DeliveryId::new(get_header(&headers, HEADER_DELIVERY)?);

    debug!(
        delivery_id = %delivery_id,
        event_type = %event_type,
        "Received webhook"
    );

    // Verify signature before any parsing.
    if !verify_signature(&body, &signature_header, app_state.webhook_secret()) {
        warn!(delivery_id = %delivery_id, "Invalid webhook signature");
        return Err(WebhookError::InvalidSignature);
    }

    let Some(event) = parse_webhook(&event_type, &body)? else {
        debug!(delivery_id = %delivery_id, event_type = %event_type, "Ignoring event");
        return Ok((StatusCode::ACCEPTED, "Ignored"));
    };

    match route(&event, app_state.app_id()) {
        Routing::Ignore => Ok((StatusCode::ACCEPTED, "Ignored")),

        Routing::PullRequests {
            installation,
            pull_requests,
        } => {
            // All or nothing: a rejected delivery must not leave work queued.
            for pull_request in &pull_requests {
                if let Err(e) = pull_request.validate() {
                    warn!(
                        delivery_id = %delivery_id,
                        pr = %pull_request,
                        error = %e,
                        "Rejecting delivery"
                    );
                    return Err(e.into());
                }
            }

            for pull_request in pull_requests {
                info!(
                    delivery_id = %delivery_id,
                    event_type = %event_type,
                    pr = %pull_request,
                    "Queueing pull request"
                );
                app_state
                    .workers()
                    .queue(WorkItem::new(installation, pull_request))?;
            }
            Ok((StatusCode::ACCEPTED, "Accepted"))
        }

        Routing::Branches {
            installation,
            repo,
            branches,
        } => {
            // Branch lookups need an authenticated client, so they happen
            // after the delivery is acknowledged.
            let span = info_span!("resolve_branches", delivery_id = %delivery_id, repo = %repo);
            tokio::spawn(
                queue_branches(app_state, installation, repo, branches).instrument(span),
            );
            Ok((StatusCode::ACCEPTED, "Accepted"))
        }
    }
}

/// Looks up the open pull requests for `branches` and queues each of them.
async fn queue_branches<A: InstallationAuth>(
    app_state: AppState<A>,
    installation: InstallationId,
    repo: RepoId,
    branches: Vec<String>,
) {
    let pull_requests = match lookup_branches(&app_state, installation, &repo, &branches).await {
        Ok(pull_requests) => pull_requests,
        Err(e) => {
            warn!(error = %e, "Failed to resolve branches to pull requests");
            return;
        }
    };

    for pull_request in pull_requests {
        info!(pr = %pull_request, "Queueing pull request");
        if let Err(e) = app_state
            .workers()
            .queue(WorkItem::new(installation, pull_request))
        {
            warn!(error = %e, "Skipping invalid pull request");
        }
    }
}

async fn lookup_branches<A: InstallationAuth>(
    app_state: &AppState<A>,
    installation: InstallationId,
    repo: &RepoId,
    branches: &[String],
) -> Result<Vec<PullRequestRef>, GitHubApiError> {
    let github = app_state.auth().authenticate(installation, repo).await?;
    resolve_branches(&github, branches).await
}

/// Extracts a required header value as a string.
fn get_header(headers: &HeaderMap, name: &'static str) -> Result<String, WebhookError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .ok_or(WebhookError::MissingHeader(name))
}
