//! HTTP server for the auto-merge bot.
//!
//! This module implements the HTTP server that:
//! - Accepts webhooks from GitHub and validates their signatures
//! - Queues the affected pull requests on their repository's worker
//! - Provides health checks for liveness probes
//!
//! # Endpoints
//!
//! - `POST /webhook` - Accepts GitHub webhook deliveries (returns 202 Accepted)
//! - `GET /health` - Returns 200 if server is running

use std::sync::Arc;

use crate::github::InstallationAuth;
use crate::types::AppId;
use crate::worker::{PullRequestProcessor, RepositoryWorkers, TracingReporter};

pub mod health;
pub mod webhook;

pub use health::health_handler;
pub use webhook::webhook_handler;

/// The worker pool the server feeds.
pub type Workers<A> = RepositoryWorkers<PullRequestProcessor<A>, TracingReporter>;

/// Shared application state.
///
/// This is passed to all handlers via Axum's `State` extractor.
pub struct AppState<A: InstallationAuth> {
    inner: Arc<AppStateInner<A>>,
}

struct AppStateInner<A: InstallationAuth> {
    /// Webhook secret for HMAC-SHA256 signature verification.
    webhook_secret: Vec<u8>,

    /// This app's id, used to recognise its own check runs.
    app_id: AppId,

    /// Used to look up pull requests for status events.
    auth: Arc<A>,

    workers: Workers<A>,
}

impl<A: InstallationAuth> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: InstallationAuth> AppState<A> {
    pub fn new(
        webhook_secret: impl Into<Vec<u8>>,
        app_id: AppId,
        auth: Arc<A>,
        workers: Workers<A>,
    ) -> Self {
        AppState {
            inner: Arc::new(AppStateInner {
                webhook_secret: webhook_secret.into(),
                app_id,
                auth,
                workers,
            }),
        }
    }

    pub fn webhook_secret(&self) -> &[u8] {
        &self.inner.webhook_secret
    }

    pub fn app_id(&self) -> AppId {
        self.inner.app_id
    }

    pub fn auth(&self) -> &Arc<A> {
        &self.inner.auth
    }

    pub fn workers(&self) -> &Workers<A> {
        &self.inner.workers
    }
}

/// Builds the axum Router with all endpoints.
pub fn build_router<A: InstallationAuth>(app_state: AppState<A>) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/webhook", post(webhook_handler::<A>))
        .route("/health", get(health_handler))
        .with_state(app_state)
}

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::DEFAULT_CONFIG_PATH;
    use crate::effects::{GitHubEffect, GitHubResponse};
    use crate::test_utils::{MockAuth, MockGitHub, OWN_APP, pr_ref, pull_request, repo};
    use crate::webhooks::signature::sign;
    use crate::worker::WorkerContextFactory;

    const SECRET: &[u8] = b"test-secret";

    fn test_app_state(auth: &Arc<MockAuth>) -> AppState<MockAuth> {
        let factory =
            WorkerContextFactory::new(Arc::clone(auth), OWN_APP, "auto-merge", DEFAULT_CONFIG_PATH);
        let workers = RepositoryWorkers::new(PullRequestProcessor::new(factory), TracingReporter);
        AppState::new(SECRET, OWN_APP, Arc::clone(auth), workers)
    }

    /// A repository that reports status for pull request `number`.
    fn reporting_github(auth: &MockAuth, number: u64) -> MockGitHub {
        let github = auth.github(&repo());
        github.respond_config(DEFAULT_CONFIG_PATH, Some("report_status = true"));
        github.respond_pull_request(pull_request(number));
        github
    }

    fn repository() -> serde_json::Value {
        serde_json::json!({
            "name": "repo",
            "owner": { "login": "owner" },
            "default_branch": "main"
        })
    }

    /// Creates a webhook request signed with `secret`.
    fn create_webhook_request(
        secret: &[u8],
        event_type: &str,
        body: &serde_json::Value,
    ) -> Request<Body> {
        let body_bytes = serde_json::to_vec(body).unwrap();

        Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("content-type", "application/json")
            .header("x-github-event", event_type)
            .header("x-github-delivery", "550e8400-e29b-41d4-a716-446655440000")
            .header("x-hub-signature-256", sign(&body_bytes, secret))
            .body(Body::from(body_bytes))
            .unwrap()
    }

    fn opened(number: u64) -> serde_json::Value {
        serde_json::json!({
            "action": "opened",
            "number": number,
            "pull_request": { "number": number },
            "repository": repository(),
            "installation": { "id": 7 }
        })
    }

    async fn wait_for_writes(github: &MockGitHub, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while github.check_run_writes().len() < count {
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
        .await
        .expect("check run not written within 5s");
    }

    async fn body_text(response: axum::response::Response) -> String {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn health_returns_200() {
        let app = build_router(test_app_state(&Arc::new(MockAuth::new())));

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn pull_request_event_is_processed() {
        let auth = Arc::new(MockAuth::new());
        let github = reporting_github(&auth, 3);
        let app = build_router(test_app_state(&auth));

        let response = app
            .oneshot(create_webhook_request(SECRET, "pull_request", &opened(3)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_text(response).await, "Accepted");

        wait_for_writes(&github, 1).await;
        assert!(matches!(
            github.check_run_writes()[0],
            GitHubEffect::CreateCheckRun { .. }
        ));
    }

    #[tokio::test]
    async fn invalid_signature_returns_401() {
        let auth = Arc::new(MockAuth::new());
        let state = test_app_state(&auth);
        let app = build_router(state.clone());

        let response = app
            .oneshot(create_webhook_request(b"wrong-secret", "pull_request", &opened(3)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(state.workers().active_repositories(), 0);
        assert_eq!(auth.authentications(), 0);
    }

    #[tokio::test]
    async fn missing_event_header_returns_400() {
        let app = build_router(test_app_state(&Arc::new(MockAuth::new())));

        let body_bytes = serde_json::to_vec(&opened(3)).unwrap();
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header("x-hub-signature-256", sign(&body_bytes, SECRET))
            .body(Body::from(body_bytes))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_installation_returns_400() {
        let app = build_router(test_app_state(&Arc::new(MockAuth::new())));

        let body = serde_json::json!({
            "action": "opened",
            "pull_request": { "number": 3 },
            "repository": repository()
        });
        let response = app
            .oneshot(create_webhook_request(SECRET, "pull_request", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn irrelevant_event_is_ignored() {
        let auth = Arc::new(MockAuth::new());
        let state = test_app_state(&auth);
        let app = build_router(state.clone());

        let body = serde_json::json!({
            "action": "closed",
            "pull_request": { "number": 3 },
            "repository": repository(),
            "installation": { "id": 7 }
        });
        let response = app
            .oneshot(create_webhook_request(SECRET, "pull_request", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(body_text(response).await, "Ignored");
        assert_eq!(state.workers().active_repositories(), 0);
    }

    fn check_suite_completed(numbers: &[u64]) -> serde_json::Value {
        let pull_requests: Vec<_> = numbers
            .iter()
            .map(|n| serde_json::json!({ "number": n }))
            .collect();
        serde_json::json!({
            "action": "completed",
            "check_suite": { "pull_requests": pull_requests },
            "repository": repository(),
            "installation": { "id": 7 }
        })
    }

    #[tokio::test]
    async fn delivery_with_invalid_pull_request_queues_nothing() {
        let auth = Arc::new(MockAuth::new());
        let github = reporting_github(&auth, 1);
        let state = test_app_state(&auth);
        let app = build_router(state.clone());

        let response = app
            .oneshot(create_webhook_request(
                SECRET,
                "check_suite",
                &check_suite_completed(&[1, 0]),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.workers().active_repositories(), 0);

        // Give a wrongly spawned drain task the chance to run.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(auth.authentications(), 0);
        assert!(github.check_run_writes().is_empty());
    }

    #[tokio::test]
    async fn check_suite_queues_every_pull_request() {
        let auth = Arc::new(MockAuth::new());
        let github = reporting_github(&auth, 1);
        github.respond_pull_request(pull_request(2));
        let app = build_router(test_app_state(&auth));

        let response = app
            .oneshot(create_webhook_request(
                SECRET,
                "check_suite",
                &check_suite_completed(&[1, 2]),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        wait_for_writes(&github, 2).await;
    }

    #[tokio::test]
    async fn status_event_resolves_branches() {
        let auth = Arc::new(MockAuth::new());
        let github = reporting_github(&auth, 4);
        github.respond(
            GitHubEffect::ListAssociatedPullRequests {
                branch: "feature".to_string(),
            },
            GitHubResponse::PullRequests(vec![pr_ref(4)]),
        );
        let app = build_router(test_app_state(&auth));

        let body = serde_json::json!({
            "sha": "c".repeat(40),
            "state": "success",
            "branches": [{ "name": "main" }, { "name": "feature" }],
            "repository": repository(),
            "installation": { "id": 7 }
        });
        let response = app
            .oneshot(create_webhook_request(SECRET, "status", &body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        wait_for_writes(&github, 1).await;

        let lookups: Vec<_> = github
            .effects()
            .into_iter()
            .filter(|e| matches!(e, GitHubEffect::ListAssociatedPullRequests { .. }))
            .collect();
        assert_eq!(
            lookups,
            vec![GitHubEffect::ListAssociatedPullRequests {
                branch: "feature".to_string()
            }]
        );
    }
}
