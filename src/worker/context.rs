//! Per-work-item context: client, logger span and repository configuration.
//!
//! A `WorkerContext` lives exactly as long as one work item's processing. It
//! is never shared between items, so the memoized client inside it can't leak
//! one installation's token into another item's work.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{Span, info_span};

use crate::config::{ConfigError, RepoConfig};
use crate::github::{GitHubApiError, InstallationAuth};
use crate::types::{AppId, InstallationId, PullRequestRef, RepoId};

/// Errors building a worker context. Either one fails the whole work item.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to authenticate installation {installation}")]
    Authentication {
        installation: InstallationId,
        #[source]
        source: GitHubApiError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Everything one work item needs to talk to GitHub on behalf of an
/// installation.
pub struct WorkerContext<A: InstallationAuth> {
    auth: Arc<A>,
    installation: InstallationId,
    pull_request: PullRequestRef,
    github: OnceCell<A::Client>,
    span: Span,
    config: RepoConfig,
    app_id: AppId,
    check_name: String,
}

impl<A: InstallationAuth> WorkerContext<A> {
    /// The installation client, authenticated on first use and reused after.
    pub async fn github(&self) -> Result<&A::Client, GitHubApiError> {
        let repo = self.pull_request.repo_id();
        self.github
            .get_or_try_init(|| self.auth.authenticate(self.installation, &repo))
            .await
    }

    pub fn installation(&self) -> InstallationId {
        self.installation
    }

    pub fn pull_request(&self) -> &PullRequestRef {
        &self.pull_request
    }

    pub fn repo(&self) -> RepoId {
        self.pull_request.repo_id()
    }

    /// Span carrying `owner`, `repo` and `pr` for everything this item logs.
    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// This app's identity, used to recognise its own check suites.
    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    pub fn check_name(&self) -> &str {
        &self.check_name
    }
}

impl<A: InstallationAuth> std::fmt::Debug for WorkerContext<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerContext")
            .field("installation", &self.installation)
            .field("pull_request", &self.pull_request)
            .field("authenticated", &self.github.initialized())
            .field("config", &self.config)
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}

/// Builds a fresh [`WorkerContext`] for each work item.
pub struct WorkerContextFactory<A> {
    auth: Arc<A>,
    app_id: AppId,
    check_name: String,
    config_path: String,
}

impl<A> Clone for WorkerContextFactory<A> {
    fn clone(&self) -> Self {
        Self {
            auth: Arc::clone(&self.auth),
            app_id: self.app_id,
            check_name: self.check_name.clone(),
            config_path: self.config_path.clone(),
        }
    }
}

impl<A: InstallationAuth> WorkerContextFactory<A> {
    pub fn new(
        auth: Arc<A>,
        app_id: AppId,
        check_name: impl Into<String>,
        config_path: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            app_id,
            check_name: check_name.into(),
            config_path: config_path.into(),
        }
    }

    pub fn app_id(&self) -> AppId {
        self.app_id
    }

    /// Authenticates for `installation` and resolves the repository's
    /// configuration. The client obtained here is memoized in the context.
    pub async fn build(
        &self,
        installation: InstallationId,
        pull_request: &PullRequestRef,
    ) -> Result<WorkerContext<A>, ContextError> {
        let span = info_span!(
            "work_item",
            owner = %pull_request.owner,
            repo = %pull_request.repo,
            pr = %pull_request.number,
        );

        let repo = pull_request.repo_id();
        let github = OnceCell::new();
        let client = github
            .get_or_try_init(|| self.auth.authenticate(installation, &repo))
            .await
            .map_err(|source| ContextError::Authentication {
                installation,
                source,
            })?;
        let config = RepoConfig::load(client, &self.config_path).await?;

        Ok(WorkerContext {
            auth: Arc::clone(&self.auth),
            installation,
            pull_request: pull_request.clone(),
            github,
            span,
            config,
            app_id: self.app_id,
            check_name: self.check_name.clone(),
        })
    }
}
