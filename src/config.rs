//! Per-repository configuration.
//!
//! Each repository may commit a TOML file (by default
//! `.github/auto-merge.toml`) on its default branch. A repository without the
//! file gets the defaults below, which keep the bot silent: no status check is
//! published unless `report_status = true`.
//!
//! ```toml
//! report_status = true
//! min_approvals = 2
//! required_labels = ["automerge"]
//! blocking_labels = ["do not merge", "wip"]
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::github::GitHubApiError;

/// Default location of the configuration file within a repository.
pub const DEFAULT_CONFIG_PATH: &str = ".github/auto-merge.toml";

/// Resolved configuration for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RepoConfig {
    /// Whether to publish the status check at all. When false, an existing
    /// check run is still kept up to date but none is created.
    pub report_status: bool,

    /// Approving reviews needed, counting only each reviewer's latest review.
    pub min_approvals: usize,

    /// Outstanding "changes requested" reviews tolerated.
    pub max_requested_changes: usize,

    /// Labels that must all be present.
    pub required_labels: Vec<String>,

    /// Labels of which none may be present.
    pub blocking_labels: Vec<String>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        RepoConfig {
            report_status: false,
            min_approvals: 1,
            max_requested_changes: 0,
            required_labels: Vec::new(),
            blocking_labels: Vec::new(),
        }
    }
}

/// Errors resolving a repository's configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to fetch {path}")]
    Fetch {
        path: String,
        #[source]
        source: GitHubApiError,
    },

    #[error("invalid configuration in {path}")]
    Invalid {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

impl RepoConfig {
    /// Parses a configuration file body.
    pub fn from_toml(body: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(body)
    }

    /// Fetches and parses the configuration file at `path`.
    ///
    /// A missing file resolves to [`RepoConfig::default`].
    pub async fn load<G: GitHubInterpreter>(github: &G, path: &str) -> Result<Self, ConfigError> {
        let response = github
            .interpret(GitHubEffect::GetFileContents {
                path: path.to_string(),
            })
            .await
            .map_err(|source| ConfigError::Fetch {
                path: path.to_string(),
                source,
            })?;

        match response {
            GitHubResponse::FileContents(Some(body)) => {
                Self::from_toml(&body).map_err(|source| ConfigError::Invalid {
                    path: path.to_string(),
                    source,
                })
            }
            GitHubResponse::FileContents(None) => {
                debug!(path, "No configuration file, using defaults");
                Ok(Self::default())
            }
            other => Err(ConfigError::Fetch {
                path: path.to_string(),
                source: GitHubApiError::unexpected_response("file_contents", other.kind()),
            }),
        }
    }
}
