//! GitHub App authentication.
//!
//! Webhooks tell us which installation they came from; every worker context
//! exchanges that installation ID for an installation-scoped client the first
//! time it needs to talk to GitHub.

use std::future::Future;
use std::path::Path;

use jsonwebtoken::EncodingKey;
use octocrab::Octocrab;
use thiserror::Error;
use tracing::debug;

use crate::effects::GitHubInterpreter;
use crate::types::{AppId, InstallationId, RepoId};

use super::client::OctocrabClient;
use super::error::GitHubApiError;

/// Produces repository-scoped GitHub clients for an installation.
///
/// The server holds one implementation; tests substitute a mock that hands
/// out recording interpreters.
pub trait InstallationAuth: Send + Sync + 'static {
    type Client: GitHubInterpreter + Clone + Send + Sync + 'static;

    /// Obtains a client authenticated as `installation`, scoped to `repo`.
    fn authenticate(
        &self,
        installation: InstallationId,
        repo: &RepoId,
    ) -> impl Future<Output = Result<Self::Client, GitHubApiError>> + Send;
}

/// Errors loading the app's private key.
#[derive(Debug, Error)]
pub enum PrivateKeyError {
    #[error("failed to read private key {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("private key {path} is not a valid RSA PEM key")]
    Parse {
        path: String,
        #[source]
        source: jsonwebtoken::errors::Error,
    },
}

/// Reads an RSA private key in PEM format, as downloaded from the app's
/// settings page.
pub fn load_private_key(path: &Path) -> Result<EncodingKey, PrivateKeyError> {
    let display = path.display().to_string();
    let pem = std::fs::read(path).map_err(|source| PrivateKeyError::Read {
        path: display.clone(),
        source,
    })?;
    EncodingKey::from_rsa_pem(&pem).map_err(|source| PrivateKeyError::Parse {
        path: display,
        source,
    })
}

/// Authenticates as a GitHub App, then as one of its installations.
#[derive(Clone)]
pub struct GitHubAppAuth {
    app: Octocrab,
    app_id: AppId,
}

impl GitHubAppAuth {
    /// Builds an app-authenticated client from the app ID and its key.
    pub fn new(app_id: AppId, key: EncodingKey) -> Result<Self, GitHubApiError> {
        let app = Octocrab::builder()
            .app(octocrab::models::AppId(app_id.0), key)
            .build()
            .map_err(GitHubApiError::from_octocrab)?;
        Ok(Self { app, app_id })
    }

    pub fn app_id(&self) -> AppId {
        self.app_id
    }
}

impl std::fmt::Debug for GitHubAppAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubAppAuth")
            .field("app_id", &self.app_id)
            .finish_non_exhaustive()
    }
}

impl InstallationAuth for GitHubAppAuth {
    type Client = OctocrabClient;

    async fn authenticate(
        &self,
        installation: InstallationId,
        repo: &RepoId,
    ) -> Result<OctocrabClient, GitHubApiError> {
        debug!(installation = %installation, repo = %repo, "Requesting installation token");

        let (client, _token) = self
            .app
            .installation_and_token(octocrab::models::InstallationId(installation.0))
            .await
            .map_err(GitHubApiError::from_octocrab)?;

        Ok(OctocrabClient::new(client, repo.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_key_file_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let Err(err) = load_private_key(&dir.path().join("absent.pem")) else {
            panic!("loading a missing key file succeeded");
        };
        assert!(matches!(err, PrivateKeyError::Read { .. }));
    }

    #[test]
    fn garbage_key_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not a key").unwrap();

        let Err(err) = load_private_key(file.path()) else {
            panic!("loading a garbage key succeeded");
        };
        assert!(matches!(err, PrivateKeyError::Parse { .. }));
        assert!(err.to_string().contains("not a valid RSA PEM key"));
    }
}
