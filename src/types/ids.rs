//! Newtype wrappers for domain identifiers.
//!
//! These types keep GitHub's many numeric IDs apart (an installation ID is not
//! an app ID is not a check run ID) and make signatures self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A pull request number within a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrNumber(pub u64);

impl fmt::Display for PrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for PrNumber {
    fn from(n: u64) -> Self {
        PrNumber(n)
    }
}

/// A git commit SHA (40 hex characters).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sha(String);

/// Returned when a string is not a 40-character hex SHA.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid commit SHA: {0:?}")]
pub struct InvalidSha(pub String);

impl Sha {
    /// Parses a full-length hex SHA, normalising to lowercase.
    pub fn parse(s: impl AsRef<str>) -> Result<Self, InvalidSha> {
        let s = s.as_ref();
        if s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Sha(s.to_ascii_lowercase()))
        } else {
            Err(InvalidSha(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a short (7-character) version of the SHA for display.
    pub fn short(&self) -> &str {
        self.0.get(..7).unwrap_or(&self.0)
    }
}

impl fmt::Display for Sha {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A repository identifier (owner/repo format).
///
/// This is the serialization key of the work queue: two work items with equal
/// `RepoId`s never run concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        RepoId {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Why a [`PullRequestRef`] was refused by the work queue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidPullRequest {
    #[error("pull request reference has an empty owner")]
    EmptyOwner,

    #[error("pull request reference has an empty repository name")]
    EmptyRepo,

    #[error("pull request number must be positive")]
    ZeroNumber,
}

/// A reference to one pull request: the unit of queued work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: PrNumber,
}

impl PullRequestRef {
    pub fn new(repo: &RepoId, number: impl Into<PrNumber>) -> Self {
        PullRequestRef {
            owner: repo.owner.clone(),
            repo: repo.repo.clone(),
            number: number.into(),
        }
    }

    /// The queue key this pull request serializes under.
    pub fn repo_id(&self) -> RepoId {
        RepoId::new(&self.owner, &self.repo)
    }

    /// Checks the constraints the work queue places on its input.
    pub fn validate(&self) -> Result<(), InvalidPullRequest> {
        if self.owner.is_empty() {
            return Err(InvalidPullRequest::EmptyOwner);
        }
        if self.repo.is_empty() {
            return Err(InvalidPullRequest::EmptyRepo);
        }
        if self.number.0 == 0 {
            return Err(InvalidPullRequest::ZeroNumber);
        }
        Ok(())
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}{}", self.owner, self.repo, self.number)
    }
}

/// A GitHub App installation ID, carried by every webhook delivered to the app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstallationId(pub u64);

impl fmt::Display for InstallationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A GitHub App ID. Check suites are owned by exactly one app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(pub u64);

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A check run's database ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckRunId(pub u64);

impl fmt::Display for CheckRunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A GitHub webhook delivery ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(pub String);

impl DeliveryId {
    pub fn new(s: impl Into<String>) -> Self {
        DeliveryId(s.into())
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    mod sha {
        use super::*;

        proptest! {
            #[test]
            fn parse_accepts_hex(s in "[0-9a-fA-F]{40}") {
                let sha = Sha::parse(&s).unwrap();
                prop_assert_eq!(sha.as_str(), s.to_ascii_lowercase());
                prop_assert_eq!(sha.short().len(), 7);
            }

            #[test]
            fn parse_rejects_wrong_length(s in "[0-9a-f]{0,39}") {
                prop_assert!(Sha::parse(&s).is_err());
            }
        }

        #[test]
        fn parse_rejects_non_hex() {
            let bad = "g".repeat(40);
            assert_eq!(Sha::parse(&bad), Err(InvalidSha(bad.clone())));
        }
    }

    mod pull_request_ref {
        use super::*;

        proptest! {
            #[test]
            fn valid_refs_pass(
                owner in "[a-zA-Z][a-zA-Z0-9-]{0,38}",
                repo in "[a-zA-Z][a-zA-Z0-9_.-]{0,99}",
                number in 1u64..
            ) {
                let pr = PullRequestRef::new(&RepoId::new(&owner, &repo), number);
                prop_assert!(pr.validate().is_ok());
                prop_assert_eq!(pr.repo_id(), RepoId::new(owner, repo));
            }
        }

        #[test]
        fn empty_owner_rejected() {
            let pr = PullRequestRef::new(&RepoId::new("", "repo"), 1);
            assert_eq!(pr.validate(), Err(InvalidPullRequest::EmptyOwner));
        }

        #[test]
        fn empty_repo_rejected() {
            let pr = PullRequestRef::new(&RepoId::new("owner", ""), 1);
            assert_eq!(pr.validate(), Err(InvalidPullRequest::EmptyRepo));
        }

        #[test]
        fn zero_number_rejected() {
            let pr = PullRequestRef::new(&RepoId::new("owner", "repo"), 0);
            assert_eq!(pr.validate(), Err(InvalidPullRequest::ZeroNumber));
        }

        #[test]
        fn display_format() {
            let pr = PullRequestRef::new(&RepoId::new("octocat", "hello-world"), 42);
            assert_eq!(pr.to_string(), "octocat/hello-world#42");
        }
    }
}
