//! GitHub API client, app authentication and effect interpreter.
//!
//! This module provides the implementation for executing GitHub effects via the octocrab
//! library. It implements the `GitHubInterpreter` trait defined in the effects module.
//!
//! Key features:
//! - GitHub App → installation token exchange
//! - Distinguishes transient vs permanent errors for reporting
//! - GraphQL for pull request snapshots and branch → PR resolution

mod auth;
mod client;
mod error;
mod interpreter;

pub use auth::{GitHubAppAuth, InstallationAuth, PrivateKeyError, load_private_key};
pub use client::OctocrabClient;
pub use error::{GitHubApiError, GitHubErrorKind};
