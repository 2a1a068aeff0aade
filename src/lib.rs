//! Auto-merge bot - a GitHub App that reports whether pull requests are ready
//! to merge.
//!
//! Webhook deliveries are mapped to the pull requests they affect and queued
//! per repository. Each queued pull request is re-read from GitHub, checked
//! against the repository's merge conditions, and summarized in a single
//! check run owned by the app.

pub mod config;
pub mod effects;
pub mod github;
pub mod server;
pub mod status;
pub mod types;
pub mod webhooks;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_utils;
