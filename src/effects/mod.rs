//! Effects-as-data for GitHub operations.
//!
//! Core logic (the status report reconciler in particular) decides which
//! effect to run as a plain value, which keeps the decision testable without
//! I/O and lets every remote call be logged before it happens.

pub mod github;
pub mod interpreter;

pub use github::{CheckRunOutput, GitHubEffect, GitHubResponse};
pub use interpreter::GitHubInterpreter;
