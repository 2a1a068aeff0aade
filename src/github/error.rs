//! GitHub API error types.
//!
//! Errors are categorized as transient or permanent. The bot never retries
//! (a failed work item is reported and the next event gets another chance),
//! so the category only feeds logs and error reports: a transient failure is
//! expected to heal on the next webhook, a permanent one needs a human.

use std::fmt;
use thiserror::Error;

/// The kind of GitHub API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GitHubErrorKind {
    /// Likely to succeed if attempted again later.
    ///
    /// Examples:
    /// - HTTP 5xx (server errors)
    /// - HTTP 429 (rate limited)
    /// - HTTP 403 with a rate limit message
    /// - Network timeouts
    Transient,

    /// Requires human intervention.
    ///
    /// Examples:
    /// - HTTP 4xx other than rate limits
    /// - Authentication failures (401, 403 non-rate-limit)
    /// - Responses the bot cannot interpret
    Permanent,
}

impl GitHubErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GitHubErrorKind::Transient => "transient",
            GitHubErrorKind::Permanent => "permanent",
        }
    }
}

/// A GitHub API error with categorization.
#[derive(Debug, Error)]
pub struct GitHubApiError {
    pub kind: GitHubErrorKind,

    /// The HTTP status code, if available.
    pub status_code: Option<u16>,

    pub message: String,

    /// The underlying octocrab error, if available.
    #[source]
    pub source: Option<octocrab::Error>,
}

impl fmt::Display for GitHubApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "GitHub API error (HTTP {}): {}", code, self.message),
            None => write!(f, "GitHub API error: {}", self.message),
        }
    }
}

impl GitHubApiError {
    /// Creates a permanent error without an octocrab source.
    pub fn permanent_without_source(message: impl Into<String>) -> Self {
        Self {
            kind: GitHubErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// An interpreter answered an effect with the wrong response variant.
    pub fn unexpected_response(expected: &str, got: &str) -> Self {
        Self::permanent_without_source(format!(
            "unexpected GitHub response: expected {}, got {}",
            expected, got
        ))
    }

    /// Categorizes an octocrab error.
    ///
    /// The categorization looks at the HTTP status first and falls back to
    /// well-known message patterns for errors that carry no status.
    pub fn from_octocrab(err: octocrab::Error) -> Self {
        let status_code = status_code_of(&err);
        let kind = classify(status_code, &err.to_string());
        // The full octocrab text stays reachable through `source`.
        let message = match &err {
            octocrab::Error::GitHub { source, .. } => source.message.clone(),
            _ => "request failed".to_string(),
        };

        Self {
            kind,
            status_code,
            message,
            source: Some(err),
        }
    }

    /// Returns true if GitHub answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status_code == Some(404)
    }
}

/// Extracts the HTTP status code GitHub answered with, if the error came from
/// an HTTP response at all.
fn status_code_of(err: &octocrab::Error) -> Option<u16> {
    match err {
        octocrab::Error::GitHub { source, .. } => Some(source.status_code.as_u16()),
        _ => None,
    }
}

fn classify(status_code: Option<u16>, message: &str) -> GitHubErrorKind {
    match status_code {
        Some(429) => GitHubErrorKind::Transient,
        Some(403) if is_rate_limit_error(message) => GitHubErrorKind::Transient,
        Some(code) if (500..600).contains(&code) => GitHubErrorKind::Transient,
        Some(_) => GitHubErrorKind::Permanent,
        None if is_network_error(message) => GitHubErrorKind::Transient,
        None => GitHubErrorKind::Permanent,
    }
}

/// Checks if an error message indicates a rate limit.
fn is_rate_limit_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("rate limit")
        || message_lower.contains("api rate")
        || message_lower.contains("secondary rate")
        || message_lower.contains("abuse detection")
}

/// Checks if an error message indicates a network-level error.
fn is_network_error(message: &str) -> bool {
    let message_lower = message.to_lowercase();
    message_lower.contains("timeout")
        || message_lower.contains("connection")
        || message_lower.contains("network")
        || message_lower.contains("dns")
        || message_lower.contains("timed out")
}
