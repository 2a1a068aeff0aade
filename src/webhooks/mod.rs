//! Webhook handling for GitHub events.
//!
//! This module provides:
//! - Signature verification for webhook payloads (HMAC-SHA256)
//! - Event parsing into typed events
//! - Routing of events to the pull requests they affect

pub mod events;
pub mod parser;
pub mod router;
pub mod signature;

pub use events::GitHubEvent;
pub use parser::{ParseError, parse_webhook};
pub use router::{Routing, resolve_branches, route};
pub use signature::{parse_signature_header, verify_signature};
