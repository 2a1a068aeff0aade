//! The bot's status check: condition evaluation, formatting and
//! reconciliation against what GitHub currently shows.
//!
//! Per pull request the flow is: evaluate conditions against a fresh
//! snapshot, format a title and Markdown summary, then let the reconciler
//! create, update or leave alone the single check run this app owns.

pub mod conditions;
pub mod format;
pub mod reconcile;

pub use conditions::{Condition, ConditionOutcome, ConditionResult, evaluate, failure_count};
pub use format::{READY_TITLE, format_summary, format_title};
pub use reconcile::{
    CheckSuiteState, ReconciliationDecision, apply, decide, reconcile, to_effect,
    update_status_report_check,
};
