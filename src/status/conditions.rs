//! Merge condition evaluation.
//!
//! Each condition looks at one aspect of a pull request snapshot and either
//! passes or fails with a human-readable reason. Evaluation is pure; the
//! outcomes feed the status check's title and summary.

use std::collections::HashMap;
use std::fmt;

use crate::config::RepoConfig;
use crate::types::{AppId, CheckStatus, PullRequestInfo, PullRequestState, ReviewState};

/// The conditions, in the order they are evaluated and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    Open,
    NotDraft,
    MinApprovals,
    RequestedChanges,
    RequiredLabels,
    BlockingLabels,
    Checks,
}

impl Condition {
    pub const ALL: [Condition; 7] = [
        Condition::Open,
        Condition::NotDraft,
        Condition::MinApprovals,
        Condition::RequestedChanges,
        Condition::RequiredLabels,
        Condition::BlockingLabels,
        Condition::Checks,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Condition::Open => "open",
            Condition::NotDraft => "not_draft",
            Condition::MinApprovals => "min_approvals",
            Condition::RequestedChanges => "requested_changes",
            Condition::RequiredLabels => "required_labels",
            Condition::BlockingLabels => "blocking_labels",
            Condition::Checks => "checks",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionResult {
    Pass,
    Fail { reason: String },
}

impl ConditionResult {
    fn fail(reason: impl Into<String>) -> Self {
        ConditionResult::Fail {
            reason: reason.into(),
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, ConditionResult::Pass)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionOutcome {
    pub condition: Condition,
    pub result: ConditionResult,
}

/// Evaluates every condition against `info`.
///
/// `own_app` is excluded from the checks condition: the bot's own check run
/// must not gate itself.
pub fn evaluate(info: &PullRequestInfo, config: &RepoConfig, own_app: AppId) -> Vec<ConditionOutcome> {
    Condition::ALL
        .iter()
        .map(|&condition| ConditionOutcome {
            condition,
            result: evaluate_one(condition, info, config, own_app),
        })
        .collect()
}

/// Number of failed conditions in `outcomes`.
pub fn failure_count(outcomes: &[ConditionOutcome]) -> usize {
    outcomes.iter().filter(|o| !o.result.is_pass()).count()
}

fn evaluate_one(
    condition: Condition,
    info: &PullRequestInfo,
    config: &RepoConfig,
    own_app: AppId,
) -> ConditionResult {
    match condition {
        Condition::Open => match info.state {
            PullRequestState::Open => ConditionResult::Pass,
            PullRequestState::Closed => ConditionResult::fail("pull request is closed"),
            PullRequestState::Merged => ConditionResult::fail("pull request is already merged"),
        },
        Condition::NotDraft => {
            if info.is_draft {
                ConditionResult::fail("pull request is a draft")
            } else {
                ConditionResult::Pass
            }
        }
        Condition::MinApprovals => {
            let approvals = count_latest(info, ReviewState::Approved);
            if approvals >= config.min_approvals {
                ConditionResult::Pass
            } else {
                ConditionResult::fail(format!(
                    "{} of {} required approvals",
                    approvals, config.min_approvals
                ))
            }
        }
        Condition::RequestedChanges => {
            let requested = count_latest(info, ReviewState::ChangesRequested);
            if requested <= config.max_requested_changes {
                ConditionResult::Pass
            } else {
                ConditionResult::fail(format!(
                    "{} reviewer(s) requested changes, at most {} allowed",
                    requested, config.max_requested_changes
                ))
            }
        }
        Condition::RequiredLabels => {
            let missing: Vec<&str> = config
                .required_labels
                .iter()
                .filter(|required| !has_label(info, required))
                .map(String::as_str)
                .collect();
            if missing.is_empty() {
                ConditionResult::Pass
            } else {
                ConditionResult::fail(format!("missing labels: {}", missing.join(", ")))
            }
        }
        Condition::BlockingLabels => {
            let present: Vec<&str> = config
                .blocking_labels
                .iter()
                .filter(|blocking| has_label(info, blocking))
                .map(String::as_str)
                .collect();
            if present.is_empty() {
                ConditionResult::Pass
            } else {
                ConditionResult::fail(format!("blocking labels: {}", present.join(", ")))
            }
        }
        Condition::Checks => evaluate_checks(info, own_app),
    }
}

fn has_label(info: &PullRequestInfo, wanted: &str) -> bool {
    info.labels.iter().any(|l| l.eq_ignore_ascii_case(wanted))
}

/// Counts reviewers whose latest decisive review is in `state`.
///
/// Comments and pending reviews don't replace an earlier approval or change
/// request; a dismissal clears it. Reviews from deleted accounts are ignored.
fn count_latest(info: &PullRequestInfo, state: ReviewState) -> usize {
    let mut latest: HashMap<&str, ReviewState> = HashMap::new();
    for review in &info.reviews {
        let Some(author) = review.author.as_deref() else {
            continue;
        };
        match review.state {
            ReviewState::Approved | ReviewState::ChangesRequested | ReviewState::Dismissed => {
                latest.insert(author, review.state);
            }
            ReviewState::Commented | ReviewState::Pending | ReviewState::Other => {}
        }
    }
    latest.values().filter(|&&s| s == state).count()
}

/// All other apps' check suites must be completed with a passing conclusion.
///
/// Suites without any check runs are ignored: GitHub creates an empty suite
/// for every installed app on each push, and most never report.
fn evaluate_checks(info: &PullRequestInfo, own_app: AppId) -> ConditionResult {
    let mut pending = Vec::new();
    let mut failing = Vec::new();

    for suite in info.check_suites() {
        if suite.app_id == Some(own_app) || suite.check_runs.is_empty() {
            continue;
        }
        let name = suite.app_name.as_deref().unwrap_or("unknown app");
        if suite.status != CheckStatus::Completed {
            pending.push(name);
        } else if !suite.conclusion.is_some_and(|c| c.is_passing()) {
            failing.push(name);
        }
    }

    match (failing.is_empty(), pending.is_empty()) {
        (true, true) => ConditionResult::Pass,
        (false, _) => ConditionResult::fail(format!("failing checks: {}", failing.join(", "))),
        (true, false) => ConditionResult::fail(format!("pending checks: {}", pending.join(", "))),
    }
}
