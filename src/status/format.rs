//! Status check title and summary formatting.

use super::conditions::{ConditionOutcome, ConditionResult, failure_count};

pub const READY_TITLE: &str = "Ready to merge";

/// One-line verdict shown next to the check's name.
pub fn format_title(outcomes: &[ConditionOutcome]) -> String {
    match failure_count(outcomes) {
        0 => READY_TITLE.to_string(),
        1 => "1 condition not met".to_string(),
        n => format!("{} conditions not met", n),
    }
}

/// Markdown table with one row per condition.
pub fn format_summary(outcomes: &[ConditionOutcome]) -> String {
    let mut summary = String::from("| Condition | Result |\n| --- | --- |\n");
    for outcome in outcomes {
        let result = match &outcome.result {
            ConditionResult::Pass => "Pass".to_string(),
            ConditionResult::Fail { reason } => format!("Fail: {}", escape_cell(reason)),
        };
        summary.push_str(&format!("| `{}` | {} |\n", outcome.condition, result));
    }
    summary
}

/// Keeps label names and the like from breaking the table.
fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
