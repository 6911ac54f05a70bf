//! Pulls Jira issue keys out of free-form message text.

use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;

use crate::base::types::IssueKey;

static ISSUE_KEY_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Get the issue key pattern: word characters, a dash, digits, bounded on both sides.
///
/// Word characters, digits and boundaries are ASCII only, so `café-1` is not a key
/// and `éABC-1` still yields `ABC-1`.
fn get_issue_key_pattern() -> &'static Regex {
    ISSUE_KEY_PATTERN.get_or_init(|| Regex::new(r"(?-u:\b)[A-Za-z0-9_]+-[0-9]+(?-u:\b)").expect("issue key pattern is valid"))
}

/// Extracts the distinct issue keys mentioned in `text`.
///
/// Keys are upper-cased, and returned in the order they first appear.
pub fn extract_issue_keys(text: &str) -> Vec<IssueKey> {
    let mut seen = HashSet::new();

    get_issue_key_pattern()
        .find_iter(text)
        .map(|m| IssueKey::new(m.as_str()))
        .filter(|key| seen.insert(key.clone()))
        .collect()
}
