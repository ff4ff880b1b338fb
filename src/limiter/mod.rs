//! Limiters reduce an over-fetched candidate list to a bounded,
//! policy-compliant list.
//!
//! All limiters preserve the relative order of surviving candidates within a
//! group and never return more than the requested amount.

mod dedup;
mod grouped;
mod share;

pub use grouped::GroupedCutOffLimiter;
pub use share::{ConfigurableShareLimiter, SHARE_KEY_ENV_PREFIX};

use crate::suggestion::Suggestion;
use indexmap::IndexMap;

/// Reduces a candidate list to at most `limit` entries.
pub trait Limiter: Send + Sync {
    /// `limit` must be greater than zero. The result never exceeds `limit`
    /// entries; an empty input yields an empty output.
    fn limit(&self, suggestions: Vec<Suggestion>, limit: usize) -> Vec<Suggestion>;
}

/// Plain truncation without any grouping.
#[derive(Debug, Clone, Copy, Default)]
pub struct CutOffLimiter;

impl Limiter for CutOffLimiter {
    fn limit(&self, mut suggestions: Vec<Suggestion>, limit: usize) -> Vec<Suggestion> {
        if suggestions.len() > limit {
            suggestions.truncate(limit);
        }
        suggestions
    }
}

/// Partition suggestions by their payload group, keeping first-seen group
/// order and the input order within each group.
pub(crate) fn group_by_key(
    suggestions: Vec<Suggestion>,
    grouping_key: &str,
) -> IndexMap<String, Vec<Suggestion>> {
    let mut grouped: IndexMap<String, Vec<Suggestion>> = IndexMap::new();
    for suggestion in suggestions {
        let group = suggestion.group_key(grouping_key).to_string();
        grouped.entry(group).or_default().push(suggestion);
    }
    grouped
}
