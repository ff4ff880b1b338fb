//! Deduplication of grouped suggestions

use crate::suggestion::Suggestion;
use indexmap::IndexMap;
use std::collections::HashSet;

/// Remove duplicated labels across groups, in place and order-preserving.
///
/// Groups named in `priority_order` are walked first, then the remaining
/// groups in map order. A suggestion is dropped if its trimmed-lowercased
/// label already appeared in a higher-priority group.
pub(crate) fn deduplicate(
    grouped_suggestions: &mut IndexMap<String, Vec<Suggestion>>,
    priority_order: &[String],
) {
    let mut seen: HashSet<String> = HashSet::new();
    for preferred_group in priority_order {
        if let Some(list) = grouped_suggestions.get_mut(preferred_group) {
            retain_unseen(&mut seen, list);
        }
    }
    for (group, list) in grouped_suggestions.iter_mut() {
        if priority_order.contains(group) {
            continue;
        }
        retain_unseen(&mut seen, list);
    }
}

fn retain_unseen(seen: &mut HashSet<String>, list: &mut Vec<Suggestion>) {
    list.retain(|suggestion| seen.insert(suggestion.label().trim().to_lowercase()));
}
