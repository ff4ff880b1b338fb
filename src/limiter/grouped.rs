//! Absolute per-group quotas

use super::dedup::deduplicate;
use super::{group_by_key, Limiter};
use crate::suggestion::Suggestion;
use indexmap::IndexMap;

/// Groups the candidates by a payload entry and cuts each group down to its
/// configured quota.
///
/// Configured groups are emitted first, in configuration order. Groups that
/// are not configured are appended afterwards, each capped at
/// `default_limit` and at the remaining space toward the requested limit.
/// The result is never padded: if the quotas sum up below the requested
/// limit, the returned list stays short.
pub struct GroupedCutOffLimiter {
    grouping_key: String,
    default_limit: usize,
    limit_conf: IndexMap<String, usize>,
    group_deduplication_order: Option<Vec<String>>,
}

impl GroupedCutOffLimiter {
    pub fn new(
        grouping_key: impl Into<String>,
        default_limit: usize,
        limit_conf: IndexMap<String, usize>,
        group_deduplication_order: Option<Vec<String>>,
    ) -> Self {
        Self {
            grouping_key: grouping_key.into(),
            default_limit,
            limit_conf,
            group_deduplication_order,
        }
    }
}

impl Limiter for GroupedCutOffLimiter {
    fn limit(&self, suggestions: Vec<Suggestion>, limit: usize) -> Vec<Suggestion> {
        let mut grouped = group_by_key(suggestions, &self.grouping_key);
        if let Some(order) = &self.group_deduplication_order {
            if !order.is_empty() {
                deduplicate(&mut grouped, order);
            }
        }

        let mut final_list: Vec<Suggestion> = Vec::with_capacity(limit);
        for (group, quota) in &self.limit_conf {
            if let Some(group_list) = grouped.shift_remove(group) {
                let group_limit = group_list.len().min(*quota);
                final_list.extend(group_list.into_iter().take(group_limit));
            }
        }

        for (_, group_list) in grouped {
            if final_list.len() >= limit {
                break;
            }
            let group_limit = (limit - final_list.len())
                .min(group_list.len())
                .min(self.default_limit);
            final_list.extend(group_list.into_iter().take(group_limit));
        }

        if final_list.len() > limit {
            final_list.truncate(limit);
        }
        final_list
    }
}
