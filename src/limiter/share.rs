//! Proportional per-group shares

use super::dedup::deduplicate;
use super::{group_by_key, Limiter};
use crate::suggestion::Suggestion;
use arc_swap::ArcSwap;
use indexmap::IndexMap;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Environment variable prefix for per-group share overrides, e.g.
/// `SUGGEST_GROUP_SHARE_BRAND=0.2`
pub const SHARE_KEY_ENV_PREFIX: &str = "SUGGEST_GROUP_SHARE_";

/// Limiter that distributes the limited space among suggestion groups
/// according to configured fractional shares (e.g. keyword=0.5, brand=0.3,
/// category=0.2).
///
/// Shares are normalized to sum up to 1.0. The order of the configured
/// groups defines the order of the returned groups; groups discovered at
/// request time are appended in their first-seen order.
///
/// Groups that are not configured get their share from the
/// `SUGGEST_GROUP_SHARE_*` environment override if present. Otherwise they
/// either split the unassigned remainder evenly (when the configured shares
/// sum up below 1.0) or receive the share of the smallest configured group.
///
/// Suggestions without a value for the grouping key fall into the reserved
/// `"other"` group, so consider configuring a share for it as well.
pub struct ConfigurableShareLimiter {
    grouping_key: String,
    group_deduplication_order: Option<Vec<String>>,
    /// configured shares, extended when an env override is discovered
    orig_share_conf: Mutex<IndexMap<String, f64>>,
    /// published normalized snapshot, read lock-free on the request path
    normalized_share_conf: ArcSwap<IndexMap<String, f64>>,
}

impl ConfigurableShareLimiter {
    /// `share_configuration` holds a value in (0, 1] per group; the values
    /// need not sum up to 1, they are normalized. If
    /// `group_deduplication_order` is given (even empty), suggestions are
    /// deduplicated across groups, preferring the groups listed first.
    pub fn new(
        grouping_key: impl Into<String>,
        share_configuration: IndexMap<String, f64>,
        group_deduplication_order: Option<Vec<String>>,
    ) -> Self {
        let mut normalized = share_configuration.clone();
        normalize_share_values(&mut normalized);
        Self {
            grouping_key: grouping_key.into(),
            group_deduplication_order,
            orig_share_conf: Mutex::new(share_configuration),
            normalized_share_conf: ArcSwap::from_pointee(normalized),
        }
    }

    /// Current normalized share table. Mostly useful for diagnostics.
    pub fn normalized_shares(&self) -> Arc<IndexMap<String, f64>> {
        self.normalized_share_conf.load_full()
    }

    /// Extend the share configuration with groups seen for the first time.
    ///
    /// Runs rarely (once per distinct new group ever observed). Readers that
    /// only hit known groups keep using the published snapshot without
    /// touching the lock.
    fn update_share_configuration(&self, keys: &[String]) {
        let mut orig = self.orig_share_conf.lock().unwrap();

        // another request may have discovered the same groups in the meantime
        let published = self.normalized_share_conf.load();
        if keys.iter().all(|key| published.contains_key(key)) {
            return;
        }

        let mut unknown_shares: Vec<&String> = Vec::new();
        for key in keys {
            if orig.contains_key(key) {
                continue;
            }
            let key_share = std::env::var(format!(
                "{}{}",
                SHARE_KEY_ENV_PREFIX,
                key.to_uppercase()
            ))
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .unwrap_or(0.0);

            if key_share > 0.0 {
                debug!(group = %key, share = key_share, "adopting share from environment override");
                orig.insert(key.clone(), key_share);
            } else {
                unknown_shares.push(key);
            }
        }

        let mut next_share_conf = orig.clone();

        // remaining unknown groups either split the unassigned remainder or
        // get the minimal configured share. They are not persisted into the
        // original configuration: their share must be recomputed when
        // another group with a defined value shows up later.
        if !unknown_shares.is_empty() {
            let mut min: f64 = 1.0;
            let mut sum: f64 = 0.0;
            for &share in orig.values() {
                sum += share;
                if share < min {
                    min = share;
                }
            }
            let share_per_key = if sum < 1.0 {
                (1.0 - sum) / unknown_shares.len() as f64
            } else {
                min
            };
            for key in unknown_shares {
                next_share_conf.insert(key.clone(), share_per_key);
            }
        }

        normalize_share_values(&mut next_share_conf);

        // merge into the published snapshot: existing groups keep their
        // position, new ones are appended; renormalize in case groups from
        // earlier discoveries are not part of this update
        let mut merged = (**self.normalized_share_conf.load()).clone();
        for (key, value) in next_share_conf {
            merged.insert(key, value);
        }
        normalize_share_values(&mut merged);
        self.normalized_share_conf.store(Arc::new(merged));
    }
}

impl Limiter for ConfigurableShareLimiter {
    fn limit(&self, suggestions: Vec<Suggestion>, limit: usize) -> Vec<Suggestion> {
        if suggestions.len() <= limit {
            return suggestions;
        }

        let mut grouped = group_by_key(suggestions, &self.grouping_key);

        // a single group degenerates to a plain cut-off
        if grouped.len() == 1 {
            let (_, mut only_group) = grouped.pop().unwrap_or_default();
            only_group.truncate(limit);
            return only_group;
        }

        if let Some(order) = &self.group_deduplication_order {
            deduplicate(&mut grouped, order);
        }

        let present_groups: Vec<String> = grouped.keys().cloned().collect();
        let has_unknown_groups = {
            let known = self.normalized_share_conf.load();
            !present_groups.iter().all(|group| known.contains_key(group))
        };
        if has_unknown_groups {
            self.update_share_configuration(&present_groups);
        }
        let normalized = self.normalized_share_conf.load_full();

        // a group's share must only depend on the groups that produced
        // candidates this time, so renormalize over the present groups
        let mut result_shares: IndexMap<String, f64> = present_groups
            .iter()
            .map(|group| (group.clone(), normalized.get(group).copied().unwrap_or(0.0)))
            .collect();
        normalize_share_values(&mut result_shares);

        let mut limited: Vec<Suggestion> = Vec::with_capacity(limit);
        let mut remaining: VecDeque<Suggestion> = VecDeque::new();
        let mut group_insert_cursors: HashMap<String, usize> = HashMap::new();

        for group in normalized.keys() {
            let Some(group_suggestions) = grouped.shift_remove(group) else {
                continue;
            };
            let share = result_shares.get(group).copied().unwrap_or(0.0);
            let group_limit = ((share * limit as f64).round() as usize).min(group_suggestions.len());

            let group_len = group_suggestions.len();
            let mut iter = group_suggestions.into_iter();
            limited.extend(iter.by_ref().take(group_limit));

            if group_limit < group_len {
                // cursor sits right after this group's appended slice, so
                // correction-phase splices extend the group in place
                group_insert_cursors.insert(group.clone(), limited.len());
                remaining.extend(iter);
            }
        }

        // rounding may produce a bigger or a smaller list; adjust according
        // to group priority and availability
        if limited.len() > limit {
            limited.truncate(limit);
        } else {
            while limited.len() < limit {
                let Some(next) = remaining.pop_front() else {
                    // leftovers exhausted although the input was larger than
                    // the limit; can only happen with degenerate shares
                    warn!(limit, size = limited.len(), "share correction ran out of leftover suggestions");
                    break;
                };
                let group = next.group_key(&self.grouping_key).to_string();
                let cursor = group_insert_cursors.entry(group).or_insert(limited.len());
                limited.insert((*cursor).min(limited.len()), next);
                *cursor += 1;
            }
        }

        limited
    }
}

/// Scale the shares so they sum up to 1.0. A non-positive sum is treated as
/// "distribute evenly" (logged, not an error).
fn normalize_share_values(shares: &mut IndexMap<String, f64>) {
    if shares.is_empty() {
        return;
    }
    let sum: f64 = shares.values().sum();
    if sum <= 0.0 {
        if sum < 0.0 {
            warn!("share configuration has invalid values, distributing evenly");
        }
        let even = 1.0 / shares.len() as f64;
        for value in shares.values_mut() {
            *value = even;
        }
    } else if sum != 1.0 {
        let recalc_factor = 1.0 / sum;
        for value in shares.values_mut() {
            *value *= recalc_factor;
        }
    }
}
