//! Typed configuration for a suggest index
//!
//! There is no mandated file format here; deployments deserialize
//! `SuggestConfig` from whatever source they use and hand it over as plain
//! typed parameters.

use crate::limiter::{ConfigurableShareLimiter, GroupedCutOffLimiter, Limiter};
use crate::suggestion::OTHER_GROUP;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Per-index suggest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestConfig {
    /// Payload key used to group suggestions (e.g. "type"). Without it, no
    /// group-aware limiting takes place.
    pub group_key: Option<String>,
    /// Ordered per-group limits. Absolute quotas, or relative weights when
    /// `use_relative_share_limit` is set.
    pub group_config: Vec<GroupConfig>,
    /// Interpret the group limits as relative shares instead of absolute
    /// cut-off quotas
    pub use_relative_share_limit: bool,
    /// When set (even if empty), suggestions are deduplicated across
    /// groups; the groups listed first win
    pub group_deduplication_order: Option<Vec<String>>,
    /// Over-fetch factor for the grouping suggester
    pub prefetch_limit_factor: usize,
    /// Maximum number of terms in the proxy's prefix cache
    pub max_cached_terms: u64,
    /// Maximum prefix length (in characters) that is cached at all
    pub cache_letter_length: usize,
    /// Fixed amount fetched from the delegate per cache entry
    pub cache_fetch_size: usize,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            group_key: None,
            group_config: Vec::new(),
            use_relative_share_limit: false,
            group_deduplication_order: None,
            prefetch_limit_factor: 1,
            max_cached_terms: 10_000,
            cache_letter_length: 3,
            cache_fetch_size: 10,
        }
    }
}

/// A single group limit entry. Order matters, so these come as a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    pub group_name: String,
    pub limit: usize,
}

impl GroupConfig {
    pub fn new(group_name: impl Into<String>, limit: usize) -> Self {
        Self {
            group_name: group_name.into(),
            limit,
        }
    }
}

impl SuggestConfig {
    /// Append a group limit, keeping configuration order
    pub fn add_group_config(&mut self, group_name: impl Into<String>, limit: usize) -> &mut Self {
        self.group_config.push(GroupConfig::new(group_name, limit));
        self
    }

    /// Override cache knobs from `SUGGEST_*` environment variables
    pub fn merge_env(&mut self) {
        if let Ok(value) = std::env::var("SUGGEST_CACHE_MAX_SIZE") {
            if let Ok(max) = value.parse() {
                self.max_cached_terms = max;
            }
        }
        if let Ok(value) = std::env::var("SUGGEST_CACHE_LETTER_LENGTH") {
            if let Ok(length) = value.parse() {
                self.cache_letter_length = length;
            }
        }
        if let Ok(value) = std::env::var("SUGGEST_PREFETCH_LIMIT_FACTOR") {
            if let Ok(factor) = value.parse::<usize>() {
                self.prefetch_limit_factor = factor.max(1);
            }
        }
    }

    /// Build the limiter this configuration asks for, or `None` when no
    /// group key is configured and plain truncation is enough.
    pub fn create_limiter(&self) -> Option<Box<dyn Limiter>> {
        let group_key = self.group_key.as_ref()?;
        if self.use_relative_share_limit {
            let shares: IndexMap<String, f64> = self
                .group_config
                .iter()
                .map(|group| (group.group_name.clone(), group.limit as f64))
                .collect();
            Some(Box::new(ConfigurableShareLimiter::new(
                group_key.clone(),
                shares,
                self.group_deduplication_order.clone(),
            )))
        } else {
            let limits: IndexMap<String, usize> = self
                .group_config
                .iter()
                .map(|group| (group.group_name.clone(), group.limit))
                .collect();
            // the "other" quota doubles as the default for unconfigured groups
            let default_limit = limits.get(OTHER_GROUP).copied().unwrap_or(5);
            Some(Box::new(GroupedCutOffLimiter::new(
                group_key.clone(),
                default_limit,
                limits,
                self.group_deduplication_order.clone(),
            )))
        }
    }
}
