//! Metrics collection
//!
//! Tracks suggest call volume, prefix-cache effectiveness and hot-swap
//! activity. Counters are plain atomics so the read path stays cheap.

use std::sync::atomic::{AtomicU64, Ordering};

/// Per-proxy metrics collector
#[derive(Debug, Default)]
pub struct SuggesterMetrics {
    /// Total suggest calls
    suggest_count: AtomicU64,
    /// Prefix cache hits
    cache_hits: AtomicU64,
    /// Prefix cache misses
    cache_misses: AtomicU64,
    /// Completed hot-swaps
    swap_count: AtomicU64,
}

impl SuggesterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_suggest(&self) {
        self.suggest_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_swap(&self) {
        self.swap_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent-enough snapshot of the current counter values
    pub fn snapshot(&self) -> MetricsSnapshot {
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let lookups = cache_hits + cache_misses;
        MetricsSnapshot {
            suggest_count: self.suggest_count.load(Ordering::Relaxed),
            cache_hits,
            cache_misses,
            swap_count: self.swap_count.load(Ordering::Relaxed),
            cache_hit_rate: if lookups == 0 {
                0.0
            } else {
                cache_hits as f64 / lookups as f64
            },
        }
    }
}

/// Point-in-time view of the collected counters
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub suggest_count: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub swap_count: u64,
    pub cache_hit_rate: f64,
}
