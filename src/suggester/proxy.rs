//! Hot-swappable suggester with a bounded short-prefix cache

use super::{NoopQuerySuggester, QuerySuggester, SuggestError};
use crate::metrics::SuggesterMetrics;
use crate::suggestion::Suggestion;
use arc_swap::ArcSwap;
use async_trait::async_trait;
use moka::future::Cache;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const DEFAULT_CACHE_MAX_TERMS: u64 = 10_000;
const DEFAULT_CACHE_LETTER_LENGTH: usize = 3;
const DEFAULT_CACHE_FETCH_SIZE: usize = 10;

/// Holds the active suggester behind an atomic reference so an external
/// updater can swap in a freshly built one without blocking concurrent
/// reads.
///
/// Short prefixes are disproportionately frequent, so their results are kept
/// in a bounded cache. On a swap every cached term is recomputed against the
/// new suggester before the reference is replaced and the old suggester is
/// destroyed, so the cache never serves data of a destroyed or outdated
/// suggester.
pub struct QuerySuggesterProxy {
    index_name: String,
    inner: ArcSwap<Box<dyn QuerySuggester>>,
    closed: AtomicBool,
    prefix_cache: Cache<String, Vec<Suggestion>>,
    cache_letter_length: usize,
    cache_fetch_size: usize,
    metrics: Arc<SuggesterMetrics>,
}

impl QuerySuggesterProxy {
    /// Create a proxy serving empty results until the first swap.
    /// `index_name` is used for logging and error messages.
    pub fn new(index_name: impl Into<String>) -> Self {
        Self::with_cache_config(
            index_name,
            DEFAULT_CACHE_MAX_TERMS,
            DEFAULT_CACHE_LETTER_LENGTH,
            DEFAULT_CACHE_FETCH_SIZE,
        )
    }

    /// Create a proxy with explicit cache limits: the maximum number of
    /// cached terms, the maximum prefix length that is cached at all, and
    /// the fixed amount fetched from the delegate per cache entry.
    pub fn with_cache_config(
        index_name: impl Into<String>,
        max_cached_terms: u64,
        cache_letter_length: usize,
        cache_fetch_size: usize,
    ) -> Self {
        Self {
            index_name: index_name.into(),
            inner: ArcSwap::from_pointee(
                Box::new(NoopQuerySuggester::new(false)) as Box<dyn QuerySuggester>
            ),
            closed: AtomicBool::new(false),
            prefix_cache: Cache::builder().max_capacity(max_cached_terms).build(),
            cache_letter_length,
            cache_fetch_size,
            metrics: Arc::new(SuggesterMetrics::new()),
        }
    }

    /// Counters for cache effectiveness and swap activity
    pub fn metrics(&self) -> Arc<SuggesterMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Replace the active suggester.
    ///
    /// Every cached term is recomputed against `new_suggester` first, then
    /// the reference is swapped and only afterwards the previous suggester
    /// is destroyed, so in-flight reads never observe a destroyed one.
    pub async fn update_suggester(
        &self,
        new_suggester: Box<dyn QuerySuggester>,
    ) -> Result<(), SuggestError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SuggestError::AlreadyClosed(self.index_name.clone()));
        }
        info!(
            index = %self.index_name,
            old_records = self.inner.load().record_count(),
            new_records = new_suggester.record_count(),
            "updating suggester"
        );

        let start = Instant::now();
        let mut refreshed = 0usize;
        for (term, _) in self.prefix_cache.iter() {
            let fresh = new_suggester
                .suggest(term.as_str(), self.cache_fetch_size, &HashSet::new())
                .await?;
            self.prefix_cache.insert(String::clone(&term), fresh).await;
            refreshed += 1;
        }
        debug!(
            index = %self.index_name,
            entries = refreshed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "refreshed prefix cache"
        );

        let old_suggester = self.inner.swap(Arc::new(new_suggester));
        old_suggester.destroy().await;
        self.metrics.record_swap();
        Ok(())
    }

    fn is_cacheable(&self, normalized_term: &str, max_results: usize, tags: &HashSet<String>) -> bool {
        normalized_term.chars().count() <= self.cache_letter_length
            && tags.is_empty()
            && max_results <= self.cache_fetch_size
    }
}

#[async_trait]
impl QuerySuggester for QuerySuggesterProxy {
    async fn suggest(
        &self,
        term: &str,
        max_results: usize,
        tags: &HashSet<String>,
    ) -> Result<Vec<Suggestion>, SuggestError> {
        if self.closed.load(Ordering::Acquire) || term.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.metrics.record_suggest();
        let normalized_term = term.trim().to_lowercase();

        if self.is_cacheable(&normalized_term, max_results, tags) {
            if self.prefix_cache.contains_key(&normalized_term) {
                self.metrics.record_cache_hit();
            } else {
                self.metrics.record_cache_miss();
            }

            // single-flight per term: every entry holds the fixed fetch size
            // so later requests with smaller limits can be served by slicing
            let inner = self.inner.load_full();
            let lookup_term = normalized_term.clone();
            let fetch_size = self.cache_fetch_size;
            let mut results = self
                .prefix_cache
                .try_get_with(normalized_term, async move {
                    inner.suggest(&lookup_term, fetch_size, &HashSet::new()).await
                })
                .await
                .map_err(|e: Arc<SuggestError>| {
                    SuggestError::Lookup(anyhow::anyhow!("{}", e))
                })?;

            if results.len() > max_results {
                results.truncate(max_results);
            }
            Ok(results)
        } else {
            self.inner
                .load_full()
                .suggest(&normalized_term, max_results, tags)
                .await
        }
    }

    fn is_ready(&self) -> bool {
        self.inner.load().is_ready()
    }

    fn record_count(&self) -> u64 {
        self.inner.load().record_count()
    }

    /// Terminal: after closing, every suggest call returns empty and swap
    /// attempts fail.
    async fn close(&self) -> anyhow::Result<()> {
        self.closed.store(true, Ordering::Release);
        self.prefix_cache.invalidate_all();
        self.inner.load_full().close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;

    /// Answers a fixed term with numbered suggestions and records calls.
    struct FakeSuggester {
        term: String,
        labels: Vec<String>,
        calls: AtomicUsize,
        closed: AtomicBool,
    }

    impl FakeSuggester {
        fn boxed(term: &str, labels: &[&str]) -> Box<Self> {
            Box::new(Self {
                term: term.to_string(),
                labels: labels.iter().map(|l| l.to_string()).collect(),
                calls: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl QuerySuggester for FakeSuggester {
        async fn suggest(
            &self,
            term: &str,
            max_results: usize,
            _tags: &HashSet<String>,
        ) -> Result<Vec<Suggestion>, SuggestError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if term == self.term {
                Ok(self
                    .labels
                    .iter()
                    .take(max_results)
                    .map(Suggestion::new)
                    .collect())
            } else {
                Ok(Vec::new())
            }
        }

        fn is_ready(&self) -> bool {
            true
        }

        fn record_count(&self) -> u64 {
            self.labels.len() as u64
        }

        async fn close(&self) -> anyhow::Result<()> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn labels(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.label()).collect()
    }

    #[tokio::test]
    async fn test_empty_before_swap_then_served_then_empty_after_close() {
        let proxy = QuerySuggesterProxy::new("deals");
        assert!(proxy.suggest_default("foo").await.unwrap().is_empty());
        assert!(!proxy.is_ready());

        proxy
            .update_suggester(FakeSuggester::boxed("foo", &["1"]))
            .await
            .unwrap();
        assert!(proxy.is_ready());
        assert_eq!(labels(&proxy.suggest_default("foo").await.unwrap()), vec!["1"]);

        proxy.close().await.unwrap();
        assert!(proxy.suggest_default("foo").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_after_close_fails() {
        let proxy = QuerySuggesterProxy::new("deals");
        proxy.close().await.unwrap();

        let err = proxy
            .update_suggester(FakeSuggester::boxed("foo", &["1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, SuggestError::AlreadyClosed(_)));
        assert!(err.to_string().contains("deals"));
    }

    #[tokio::test]
    async fn test_swap_rewarms_cache_and_destroys_old() {
        let proxy = QuerySuggesterProxy::new("deals");

        let old = FakeSuggester::boxed("foo", &["old"]);
        let old_ref: Arc<FakeSuggester> = Arc::new(*old);
        struct Shared(Arc<FakeSuggester>);
        #[async_trait]
        impl QuerySuggester for Shared {
            async fn suggest(
                &self,
                term: &str,
                max_results: usize,
                tags: &HashSet<String>,
            ) -> Result<Vec<Suggestion>, SuggestError> {
                self.0.suggest(term, max_results, tags).await
            }
            fn is_ready(&self) -> bool {
                self.0.is_ready()
            }
            async fn close(&self) -> anyhow::Result<()> {
                self.0.close().await
            }
        }

        proxy
            .update_suggester(Box::new(Shared(Arc::clone(&old_ref))))
            .await
            .unwrap();

        // prime the cache through the old suggester
        assert_eq!(labels(&proxy.suggest_default("foo").await.unwrap()), vec!["old"]);

        proxy
            .update_suggester(FakeSuggester::boxed("foo", &["new"]))
            .await
            .unwrap();

        // cached entry was recomputed against the new suggester and the old
        // one was destroyed after the swap
        assert_eq!(labels(&proxy.suggest_default("foo").await.unwrap()), vec!["new"]);
        assert!(old_ref.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cache_hit_avoids_delegate() {
        let proxy = QuerySuggesterProxy::new("deals");
        let fake = FakeSuggester::boxed("fo", &["f1", "f2", "f3"]);
        let calls_probe: Arc<FakeSuggester> = Arc::new(*fake);
        struct Shared(Arc<FakeSuggester>);
        #[async_trait]
        impl QuerySuggester for Shared {
            async fn suggest(
                &self,
                term: &str,
                max_results: usize,
                tags: &HashSet<String>,
            ) -> Result<Vec<Suggestion>, SuggestError> {
                self.0.suggest(term, max_results, tags).await
            }
            fn is_ready(&self) -> bool {
                true
            }
            async fn close(&self) -> anyhow::Result<()> {
                Ok(())
            }
        }
        proxy
            .update_suggester(Box::new(Shared(Arc::clone(&calls_probe))))
            .await
            .unwrap();

        proxy.suggest("fo", 5, &HashSet::new()).await.unwrap();
        proxy.suggest("fo", 5, &HashSet::new()).await.unwrap();
        // one delegate lookup, second request served from cache
        assert_eq!(calls_probe.calls.load(Ordering::SeqCst), 1);

        let snapshot = proxy.metrics().snapshot();
        assert_eq!(snapshot.cache_misses, 1);
        assert_eq!(snapshot.cache_hits, 1);
    }

    #[tokio::test]
    async fn test_cached_entry_sliced_for_smaller_requests() {
        let proxy = QuerySuggesterProxy::new("deals");
        proxy
            .update_suggester(FakeSuggester::boxed("fo", &["f1", "f2", "f3"]))
            .await
            .unwrap();

        let full = proxy.suggest("fo", 10, &HashSet::new()).await.unwrap();
        assert_eq!(full.len(), 3);
        let sliced = proxy.suggest("fo", 2, &HashSet::new()).await.unwrap();
        assert_eq!(labels(&sliced), vec!["f1", "f2"]);
    }

    #[tokio::test]
    async fn test_long_terms_tag_filters_and_big_limits_bypass_cache() {
        let proxy = QuerySuggesterProxy::new("deals");
        let fake = FakeSuggester::boxed("football", &["f1"]);
        let probe: Arc<FakeSuggester> = Arc::new(*fake);
        struct Shared(Arc<FakeSuggester>);
        #[async_trait]
        impl QuerySuggester for Shared {
            async fn suggest(
                &self,
                term: &str,
                max_results: usize,
                tags: &HashSet<String>,
            ) -> Result<Vec<Suggestion>, SuggestError> {
                self.0.suggest(term, max_results, tags).await
            }
            fn is_ready(&self) -> bool {
                true
            }
            async fn close(&self) -> anyhow::Result<()> {
                Ok(())
            }
        }
        proxy
            .update_suggester(Box::new(Shared(Arc::clone(&probe))))
            .await
            .unwrap();

        // longer than the cached prefix length: delegate hit every time
        proxy.suggest("football", 5, &HashSet::new()).await.unwrap();
        proxy.suggest("football", 5, &HashSet::new()).await.unwrap();
        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);

        // tag filter requested: bypass
        let tags = HashSet::from(["brand".to_string()]);
        proxy.suggest("fo", 5, &tags).await.unwrap();
        assert_eq!(probe.calls.load(Ordering::SeqCst), 3);

        // more results requested than a cache entry holds: bypass
        proxy.suggest("fo", 11, &HashSet::new()).await.unwrap();
        assert_eq!(probe.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_terms_normalized_before_lookup() {
        let proxy = QuerySuggesterProxy::new("deals");
        proxy
            .update_suggester(FakeSuggester::boxed("fo", &["f1"]))
            .await
            .unwrap();

        let result = proxy.suggest("  Fo ", 5, &HashSet::new()).await.unwrap();
        assert_eq!(labels(&result), vec!["f1"]);

        assert!(proxy.suggest("   ", 5, &HashSet::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_is_normalized() {
        struct FailingSuggester;
        #[async_trait]
        impl QuerySuggester for FailingSuggester {
            async fn suggest(
                &self,
                _term: &str,
                _max_results: usize,
                _tags: &HashSet<String>,
            ) -> Result<Vec<Suggestion>, SuggestError> {
                Err(SuggestError::Lookup(anyhow::anyhow!("index corrupted")))
            }
            fn is_ready(&self) -> bool {
                true
            }
            async fn close(&self) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let proxy = QuerySuggesterProxy::new("deals");
        // swap directly; the cache is empty so nothing is recomputed
        proxy
            .update_suggester(Box::new(FailingSuggester))
            .await
            .unwrap();

        let err = proxy.suggest("fo", 5, &HashSet::new()).await.unwrap_err();
        assert!(matches!(err, SuggestError::Lookup(_)));
        assert!(err.to_string().contains("index corrupted"));
    }

    #[tokio::test]
    async fn test_payload_travels_through_cache() {
        struct PayloadSuggester;
        #[async_trait]
        impl QuerySuggester for PayloadSuggester {
            async fn suggest(
                &self,
                _term: &str,
                _max_results: usize,
                _tags: &HashSet<String>,
            ) -> Result<Vec<Suggestion>, SuggestError> {
                Ok(vec![Suggestion::new("nike")
                    .with_payload(HashMap::from([(
                        "type".to_string(),
                        "brand".to_string(),
                    )]))
                    .with_weight(42)])
            }
            fn is_ready(&self) -> bool {
                true
            }
            async fn close(&self) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let proxy = QuerySuggesterProxy::new("deals");
        proxy.update_suggester(Box::new(PayloadSuggester)).await.unwrap();

        for _ in 0..2 {
            let result = proxy.suggest("ni", 5, &HashSet::new()).await.unwrap();
            assert_eq!(result[0].group_key("type"), "brand");
            assert_eq!(result[0].weight, 42);
        }
    }
}
