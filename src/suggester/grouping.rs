//! Prefetch-then-limit decorator

use super::{QuerySuggester, SuggestError};
use crate::limiter::Limiter;
use crate::suggestion::Suggestion;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

/// Wraps a delegate suggester and a [`Limiter`]: over-fetches candidates
/// from the delegate, then lets the limiter cut them down to the requested
/// amount according to its group policy.
pub struct GroupingSuggester {
    inner: Arc<dyn QuerySuggester>,
    limiter: Box<dyn Limiter>,
    prefetch_limit_factor: usize,
}

impl GroupingSuggester {
    pub fn new(inner: Arc<dyn QuerySuggester>, limiter: Box<dyn Limiter>) -> Self {
        Self {
            inner,
            limiter,
            prefetch_limit_factor: 1,
        }
    }

    /// How much more than the requested amount to fetch from the delegate,
    /// so the limiter has enough candidates per group to choose from.
    /// Must be positive; the default factor 1 means no inflation.
    pub fn with_prefetch_limit_factor(mut self, factor: usize) -> Self {
        self.prefetch_limit_factor = factor.max(1);
        self
    }
}

#[async_trait]
impl QuerySuggester for GroupingSuggester {
    async fn suggest(
        &self,
        term: &str,
        max_results: usize,
        tags: &HashSet<String>,
    ) -> Result<Vec<Suggestion>, SuggestError> {
        let prefetched = self
            .inner
            .suggest(term, max_results * self.prefetch_limit_factor, tags)
            .await?;
        Ok(self.limiter.limit(prefetched, max_results))
    }

    fn is_ready(&self) -> bool {
        self.inner.is_ready()
    }

    fn record_count(&self) -> u64 {
        self.inner.record_count()
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.inner.close().await
    }
}
