//! Fan-out/merge across heterogeneous suggestion sources

use super::{QuerySuggester, SuggestError};
use crate::suggestion::Suggestion;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::error;

/// Queries a list of independent child suggesters and concatenates their
/// results in child order.
///
/// With capping enabled the merged list is truncated to the requested
/// amount; otherwise the caller (usually a [`GroupingSuggester`] with a
/// group-aware limiter) is expected to cut it down.
///
/// There is no per-child timeout: a slow child delays the whole call.
///
/// [`GroupingSuggester`]: crate::suggester::GroupingSuggester
pub struct CompoundQuerySuggester {
    suggesters: Vec<Arc<dyn QuerySuggester>>,
    concurrent: bool,
    cap_merged_result: bool,
}

impl CompoundQuerySuggester {
    pub fn new(suggesters: Vec<Arc<dyn QuerySuggester>>) -> Self {
        Self {
            suggesters,
            concurrent: false,
            cap_merged_result: true,
        }
    }

    /// Query the children concurrently instead of one after another.
    pub fn with_concurrent_fanout(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Whether to truncate the merged result to the requested amount.
    /// Disable when an outer limiter applies the final group policy.
    pub fn with_cap_merged_result(mut self, cap: bool) -> Self {
        self.cap_merged_result = cap;
        self
    }
}

#[async_trait]
impl QuerySuggester for CompoundQuerySuggester {
    async fn suggest(
        &self,
        term: &str,
        max_results: usize,
        tags: &HashSet<String>,
    ) -> Result<Vec<Suggestion>, SuggestError> {
        if self.suggesters.is_empty() {
            return Ok(Vec::new());
        }
        if self.suggesters.len() == 1 {
            return self.suggesters[0].suggest(term, max_results, tags).await;
        }

        let mut merged: Vec<Suggestion> = Vec::new();
        if self.concurrent {
            let calls = self
                .suggesters
                .iter()
                .map(|s| s.suggest(term, max_results, tags));
            // join_all preserves child order in its output
            for result in join_all(calls).await {
                merged.extend(result?);
            }
        } else {
            for suggester in &self.suggesters {
                merged.extend(suggester.suggest(term, max_results, tags).await?);
            }
        }

        if self.cap_merged_result && merged.len() > max_results {
            merged.truncate(max_results);
        }
        Ok(merged)
    }

    fn is_ready(&self) -> bool {
        self.suggesters.iter().all(|s| s.is_ready())
    }

    fn record_count(&self) -> u64 {
        self.suggesters.iter().map(|s| s.record_count()).sum()
    }

    /// Best-effort: one child failing to close must not block closing the
    /// rest.
    async fn close(&self) -> anyhow::Result<()> {
        for suggester in &self.suggesters {
            if let Err(e) = suggester.close().await {
                error!("failed to close child suggester: {:#}", e);
            }
        }
        Ok(())
    }
}
