//! Suggestion-serving contract and its composable implementations
//!
//! Every suggestion source implements [`QuerySuggester`]; the decorators in
//! this module ([`GroupingSuggester`], [`CompoundQuerySuggester`],
//! [`QuerySuggesterProxy`]) implement the same trait, so callers cannot tell
//! a bare source from a full composition.

mod compound;
mod grouping;
mod proxy;

pub use compound::CompoundQuerySuggester;
pub use grouping::GroupingSuggester;
pub use proxy::QuerySuggesterProxy;

use crate::suggestion::Suggestion;
use crate::DEFAULT_MAX_RESULTS;
use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

/// Errors raised by suggesters
#[derive(Debug, Error)]
pub enum SuggestError {
    /// Mutating call on a suggester that was already closed
    #[error("suggester for index '{0}' is already closed")]
    AlreadyClosed(String),
    /// Any failure inside a suggest lookup, normalized to a single error
    /// kind so callers need one catch point
    #[error("suggest lookup failed: {0}")]
    Lookup(#[from] anyhow::Error),
}

/// A source of suggestions for a typed term.
#[async_trait]
pub trait QuerySuggester: Send + Sync {
    /// Get at most `max_results` suggestions for the given term, optionally
    /// filtered by tags.
    async fn suggest(
        &self,
        term: &str,
        max_results: usize,
        tags: &HashSet<String>,
    ) -> Result<Vec<Suggestion>, SuggestError>;

    /// Get suggestions with the default result limit and no tag filter.
    async fn suggest_default(&self, term: &str) -> Result<Vec<Suggestion>, SuggestError> {
        self.suggest(term, DEFAULT_MAX_RESULTS, &HashSet::new()).await
    }

    /// Whether this suggester is ready to serve suggestions
    fn is_ready(&self) -> bool;

    /// Number of records this suggester was built from
    fn record_count(&self) -> u64 {
        0
    }

    /// Release the resources held by this suggester. Safe to call more than
    /// once.
    async fn close(&self) -> anyhow::Result<()>;

    /// Best-effort teardown: closes the suggester and logs instead of
    /// propagating failures.
    async fn destroy(&self) {
        if let Err(e) = self.close().await {
            warn!("error while destroying suggester: {:#}", e);
        }
    }
}

/// Fallback suggester that always returns empty results.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopQuerySuggester {
    ready: bool,
}

impl NoopQuerySuggester {
    pub fn new(ready: bool) -> Self {
        Self { ready }
    }
}

#[async_trait]
impl QuerySuggester for NoopQuerySuggester {
    async fn suggest(
        &self,
        _term: &str,
        _max_results: usize,
        _tags: &HashSet<String>,
    ) -> Result<Vec<Suggestion>, SuggestError> {
        Ok(Vec::new())
    }

    fn is_ready(&self) -> bool {
        self.ready
    }

    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
