//! Suggest-RS: serving layer for product-search autocomplete
//!
//! Composes multiple suggestion sources, balances and deduplicates results
//! by group, caches hot prefixes and hot-swaps the active suggester under
//! concurrent read load.
//!
//! The lexical lookup itself (fuzzy matching, index format) lives behind the
//! [`QuerySuggester`] trait and is provided by external collaborators, as are
//! the data providers and the update scheduler that triggers hot-swaps.

pub mod config;
pub mod limiter;
pub mod metrics;
pub mod suggester;
pub mod suggestion;

pub use config::SuggestConfig;
pub use limiter::{ConfigurableShareLimiter, CutOffLimiter, GroupedCutOffLimiter, Limiter};
pub use suggester::{
    CompoundQuerySuggester, GroupingSuggester, NoopQuerySuggester, QuerySuggester,
    QuerySuggesterProxy, SuggestError,
};
pub use suggestion::Suggestion;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum number of suggestions returned when the caller does not ask for a
/// specific amount
pub const DEFAULT_MAX_RESULTS: usize = 10;
