//! Suggestion value object

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Payload key under which the suggestion type (keyword, brand, category...)
/// is stored
pub const PAYLOAD_TYPE_KEY: &str = "type";

/// Reserved group for suggestions that carry no value for the grouping key
pub const OTHER_GROUP: &str = "other";

/// A single suggestion candidate as returned by a suggester.
///
/// The label is immutable; payload and weight travel read-only through the
/// limiters and are discarded once the response is serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    label: String,
    /// Additional data attached by the suggestion source
    #[serde(default)]
    pub payload: HashMap<String, String>,
    /// Higher weight = more relevant
    #[serde(default)]
    pub weight: i64,
    /// Explicitly assigned tags; derived from the payload type when unset
    #[serde(default)]
    tags: Option<HashSet<String>>,
}

impl Suggestion {
    /// Create a new suggestion with the given label
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: HashMap::new(),
            weight: 0,
            tags: None,
        }
    }

    /// Attach a payload
    pub fn with_payload(mut self, payload: HashMap<String, String>) -> Self {
        self.payload = payload;
        self
    }

    /// Attach a single payload entry
    pub fn with_payload_entry(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Set the weight
    pub fn with_weight(mut self, weight: i64) -> Self {
        self.weight = weight;
        self
    }

    /// Set the tags explicitly
    pub fn with_tags(mut self, tags: HashSet<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// The suggested phrase
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Tags of this suggestion. If none were set explicitly, they are derived
    /// on demand from the payload type entry.
    pub fn tags(&self) -> HashSet<String> {
        match &self.tags {
            Some(tags) => tags.clone(),
            None => self
                .payload
                .get(PAYLOAD_TYPE_KEY)
                .map(|t| HashSet::from([t.clone()]))
                .unwrap_or_default(),
        }
    }

    /// The group this suggestion belongs to, looked up in the payload by the
    /// given key. Suggestions without that payload entry fall into the
    /// reserved [`OTHER_GROUP`].
    pub fn group_key(&self, grouping_key: &str) -> &str {
        self.payload
            .get(grouping_key)
            .map(String::as_str)
            .unwrap_or(OTHER_GROUP)
    }
}
