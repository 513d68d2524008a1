//! Gather requests and their results.

use crate::fragment::ScoredFragment;
use crate::trigger::Trigger;
use serde::{Deserialize, Serialize};

/// Options for a single `gather_context` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatherOptions {
    /// Fragments scoring below this are dropped. Must lie in `[0, 1]`.
    #[serde(default)]
    pub min_relevance: f64,

    /// Why context is being gathered. `None` uses the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Trigger>,

    /// Ceiling on the estimated tokens the selected fragments may consume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_budget: Option<usize>,

    /// Explicit cache key. Derived from the other options when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,

    /// Skip the cache lookup (the fresh result is still cached).
    #[serde(default)]
    pub force_refresh: bool,
}

impl GatherOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn min_relevance(mut self, min_relevance: f64) -> Self {
        self.min_relevance = min_relevance;
        self
    }

    pub fn token_budget(mut self, budget: usize) -> Self {
        self.token_budget = Some(budget);
        self
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn force_refresh(mut self) -> Self {
        self.force_refresh = true;
        self
    }
}

/// The outcome of one `gather_context` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatherResult {
    /// Selected fragments, sorted by non-increasing score
    pub contexts: Vec<ScoredFragment>,

    /// Estimated token cost of `contexts`
    pub total_tokens: usize,

    /// Whether this result was served from the cache
    pub cached: bool,

    /// How many providers failed or timed out in the cycle that produced it
    pub errors: usize,
}

impl GatherResult {
    /// Provider names of the selected fragments, in result order.
    pub fn providers(&self) -> Vec<&str> {
        self.contexts.iter().map(|c| c.provider()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_defaults() {
        let options = GatherOptions::default();
        assert_eq!(options.min_relevance, 0.0);
        assert!(options.trigger.is_none());
        assert!(options.token_budget.is_none());
        assert!(options.cache_key.is_none());
        assert!(!options.force_refresh);
    }

    #[test]
    fn options_builder() {
        let options = GatherOptions::new()
            .trigger(Trigger::UserPrompt)
            .min_relevance(0.25)
            .token_budget(500)
            .cache_key("chat")
            .force_refresh();
        assert_eq!(options.trigger, Some(Trigger::UserPrompt));
        assert_eq!(options.min_relevance, 0.25);
        assert_eq!(options.token_budget, Some(500));
        assert_eq!(options.cache_key.as_deref(), Some("chat"));
        assert!(options.force_refresh);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: GatherOptions =
            serde_json::from_str(r#"{"trigger": "navigation", "token_budget": 64}"#).unwrap();
        assert_eq!(options.trigger, Some(Trigger::Navigation));
        assert_eq!(options.token_budget, Some(64));
        assert!(!options.force_refresh);
    }
}
