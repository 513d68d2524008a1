//! Token estimation utilities.
//!
//! Uses a character-based heuristic: ~4 characters per token by default.
//! This approximation is accurate within ~10% for BPE tokenizers on English
//! text, which is all the budget selector needs.

use contextkeeper_core::ContextFragment;

pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

/// Deterministic token cost estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenEstimator {
    chars_per_token: usize,
}

impl TokenEstimator {
    /// A zero `chars_per_token` is treated as 1.
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    /// Estimate the token count for a string. Rounds up.
    pub fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }

    /// Estimate the token cost of a fragment's serialized payload.
    pub fn estimate_fragment(&self, fragment: &ContextFragment) -> usize {
        self.estimate(&fragment.serialized_payload())
    }

    pub fn chars_per_token(&self) -> usize {
        self.chars_per_token
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_CHARS_PER_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_string_is_zero() {
        assert_eq!(TokenEstimator::default().estimate(""), 0);
    }

    #[test]
    fn four_chars_is_one_token() {
        assert_eq!(TokenEstimator::default().estimate("test"), 1);
    }

    #[test]
    fn five_chars_rounds_up() {
        assert_eq!(TokenEstimator::default().estimate("hello"), 2);
    }

    #[test]
    fn counts_chars_not_bytes() {
        // 4 chars, 8 bytes
        assert_eq!(TokenEstimator::default().estimate("ñøåé"), 1);
    }

    #[test]
    fn custom_ratio() {
        let estimator = TokenEstimator::new(3);
        assert_eq!(estimator.estimate(&"a".repeat(10)), 4);
        assert_eq!(TokenEstimator::new(0).chars_per_token(), 1);
    }

    #[test]
    fn fragment_cost_uses_serialized_payload() {
        let fragment = ContextFragment::from_value(
            "dom",
            chrono::Utc::now(),
            json!({ "t": "a".repeat(92) }),
        )
        .unwrap();
        // {"t":"…"} adds 8 characters around the value
        assert_eq!(TokenEstimator::default().estimate_fragment(&fragment), 25);
    }
}
