//! Error types for the ContextKeeper domain.
//!
//! Provider failures, manager misuse and cache sizing problems each get their
//! own enum.

use thiserror::Error;

/// Why a single provider produced no fragment in a gather cycle.
///
/// These never escape `gather_context`; they are counted and logged.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("Provider '{provider}' failed: {reason}")]
    GatherFailed { provider: String, reason: String },

    #[error("Provider '{provider}' timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("Provider '{0}' has no data yet")]
    NoData(String),

    #[error("Provider '{provider}' returned an invalid payload: {reason}")]
    InvalidPayload { provider: String, reason: String },
}

impl ProviderError {
    /// Shorthand for a generic gather failure.
    pub fn failed(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::GatherFailed {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Whether this failure was the per-provider deadline firing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Errors surfaced to callers of the context manager.
///
/// Only program-level misuse ends up here; provider problems do not.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ContextError {
    #[error("context manager has been destroyed")]
    Destroyed,

    #[error("invalid gather options: {0}")]
    InvalidOptions(String),

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to measure cache entry '{key}': {reason}")]
    Sizing { key: String, reason: String },
}
