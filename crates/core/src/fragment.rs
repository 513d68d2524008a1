//! Context fragments — one provider's contribution to one gather cycle.

use crate::error::ProviderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The opaque key/value payload a provider returns.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// A single provider's snapshot of runtime state.
///
/// Immutable once built. The manager wraps it in an `Arc` so the gather cycle
/// and the cache entry that stores it share one allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextFragment {
    /// Name of the provider that produced this fragment
    pub provider: String,

    /// When the underlying state was captured
    pub timestamp: DateTime<Utc>,

    /// Provider-specific data
    pub payload: Payload,
}

impl ContextFragment {
    /// Build a fragment stamped with the current wall-clock time.
    pub fn new(provider: impl Into<String>, payload: Payload) -> Self {
        Self::at(provider, Utc::now(), payload)
    }

    /// Build a fragment with an explicit capture time.
    pub fn at(provider: impl Into<String>, timestamp: DateTime<Utc>, payload: Payload) -> Self {
        Self {
            provider: provider.into(),
            timestamp,
            payload,
        }
    }

    /// Build a fragment from any JSON value. Non-object values are rejected.
    pub fn from_value(
        provider: impl Into<String>,
        timestamp: DateTime<Utc>,
        value: serde_json::Value,
    ) -> std::result::Result<Self, ProviderError> {
        let provider = provider.into();
        match value {
            serde_json::Value::Object(payload) => Ok(Self::at(provider, timestamp, payload)),
            other => Err(ProviderError::InvalidPayload {
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
                provider,
            }),
        }
    }

    /// The payload as compact JSON, the form token estimates are taken over.
    pub fn serialized_payload(&self) -> String {
        serde_json::Value::Object(self.payload.clone()).to_string()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// A fragment together with its relevance score for one gather cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredFragment {
    pub fragment: Arc<ContextFragment>,

    /// Relevance in `[0, 1]`
    pub score: f64,
}

impl ScoredFragment {
    pub fn new(fragment: Arc<ContextFragment>, score: f64) -> Self {
        Self { fragment, score }
    }

    /// Name of the provider that produced the underlying fragment.
    pub fn provider(&self) -> &str {
        &self.fragment.provider
    }
}
