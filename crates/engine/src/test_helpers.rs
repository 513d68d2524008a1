//! Shared test helpers for manager tests.

use async_trait::async_trait;
use contextkeeper_core::{ContextFragment, ContextProvider, ProviderError, Trigger};
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// How a mock provider answers `gather`.
pub enum Behavior {
    /// Return `{"source": name, "text": text}`
    Text(String),
    Fail,
    /// Sleep before answering; pair with a paused tokio clock.
    Slow(Duration),
}

/// A scripted provider that counts how often it is asked for context.
pub struct MockProvider {
    name: String,
    behavior: Behavior,
    triggers: Vec<Trigger>,
    include: Option<Vec<Trigger>>,
    priority: f64,
    enabled: AtomicBool,
    calls: AtomicUsize,
    destroyed: AtomicBool,
}

impl MockProvider {
    pub fn new(name: &str, behavior: Behavior) -> Self {
        Self {
            name: name.to_string(),
            behavior,
            triggers: vec![],
            include: None,
            priority: 1.0,
            enabled: AtomicBool::new(true),
            calls: AtomicUsize::new(0),
            destroyed: AtomicBool::new(false),
        }
    }

    pub fn text(name: &str, text: &str) -> Self {
        Self::new(name, Behavior::Text(text.to_string()))
    }

    pub fn failing(name: &str) -> Self {
        Self::new(name, Behavior::Fail)
    }

    pub fn slow(name: &str, delay: Duration) -> Self {
        Self::new(name, Behavior::Slow(delay))
    }

    /// Declare relevance to these triggers.
    pub fn relevant_to(mut self, triggers: Vec<Trigger>) -> Self {
        self.triggers = triggers;
        self
    }

    /// Only take part in gathers for these triggers.
    pub fn only_for(mut self, triggers: Vec<Trigger>) -> Self {
        self.include = Some(triggers);
        self
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn was_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn should_include(&self, trigger: &Trigger) -> bool {
        self.include.as_ref().is_none_or(|only| only.contains(trigger))
    }

    fn relevant_triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    fn priority(&self) -> f64 {
        self.priority
    }

    async fn gather(&self) -> Result<ContextFragment, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Text(text) => ContextFragment::from_value(
                self.name.as_str(),
                chrono::Utc::now(),
                json!({ "source": self.name, "text": text }),
            ),
            Behavior::Fail => Err(ProviderError::failed(self.name.as_str(), "scripted failure")),
            Behavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                ContextFragment::from_value(
                    self.name.as_str(),
                    chrono::Utc::now(),
                    json!({ "source": self.name, "slow": true }),
                )
            }
        }
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}
