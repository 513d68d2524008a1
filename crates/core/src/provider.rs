//! Context provider trait — the abstraction over sources of runtime state.
//!
//! A provider supplies one named slice of context (the DOM, the focused form,
//! recent user actions, ...) on demand. Providers fail independently: the
//! manager isolates every `gather` call, so a broken provider only costs its
//! own fragment.

use crate::error::ProviderError;
use crate::fragment::ContextFragment;
use crate::trigger::Trigger;
use async_trait::async_trait;
use std::sync::Arc;

/// The core ContextProvider trait.
///
/// Providers must not call back into the manager from inside `gather`.
#[async_trait]
pub trait ContextProvider: Send + Sync {
    /// The unique name of this provider (e.g., "dom", "form").
    fn name(&self) -> &str;

    /// Disabled providers are skipped entirely and never counted as errors.
    fn enabled(&self) -> bool {
        true
    }

    /// Whether this provider takes part in a gather for `trigger`.
    fn should_include(&self, _trigger: &Trigger) -> bool {
        true
    }

    /// Triggers this provider is known to be relevant for.
    ///
    /// Fragments gathered for any other trigger score with the configured
    /// default affinity instead of 1.0.
    fn relevant_triggers(&self) -> &[Trigger] {
        &[]
    }

    /// Static priority in `[0, 1]`, overridable per name in configuration.
    fn priority(&self) -> f64 {
        1.0
    }

    /// Capture this provider's current slice of context.
    async fn gather(&self) -> std::result::Result<ContextFragment, ProviderError>;

    /// Release any resources. Called when the provider leaves the manager.
    fn destroy(&self) {}
}

/// A registry of providers, keyed by name.
///
/// Registration order is preserved: it is the tie-break when two fragments
/// score the same, which keeps gather output deterministic.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ContextProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Register a provider. Replaces any existing provider with the same name
    /// in place, keeping its original position. Returns the replaced provider.
    pub fn register(&mut self, provider: Arc<dyn ContextProvider>) -> Option<Arc<dyn ContextProvider>> {
        match self.position(provider.name()) {
            Some(index) => Some(std::mem::replace(&mut self.providers[index], provider)),
            None => {
                self.providers.push(provider);
                None
            }
        }
    }

    /// Remove a provider by name.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<dyn ContextProvider>> {
        self.position(name).map(|index| self.providers.remove(index))
    }

    /// Get a provider by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ContextProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Registration index of a provider, used for tie-breaking.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.providers.iter().position(|p| p.name() == name)
    }

    /// All providers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ContextProvider>> {
        self.providers.iter()
    }

    /// Enabled providers that want to take part in a gather for `trigger`.
    pub fn included(&self, trigger: &Trigger) -> Vec<Arc<dyn ContextProvider>> {
        self.providers
            .iter()
            .filter(|p| p.enabled() && p.should_include(trigger))
            .cloned()
            .collect()
    }

    /// List all registered provider names.
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn enabled_count(&self) -> usize {
        self.providers.iter().filter(|p| p.enabled()).count()
    }

    /// Remove every provider, returning them in registration order.
    pub fn drain(&mut self) -> Vec<Arc<dyn ContextProvider>> {
        std::mem::take(&mut self.providers)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
