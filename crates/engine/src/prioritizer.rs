//! Relevance scoring for gathered fragments.
//!
//! Each fragment scores `weight × affinity × recency`, every factor in
//! `[0, 1]`:
//!
//! | Factor | Source |
//! |--------|--------|
//! | Weight | `provider_weights` override, else the provider's declared priority |
//! | Affinity | 1.0 if the provider declared the trigger, else `default_affinity` |
//! | Recency | `0.5 ^ (age / half_life)`, 1.0 for fragments captured "now" |
//!
//! Sorting is stable, so fragments that tie keep the order they were passed
//! in. The manager passes them in provider registration order.

use chrono::{DateTime, Utc};
use contextkeeper_config::ContextConfig;
use contextkeeper_core::{ContextFragment, ScoredFragment, Trigger};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// What the prioritizer knows about one registered provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderProfile {
    pub weight: f64,
    pub triggers: Vec<Trigger>,
}

pub struct RelevancePrioritizer {
    default_affinity: f64,
    half_life: Duration,
    weight_overrides: HashMap<String, f64>,
    profiles: HashMap<String, ProviderProfile>,
}

impl RelevancePrioritizer {
    pub fn new(default_affinity: f64, half_life: Duration) -> Self {
        Self {
            default_affinity: default_affinity.clamp(0.0, 1.0),
            half_life,
            weight_overrides: HashMap::new(),
            profiles: HashMap::new(),
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(config.default_affinity, config.recency_half_life())
            .with_weight_overrides(config.provider_weights.clone())
    }

    /// Weights that win over whatever providers declare for themselves.
    pub fn with_weight_overrides(mut self, overrides: HashMap<String, f64>) -> Self {
        self.weight_overrides = overrides;
        self
    }

    /// Record a provider's declared priority and relevant triggers.
    pub fn set_profile(&mut self, name: &str, priority: f64, triggers: Vec<Trigger>) {
        let weight = self
            .weight_overrides
            .get(name)
            .copied()
            .unwrap_or(priority);
        self.profiles.insert(
            name.to_string(),
            ProviderProfile {
                weight: clamp_unit(weight),
                triggers,
            },
        );
    }

    pub fn remove_profile(&mut self, name: &str) -> Option<ProviderProfile> {
        self.profiles.remove(name)
    }

    pub fn clear(&mut self) {
        self.profiles.clear();
    }

    pub fn profile(&self, name: &str) -> Option<&ProviderProfile> {
        self.profiles.get(name)
    }

    /// Weight for a provider. Fragments from providers with no profile (for
    /// instance one unregistered mid-gather) fall back to the override or 1.0.
    pub fn weight(&self, provider: &str) -> f64 {
        match self.profiles.get(provider) {
            Some(profile) => profile.weight,
            None => clamp_unit(self.weight_overrides.get(provider).copied().unwrap_or(1.0)),
        }
    }

    pub fn affinity(&self, provider: &str, trigger: &Trigger) -> f64 {
        let declared = self
            .profiles
            .get(provider)
            .is_some_and(|p| p.triggers.contains(trigger));
        if declared { 1.0 } else { self.default_affinity }
    }

    /// Exponential decay of the fragment's age. Future timestamps count as fresh.
    pub fn recency(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let age_ms = (now - timestamp).num_milliseconds();
        let half_life_ms = self.half_life.as_millis() as f64;
        if age_ms <= 0 || half_life_ms <= 0.0 {
            return 1.0;
        }
        0.5_f64.powf(age_ms as f64 / half_life_ms)
    }

    /// Score and sort fragments, highest first.
    pub fn score(
        &self,
        fragments: Vec<Arc<ContextFragment>>,
        trigger: &Trigger,
        now: DateTime<Utc>,
    ) -> Vec<ScoredFragment> {
        let mut scored: Vec<ScoredFragment> = fragments
            .into_iter()
            .map(|fragment| {
                let score = self.weight(&fragment.provider)
                    * self.affinity(&fragment.provider, trigger)
                    * self.recency(fragment.timestamp, now);
                ScoredFragment::new(fragment, clamp_unit(score))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored
    }

    /// Keep fragments scoring at least `min_relevance`, preserving order.
    pub fn filter(scored: Vec<ScoredFragment>, min_relevance: f64) -> Vec<ScoredFragment> {
        scored
            .into_iter()
            .filter(|s| s.score >= min_relevance)
            .collect()
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}
