//! The context manager — orchestrates providers, the prioritizer, the budget
//! selector and the cache.
//!
//! # Gather pipeline
//!
//! 1. Resolve the cache key (explicit, or derived from trigger, relevance
//!    floor and budget)
//! 2. Serve an unexpired cache hit straight away unless `force_refresh`
//! 3. Ask every enabled provider whether it wants in for this trigger
//! 4. Fan out `gather` to all included providers concurrently, each under
//!    its own deadline; failures only cost their own fragment
//! 5. Score, filter by `min_relevance`, select under the token budget
//! 6. Cache the result, update stats, publish a `GatherCompleted` event
//!
//! No lock is held across the fan-out, so registration, stats reads and
//! other gathers interleave freely with a pending gather.

use crate::budget::BudgetSelector;
use crate::prioritizer::RelevancePrioritizer;
use crate::stats::{ContextStats, GatherCounters};
use crate::token::TokenEstimator;
use chrono::Utc;
use contextkeeper_cache::BoundedCache;
use contextkeeper_config::ContextConfig;
use contextkeeper_core::{
    Clock, ContextError, ContextEvent, ContextFragment, ContextProvider, EventBus, GatherOptions,
    GatherResult, ProviderError, ProviderRegistry, SystemClock, Trigger,
};
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Providers and what the prioritizer knows about them, kept under one lock
/// so the two never disagree.
struct ProviderState {
    registry: ProviderRegistry,
    prioritizer: RelevancePrioritizer,
}

pub struct ContextManager {
    config: ContextConfig,
    clock: Arc<dyn Clock>,
    state: RwLock<ProviderState>,
    cache: Arc<Mutex<BoundedCache>>,
    selector: BudgetSelector,
    counters: Mutex<GatherCounters>,
    events: EventBus,
    destroyed: AtomicBool,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ContextManager {
    /// Create a manager on the system clock.
    pub fn new(config: ContextConfig) -> Result<Self, ContextError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a manager reading time from `clock`.
    ///
    /// When `cache.sweep_interval_ms` is set and a tokio runtime is running,
    /// a background task drops expired entries on that interval.
    pub fn with_clock(config: ContextConfig, clock: Arc<dyn Clock>) -> Result<Self, ContextError> {
        config.validate().map_err(|e| ContextError::Config {
            message: e.to_string(),
        })?;

        let cache = Arc::new(Mutex::new(BoundedCache::new(
            config.cache.max_size_bytes(),
            clock.clone(),
        )));
        let sweeper = config
            .cache
            .sweep_interval()
            .and_then(|interval| spawn_sweeper(cache.clone(), interval));

        Ok(Self {
            state: RwLock::new(ProviderState {
                registry: ProviderRegistry::new(),
                prioritizer: RelevancePrioritizer::from_config(&config),
            }),
            selector: BudgetSelector::new(TokenEstimator::new(config.chars_per_token)),
            counters: Mutex::new(GatherCounters::default()),
            events: EventBus::default(),
            destroyed: AtomicBool::new(false),
            sweeper: Mutex::new(sweeper),
            cache,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    // ── Provider registry ─────────────────────────────────────────────

    /// Register a provider, replacing any provider with the same name.
    /// Does not trigger a gather.
    pub fn register_provider(&self, provider: Arc<dyn ContextProvider>) -> Result<(), ContextError> {
        self.ensure_alive()?;
        let name = provider.name().to_string();
        let mut state = self.write_state();
        state
            .prioritizer
            .set_profile(&name, provider.priority(), provider.relevant_triggers().to_vec());
        let replaced = state.registry.register(provider).is_some();
        debug!(provider = %name, replaced, "Registered context provider");
        Ok(())
    }

    /// Remove a provider. Gathers already fanned out to it finish on their own.
    pub fn unregister_provider(
        &self,
        name: &str,
    ) -> Result<Option<Arc<dyn ContextProvider>>, ContextError> {
        self.ensure_alive()?;
        let mut state = self.write_state();
        state.prioritizer.remove_profile(name);
        let removed = state.registry.unregister(name);
        if removed.is_some() {
            debug!(provider = %name, "Unregistered context provider");
        }
        Ok(removed)
    }

    /// Registered provider names in registration order.
    pub fn provider_names(&self) -> Vec<String> {
        self.read_state()
            .registry
            .names()
            .into_iter()
            .map(String::from)
            .collect()
    }

    // ── Gathering ─────────────────────────────────────────────────────

    /// Gather, rank and select context.
    ///
    /// Provider failures never fail the call: they show up in
    /// `GatherResult::errors`. Errors are reserved for invalid options and
    /// use after [`destroy`](Self::destroy).
    pub async fn gather_context(&self, options: GatherOptions) -> Result<GatherResult, ContextError> {
        self.ensure_alive()?;
        validate_options(&options)?;

        let trigger = options
            .trigger
            .clone()
            .unwrap_or_else(|| self.config.default_trigger.clone());
        let cache_key = options
            .cache_key
            .clone()
            .unwrap_or_else(|| derive_cache_key(&trigger, options.min_relevance, options.token_budget));

        if !options.force_refresh {
            if let Some(result) = self.cached(&cache_key) {
                debug!(cache_key = %cache_key, "Context served from cache");
                self.events.publish(ContextEvent::CacheHit {
                    cache_key,
                    timestamp: Utc::now(),
                });
                return Ok(result);
            }
        }

        let started = tokio::time::Instant::now();
        let gather_id = Uuid::new_v4().to_string();
        // Providers stamp fragments with wall-clock time; recency is measured
        // in that frame, advanced by however far the manager clock moves.
        let skew = self.clock.now() - Utc::now();
        let providers = self.read_state().registry.included(&trigger);
        let attempted = providers.len();

        let (fragments, errors) = self.fan_out(&gather_id, providers).await;

        // destroy() may have run while providers were answering
        self.ensure_alive()?;

        let scored = self
            .read_state()
            .prioritizer
            .score(fragments, &trigger, self.clock.now() - skew);
        let relevant = RelevancePrioritizer::filter(scored, options.min_relevance);
        let selection = match options.token_budget {
            Some(budget) => self.selector.select(relevant, budget),
            None => self.selector.select_all(relevant),
        };

        let result = GatherResult {
            contexts: selection.selected,
            total_tokens: selection.total_tokens,
            cached: false,
            errors,
        };

        self.store(&cache_key, &result);

        let duration_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.lock_counters().record(duration_ms, errors);

        info!(
            gather_id = %gather_id,
            cache_key = %cache_key,
            trigger = %trigger,
            providers = attempted,
            fragments = result.contexts.len(),
            skipped_for_budget = selection.skipped,
            errors,
            total_tokens = result.total_tokens,
            duration_ms,
            "Context gathered"
        );
        self.events.publish(ContextEvent::GatherCompleted {
            gather_id,
            cache_key,
            trigger: trigger.to_string(),
            fragments: result.contexts.len(),
            errors,
            total_tokens: result.total_tokens,
            duration_ms,
            timestamp: Utc::now(),
        });

        Ok(result)
    }

    /// Run every provider's `gather` concurrently under the per-provider
    /// deadline. Returns fragments in provider order plus the failure count.
    async fn fan_out(
        &self,
        gather_id: &str,
        providers: Vec<Arc<dyn ContextProvider>>,
    ) -> (Vec<Arc<ContextFragment>>, usize) {
        let timeout = self.config.provider_timeout();

        let calls = providers.into_iter().map(|provider| async move {
            let name = provider.name().to_string();
            let outcome = match tokio::time::timeout(timeout, provider.gather()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderError::Timeout {
                    provider: name.clone(),
                    timeout_ms: timeout.as_millis() as u64,
                }),
            };
            (name, outcome)
        });

        let mut fragments = Vec::new();
        let mut errors = 0;
        for (provider, outcome) in join_all(calls).await {
            match outcome {
                Ok(fragment) => fragments.push(Arc::new(fragment)),
                Err(e) => {
                    errors += 1;
                    warn!(
                        gather_id = %gather_id,
                        provider = %provider,
                        error = %e,
                        "Context provider failed; continuing without it"
                    );
                    self.events.publish(ContextEvent::ProviderFailed {
                        gather_id: gather_id.to_string(),
                        provider,
                        reason: e.to_string(),
                        timed_out: e.is_timeout(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }

        (fragments, errors)
    }

    // ── Cache ─────────────────────────────────────────────────────────

    fn cached(&self, cache_key: &str) -> Option<GatherResult> {
        let mut cache = self.lock_cache();
        cache.get(cache_key).map(|entry| GatherResult {
            cached: true,
            ..entry.result.clone()
        })
    }

    fn store(&self, cache_key: &str, result: &GatherResult) {
        let outcome = self
            .lock_cache()
            .set(cache_key, result.clone(), self.config.cache.ttl());
        match outcome {
            Ok(outcome) if outcome.evicted > 0 => {
                warn!(
                    cache_key = %cache_key,
                    evicted = outcome.evicted,
                    "Evicted cached context to stay under the memory ceiling"
                );
                self.events.publish(ContextEvent::CacheEvicted {
                    count: outcome.evicted,
                    reason: "memory_pressure".into(),
                    timestamp: Utc::now(),
                });
            }
            Ok(_) => {}
            Err(e) => warn!(cache_key = %cache_key, error = %e, "Failed to cache gather result"),
        }
    }

    /// Drop one cached result. Returns whether it existed.
    pub fn invalidate(&self, cache_key: &str) -> bool {
        self.lock_cache().invalidate(cache_key)
    }

    /// Drop all cached results.
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    /// Remove expired cache entries now, returning how many were dropped.
    pub fn sweep_cache(&self) -> usize {
        let swept = self.lock_cache().sweep();
        if swept > 0 {
            self.events.publish(ContextEvent::CacheEvicted {
                count: swept,
                reason: "expired".into(),
                timestamp: Utc::now(),
            });
        }
        swept
    }

    // ── Queries & lifecycle ───────────────────────────────────────────

    pub fn stats(&self) -> ContextStats {
        let (providers, enabled_providers) = {
            let state = self.read_state();
            (state.registry.len(), state.registry.enabled_count())
        };
        let counters = self.lock_counters();
        ContextStats {
            total_gatherings: counters.total_gatherings,
            total_errors: counters.total_errors,
            avg_gather_time_ms: counters.avg_gather_time_ms,
            providers,
            enabled_providers,
            cache: self.lock_cache().stats(),
        }
    }

    /// Zero the gather counters. Cache hit/miss counters are untouched.
    pub fn reset_stats(&self) {
        self.lock_counters().reset();
    }

    /// Subscribe to gather, cache and provider-failure events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ContextEvent>> {
        self.events.subscribe()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Tear the manager down: stop the sweeper, release the cache, and
    /// destroy and forget every provider. Later gathers fail with
    /// [`ContextError::Destroyed`]. Calling it twice is harmless.
    pub fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Some(handle) = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }

        self.lock_cache().clear();

        let providers = {
            let mut state = self.write_state();
            state.prioritizer.clear();
            state.registry.drain()
        };
        for provider in &providers {
            provider.destroy();
        }

        info!(providers = providers.len(), "Context manager destroyed");
    }

    fn ensure_alive(&self) -> Result<(), ContextError> {
        if self.is_destroyed() {
            return Err(ContextError::Destroyed);
        }
        Ok(())
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ProviderState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ProviderState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_cache(&self) -> MutexGuard<'_, BoundedCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_counters(&self) -> MutexGuard<'_, GatherCounters> {
        self.counters.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ContextManager {
    fn drop(&mut self) {
        if let Some(handle) = self
            .sweeper
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

/// Deterministic key for requests that did not name one.
pub fn derive_cache_key(trigger: &Trigger, min_relevance: f64, token_budget: Option<usize>) -> String {
    let budget = token_budget.map_or_else(|| "none".to_string(), |b| b.to_string());
    format!("auto|{trigger}|{min_relevance}|{budget}")
}

fn validate_options(options: &GatherOptions) -> Result<(), ContextError> {
    if !(0.0..=1.0).contains(&options.min_relevance) {
        return Err(ContextError::InvalidOptions(format!(
            "min_relevance must be between 0.0 and 1.0, got {}",
            options.min_relevance
        )));
    }
    if options.cache_key.as_deref().is_some_and(str::is_empty) {
        return Err(ContextError::InvalidOptions("cache_key must not be empty".into()));
    }
    Ok(())
}

fn spawn_sweeper(cache: Arc<Mutex<BoundedCache>>, interval: Duration) -> Option<JoinHandle<()>> {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!("No tokio runtime; periodic cache sweep disabled");
        return None;
    };

    Some(runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let swept = cache.lock().unwrap_or_else(PoisonError::into_inner).sweep();
            if swept > 0 {
                debug!(swept, "Swept expired context from cache");
            }
        }
    }))
}
