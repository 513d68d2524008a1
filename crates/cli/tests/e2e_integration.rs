//! End-to-end integration tests for the ContextKeeper engine.
//!
//! These tests drive the full pipeline the CLI runs: providers fed with UI
//! state, registered with a manager, gathered through the cache, scored and
//! cut to a token budget.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use contextkeeper_config::ContextConfig;
use contextkeeper_core::{
    ContextError, ContextEvent, ContextFragment, ContextProvider, GatherOptions, ManualClock,
    ProviderError, Trigger,
};
use contextkeeper_engine::ContextManager;
use contextkeeper_providers::{
    DomProvider, DomSnapshot, FormField, FormProvider, FormSnapshot, UserActionProvider,
    ViewportProvider, ViewportSnapshot,
};

// ── Scripted provider ────────────────────────────────────────────────────

/// A provider whose payload is a single string field, sized on demand.
struct FixedProvider {
    name: String,
    text: String,
    priority: f64,
    fail: bool,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FixedProvider {
    fn new(name: &str, text: &str) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            priority: 1.0,
            fail: false,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Payload `{"t": "..."}` whose compact JSON costs exactly `tokens`
    /// at four characters per token.
    fn costing(name: &str, tokens: usize, priority: f64) -> Self {
        let chars = tokens * 4 - r#"{"t":""}"#.len();
        Self {
            priority,
            ..Self::new(name, &"x".repeat(chars))
        }
    }

    fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(name, "")
        }
    }

    fn hanging(name: &str) -> Self {
        Self {
            delay: Some(Duration::from_secs(30)),
            ..Self::new(name, "late")
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ContextProvider for FixedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> f64 {
        self.priority
    }

    async fn gather(&self) -> Result<ContextFragment, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(ProviderError::failed(&self.name, "backend unavailable"));
        }
        ContextFragment::from_value(
            self.name.as_str(),
            chrono::Utc::now(),
            serde_json::json!({ "t": self.text }),
        )
    }
}

fn manager() -> ContextManager {
    ContextManager::new(ContextConfig::default()).unwrap()
}

fn register(manager: &ContextManager, provider: FixedProvider) -> Arc<FixedProvider> {
    let provider = Arc::new(provider);
    manager.register_provider(provider.clone()).unwrap();
    provider
}

fn checkout_page() -> DomSnapshot {
    DomSnapshot {
        url: "https://shop.example/checkout".into(),
        title: "Checkout".into(),
        headings: vec!["Payment".into()],
        visible_text: "Enter your card details".into(),
        ..Default::default()
    }
}

fn payment_form() -> FormSnapshot {
    FormSnapshot {
        form_id: Some("payment".into()),
        fields: vec![FormField {
            name: "card".into(),
            kind: "credit-card".into(),
            value: Some("4111111111111111".into()),
            valid: false,
            error: Some("Card declined".into()),
        }],
        dirty: true,
    }
}

// ── Built-in providers through the manager ───────────────────────────────

#[tokio::test]
async fn e2e_dom_form_viewport_then_cached_repeat() {
    let manager = manager();

    let dom = DomProvider::new();
    dom.update(checkout_page());
    let form = FormProvider::new();
    form.update(payment_form());
    let viewport = ViewportProvider::new();
    viewport.update(ViewportSnapshot::new(1280, 800));

    manager.register_provider(Arc::new(dom)).unwrap();
    manager.register_provider(Arc::new(form)).unwrap();
    manager.register_provider(Arc::new(viewport)).unwrap();

    let first = manager.gather_context(GatherOptions::new()).await.unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(first.errors, 0);
    assert!(!first.cached);

    let started = std::time::Instant::now();
    let second = manager.gather_context(GatherOptions::new()).await.unwrap();
    assert!(second.cached);
    assert!(started.elapsed() < Duration::from_millis(10));
    assert_eq!(second.contexts, first.contexts);
    assert_eq!(second.total_tokens, first.total_tokens);

    let card = serde_json::to_string(&second).unwrap();
    assert!(!card.contains("4111111111111111"), "card number leaked");
}

#[tokio::test]
async fn e2e_trigger_shapes_the_result() {
    let manager = manager();

    let dom = DomProvider::new();
    dom.update(checkout_page());
    let form = FormProvider::new();
    form.update(payment_form());
    let actions = UserActionProvider::new();
    actions.record("click", Some("#pay".into()));

    manager.register_provider(Arc::new(dom)).unwrap();
    manager.register_provider(Arc::new(form)).unwrap();
    manager.register_provider(Arc::new(actions)).unwrap();

    let on_form = manager
        .gather_context(GatherOptions::new().trigger(Trigger::FormInteraction))
        .await
        .unwrap();
    assert_eq!(on_form.contexts[0].provider(), "form");

    let on_navigation = manager
        .gather_context(GatherOptions::new().trigger(Trigger::Navigation))
        .await
        .unwrap();
    assert!(!on_navigation.providers().contains(&"form"));
    assert_eq!(on_navigation.contexts[0].provider(), "dom");
}

#[tokio::test]
async fn e2e_empty_providers_count_as_errors() {
    let manager = manager();
    manager.register_provider(Arc::new(DomProvider::new())).unwrap();
    manager.register_provider(Arc::new(FormProvider::new())).unwrap();

    let result = manager.gather_context(GatherOptions::new()).await.unwrap();
    assert!(result.is_empty());
    assert_eq!(result.errors, 2);
    assert_eq!(manager.stats().total_errors, 2);
}

// ── Budget and ordering ──────────────────────────────────────────────────

#[tokio::test]
async fn e2e_greedy_budget_skips_and_continues() {
    let manager = manager();
    register(&manager, FixedProvider::costing("A", 300, 0.9));
    register(&manager, FixedProvider::costing("B", 250, 0.8));
    register(&manager, FixedProvider::costing("C", 100, 0.7));

    let result = manager
        .gather_context(GatherOptions::new().token_budget(500))
        .await
        .unwrap();
    assert_eq!(result.providers(), vec!["A", "C"]);
    assert_eq!(result.total_tokens, 400);
}

#[tokio::test]
async fn e2e_budget_and_ordering_hold_for_any_budget() {
    let manager = manager();
    for (i, tokens) in [120, 15, 64, 300, 9, 41].into_iter().enumerate() {
        register(
            &manager,
            FixedProvider::costing(&format!("p{i}"), tokens, 1.0 - i as f64 * 0.1),
        );
    }

    for budget in [0, 10, 50, 100, 250, 600, 10_000] {
        let result = manager
            .gather_context(GatherOptions::new().token_budget(budget))
            .await
            .unwrap();
        assert!(result.total_tokens <= budget, "budget {budget}");
        assert!(result.contexts.windows(2).all(|w| w[0].score >= w[1].score));
    }
}

// ── Isolation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_one_failure_among_healthy_providers() {
    let manager = manager();
    register(&manager, FixedProvider::new("dom", "page"));
    register(&manager, FixedProvider::failing("flaky"));
    register(&manager, FixedProvider::new("form", "fields"));
    register(&manager, FixedProvider::new("viewport", "1280x800"));

    let result = manager.gather_context(GatherOptions::new()).await.unwrap();
    assert_eq!(result.errors, 1);
    assert_eq!(result.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn e2e_hanging_provider_does_not_block_gather() {
    let manager = manager();
    register(&manager, FixedProvider::new("dom", "page"));
    let hanging = register(&manager, FixedProvider::hanging("network"));

    let mut events = manager.subscribe();
    let result = manager.gather_context(GatherOptions::new()).await.unwrap();
    assert_eq!(hanging.calls(), 1);
    assert_eq!(result.errors, 1);
    assert_eq!(result.providers(), vec!["dom"]);

    let event = events.recv().await.unwrap();
    assert!(matches!(
        event.as_ref(),
        ContextEvent::ProviderFailed { timed_out: true, .. }
    ));
}

// ── Cache ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_cache_hit_does_not_reinvoke_providers() {
    let manager = manager();
    let dom = register(&manager, FixedProvider::new("dom", "page"));

    let options = GatherOptions::new().cache_key("chat-turn-1");
    manager.gather_context(options.clone()).await.unwrap();
    let cached = manager.gather_context(options).await.unwrap();

    assert!(cached.cached);
    assert_eq!(dom.calls(), 1);
}

#[tokio::test]
async fn e2e_ttl_expiry_with_simulated_clock() {
    let clock = Arc::new(ManualClock::starting_now());
    let manager = ContextManager::with_clock(ContextConfig::default(), clock.clone()).unwrap();
    let dom = register(&manager, FixedProvider::new("dom", "page"));

    manager.gather_context(GatherOptions::new()).await.unwrap();
    clock.advance(chrono::Duration::milliseconds(29_000));
    assert!(manager.gather_context(GatherOptions::new()).await.unwrap().cached);

    clock.advance(chrono::Duration::milliseconds(2_000));
    let fresh = manager.gather_context(GatherOptions::new()).await.unwrap();
    assert!(!fresh.cached);
    assert_eq!(dom.calls(), 2);
    // Gathered just now: no recency decay, only the undeclared-trigger affinity
    assert_eq!(fresh.contexts[0].score, 0.5);
}

#[tokio::test]
async fn e2e_memory_ceiling_evicts_oldest() {
    let mut config = ContextConfig::default();
    config.cache.max_size_mb = 0.001;
    let ceiling = config.cache.max_size_bytes();
    let manager = ContextManager::new(config).unwrap();
    register(&manager, FixedProvider::new("blob", &"x".repeat(200)));

    for turn in 0..8 {
        manager
            .gather_context(GatherOptions::new().cache_key(format!("turn-{turn}")))
            .await
            .unwrap();
        assert!(manager.stats().cache.memory_usage_bytes <= ceiling);
    }

    let stats = manager.stats().cache;
    assert!(stats.evictions > 0);
    assert!(stats.size < 8);

    // Newest survived, oldest went first
    let newest = manager
        .gather_context(GatherOptions::new().cache_key("turn-7"))
        .await
        .unwrap();
    assert!(newest.cached);
    let oldest = manager
        .gather_context(GatherOptions::new().cache_key("turn-0"))
        .await
        .unwrap();
    assert!(!oldest.cached);
}

// ── Lifecycle ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_destroy_then_use() {
    let manager = manager();
    let dom = DomProvider::new();
    dom.update(checkout_page());
    let dom = Arc::new(dom);
    manager.register_provider(dom.clone()).unwrap();
    manager.gather_context(GatherOptions::new()).await.unwrap();

    manager.destroy();

    assert!(dom.latest().is_none(), "provider was not destroyed");
    assert_eq!(manager.stats().cache.size, 0);
    assert_eq!(
        manager.gather_context(GatherOptions::new()).await.unwrap_err(),
        ContextError::Destroyed
    );
    assert!(matches!(
        manager.unregister_provider("dom"),
        Err(ContextError::Destroyed)
    ));
}

#[tokio::test]
async fn e2e_config_file_drives_manager() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
default_trigger = "user-prompt"
provider_timeout_ms = 250

[cache]
ttl_ms = 5000
max_size_mb = 2.0

[provider_weights]
viewport = 0.1
"#,
    )
    .unwrap();

    let config = ContextConfig::load_from(&path).unwrap();
    assert_eq!(config.default_trigger, Trigger::UserPrompt);

    let manager = ContextManager::new(config).unwrap();
    register(&manager, FixedProvider::new("viewport", "1280x800"));
    register(&manager, FixedProvider::new("dom", "page"));

    let result = manager.gather_context(GatherOptions::new()).await.unwrap();
    assert_eq!(result.providers(), vec!["dom", "viewport"]);
    assert!(result.contexts[1].score < 0.1);
}
