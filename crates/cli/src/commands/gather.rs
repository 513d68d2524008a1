//! `contextkeeper gather` — Gather context from a recorded UI snapshot.
//!
//! The snapshot file holds whatever the UI layer would have pushed into the
//! built-in providers. Sections that are missing leave their provider empty,
//! which shows up as a provider error in the result.

use super::load_config;
use clap::Args;
use contextkeeper_core::{ContextProvider, GatherOptions, Trigger};
use contextkeeper_engine::ContextManager;
use contextkeeper_providers::{
    DomProvider, DomSnapshot, FormProvider, FormSnapshot, NavigationProvider,
    PerformanceProvider, PerformanceSnapshot, UserActionProvider, ViewportProvider,
    ViewportSnapshot,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Args)]
pub struct GatherArgs {
    /// JSON file with the UI state to gather from
    #[arg(short, long)]
    pub snapshot: PathBuf,

    /// What prompted the gather (proactive, user-prompt, user-action,
    /// navigation, form-interaction, error, or any custom name)
    #[arg(short, long)]
    pub trigger: Option<String>,

    /// Drop fragments scoring below this (0.0 to 1.0)
    #[arg(long, default_value_t = 0.0)]
    pub min_relevance: f64,

    /// Maximum estimated tokens to return
    #[arg(short, long)]
    pub budget: Option<usize>,

    /// Cache key (derived from the options when omitted)
    #[arg(short, long)]
    pub key: Option<String>,

    /// Run the same gather this many times, to watch the cache work
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,

    /// Skip the cache on every run
    #[arg(long)]
    pub force_refresh: bool,

    /// Print manager stats after the results
    #[arg(long)]
    pub stats: bool,
}

/// Recorded UI state, one optional section per built-in provider.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotFile {
    pub dom: Option<DomSnapshot>,
    pub form: Option<FormSnapshot>,
    pub viewport: Option<ViewportSnapshot>,
    pub performance: Option<PerformanceSnapshot>,
    /// Oldest first
    #[serde(default)]
    pub navigation: Vec<Visit>,
    /// Oldest first
    #[serde(default)]
    pub user_actions: Vec<Action>,
}

#[derive(Debug, Deserialize)]
pub struct Visit {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Action {
    pub kind: String,
    #[serde(default)]
    pub target: Option<String>,
}

impl SnapshotFile {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read snapshot {}: {e}", path.display()))?;
        let snapshot = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse snapshot {}: {e}", path.display()))?;
        Ok(snapshot)
    }

    /// Built-in providers pre-loaded with this snapshot.
    pub fn into_providers(self) -> Vec<Arc<dyn ContextProvider>> {
        let dom = DomProvider::new();
        if let Some(snapshot) = self.dom {
            dom.update(snapshot);
        }
        let form = FormProvider::new();
        if let Some(snapshot) = self.form {
            form.update(snapshot);
        }
        let viewport = ViewportProvider::new();
        if let Some(snapshot) = self.viewport {
            viewport.update(snapshot);
        }
        let navigation = NavigationProvider::new();
        for visit in self.navigation {
            navigation.visit(visit.url, visit.title);
        }
        let performance = PerformanceProvider::new();
        if let Some(snapshot) = self.performance {
            performance.update(snapshot);
        }
        let actions = UserActionProvider::new();
        for action in self.user_actions {
            actions.record(action.kind, action.target);
        }

        vec![
            Arc::new(dom),
            Arc::new(form),
            Arc::new(viewport),
            Arc::new(navigation),
            Arc::new(performance),
            Arc::new(actions),
        ]
    }
}

impl GatherArgs {
    pub fn options(&self) -> GatherOptions {
        let mut options = GatherOptions::new().min_relevance(self.min_relevance);
        if let Some(trigger) = &self.trigger {
            options = options.trigger(Trigger::from(trigger.as_str()));
        }
        if let Some(budget) = self.budget {
            options = options.token_budget(budget);
        }
        if let Some(key) = &self.key {
            options = options.cache_key(key.clone());
        }
        if self.force_refresh {
            options = options.force_refresh();
        }
        options
    }
}

pub async fn run(config_path: Option<&Path>, args: GatherArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let manager = ContextManager::new(config)?;

    let providers = SnapshotFile::load(&args.snapshot)?.into_providers();
    let count = providers.len();
    for provider in providers {
        manager.register_provider(provider)?;
    }
    info!(providers = count, snapshot = %args.snapshot.display(), "Loaded UI snapshot");

    let options = args.options();
    for _ in 0..args.repeat.max(1) {
        let result = manager.gather_context(options.clone()).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&manager.stats())?);
    }

    manager.destroy();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_snapshot() {
        let snapshot: SnapshotFile = serde_json::from_str(
            r##"{
                "dom": {"url": "/checkout", "title": "Checkout"},
                "viewport": {"width": 1280, "height": 800},
                "navigation": [{"url": "/cart"}, {"url": "/checkout", "title": "Checkout"}],
                "user_actions": [{"kind": "click", "target": "#pay"}]
            }"##,
        )
        .unwrap();
        assert!(snapshot.form.is_none());
        assert_eq!(snapshot.navigation.len(), 2);
        assert_eq!(snapshot.into_providers().len(), 6);
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let err = serde_json::from_str::<SnapshotFile>(r#"{"clipboard": {}}"#);
        assert!(err.is_err());
    }

    #[test]
    fn options_from_args() {
        let args = GatherArgs {
            snapshot: PathBuf::from("ui.json"),
            trigger: Some("form-interaction".into()),
            min_relevance: 0.3,
            budget: Some(800),
            key: None,
            repeat: 1,
            force_refresh: true,
            stats: false,
        };
        let options = args.options();
        assert_eq!(options.trigger, Some(Trigger::FormInteraction));
        assert_eq!(options.token_budget, Some(800));
        assert!(options.force_refresh);
        assert!(options.cache_key.is_none());
    }
}
