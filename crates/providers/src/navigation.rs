//! Navigation provider — the current route and where the user came from.

use crate::snapshot::to_fragment;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contextkeeper_core::{ContextFragment, ContextProvider, ProviderError, Trigger};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::trace;

pub const DEFAULT_HISTORY: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationEntry {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Serialize)]
struct NavigationPayload<'a> {
    current: &'a NavigationEntry,
    previous: Vec<&'a NavigationEntry>,
}

pub struct NavigationProvider {
    /// Oldest first; the back entry is the current page
    history: Mutex<VecDeque<NavigationEntry>>,
    capacity: usize,
    enabled: AtomicBool,
    triggers: Vec<Trigger>,
}

impl Default for NavigationProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationProvider {
    pub fn new() -> Self {
        Self::with_history(DEFAULT_HISTORY)
    }

    /// Keep at most `capacity` entries, the current page included.
    pub fn with_history(capacity: usize) -> Self {
        Self {
            history: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
            enabled: AtomicBool::new(true),
            triggers: vec![Trigger::Navigation, Trigger::UserPrompt],
        }
    }

    pub fn visit(&self, url: impl Into<String>, title: Option<String>) {
        self.push(NavigationEntry {
            url: url.into(),
            title,
            at: Utc::now(),
        });
    }

    pub fn push(&self, entry: NavigationEntry) {
        trace!(url = %entry.url, "Navigation recorded");
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        if history.len() == self.capacity {
            history.pop_front();
        }
        history.push_back(entry);
    }

    pub fn current(&self) -> Option<NavigationEntry> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .back()
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

#[async_trait]
impl ContextProvider for NavigationProvider {
    fn name(&self) -> &str {
        "navigation"
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn relevant_triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    fn priority(&self) -> f64 {
        0.7
    }

    async fn gather(&self) -> Result<ContextFragment, ProviderError> {
        let history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        let current = history
            .back()
            .ok_or_else(|| ProviderError::NoData(self.name().to_string()))?;
        let payload = NavigationPayload {
            current,
            previous: history.iter().rev().skip(1).collect(),
        };
        to_fragment(self.name(), current.at, &payload)
    }

    fn destroy(&self) {
        self.history.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
