//! User action provider — a bounded ring of the most recent interactions.

use crate::snapshot::to_fragment;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use contextkeeper_core::{ContextFragment, ContextProvider, ProviderError, Trigger};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

pub const DEFAULT_CAPACITY: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAction {
    /// "click", "input", "submit", ...
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    pub at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ActionsPayload<'a> {
    count: usize,
    /// Newest first
    actions: Vec<&'a UserAction>,
}

pub struct UserActionProvider {
    actions: Mutex<VecDeque<UserAction>>,
    capacity: usize,
    enabled: AtomicBool,
    triggers: Vec<Trigger>,
}

impl Default for UserActionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl UserActionProvider {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            actions: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            capacity: capacity.max(1),
            enabled: AtomicBool::new(true),
            triggers: vec![Trigger::UserAction, Trigger::Error, Trigger::UserPrompt],
        }
    }

    pub fn record(&self, kind: impl Into<String>, target: Option<String>) {
        self.push(UserAction {
            kind: kind.into(),
            target,
            at: Utc::now(),
        });
    }

    pub fn push(&self, action: UserAction) {
        let mut actions = self.actions.lock().unwrap_or_else(PoisonError::into_inner);
        if actions.len() == self.capacity {
            actions.pop_front();
        }
        actions.push_back(action);
    }

    pub fn recent(&self) -> Vec<UserAction> {
        self.actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .cloned()
            .collect()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

#[async_trait]
impl ContextProvider for UserActionProvider {
    fn name(&self) -> &str {
        "user-actions"
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn relevant_triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    fn priority(&self) -> f64 {
        0.8
    }

    async fn gather(&self) -> Result<ContextFragment, ProviderError> {
        let actions = self.actions.lock().unwrap_or_else(PoisonError::into_inner);
        let newest = actions
            .back()
            .ok_or_else(|| ProviderError::NoData(self.name().to_string()))?;
        let payload = ActionsPayload {
            count: actions.len(),
            actions: actions.iter().rev().collect(),
        };
        to_fragment(self.name(), newest.at, &payload)
    }

    fn destroy(&self) {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}
