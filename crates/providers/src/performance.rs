//! Performance provider — page timing and resource signals.
//!
//! Mostly useful when something went wrong, so it sits out of gathers
//! driven by form input and navigation.

use crate::snapshot::SnapshotCell;
use async_trait::async_trait;
use contextkeeper_core::{ContextFragment, ContextProvider, ProviderError, Trigger};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_time_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_contentful_paint_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_used_mb: Option<f64>,
    /// Main-thread tasks over 50ms since the last snapshot
    #[serde(default)]
    pub long_tasks: u32,
    #[serde(default)]
    pub failed_requests: u32,
}

impl PerformanceSnapshot {
    pub fn is_degraded(&self) -> bool {
        self.failed_requests > 0 || self.long_tasks > 5
    }
}

pub struct PerformanceProvider {
    cell: SnapshotCell<PerformanceSnapshot>,
    triggers: Vec<Trigger>,
}

impl Default for PerformanceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceProvider {
    pub fn new() -> Self {
        Self {
            cell: SnapshotCell::new(),
            triggers: vec![Trigger::Error],
        }
    }

    pub fn update(&self, snapshot: PerformanceSnapshot) {
        self.cell.update(snapshot);
    }

    pub fn latest(&self) -> Option<PerformanceSnapshot> {
        self.cell.latest()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.cell.set_enabled(enabled);
    }
}

#[async_trait]
impl ContextProvider for PerformanceProvider {
    fn name(&self) -> &str {
        "performance"
    }

    fn enabled(&self) -> bool {
        self.cell.is_enabled()
    }

    fn should_include(&self, trigger: &Trigger) -> bool {
        !matches!(trigger, Trigger::FormInteraction | Trigger::Navigation)
    }

    fn relevant_triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    fn priority(&self) -> f64 {
        0.4
    }

    async fn gather(&self) -> Result<ContextFragment, ProviderError> {
        self.cell.fragment(self.name())
    }

    fn destroy(&self) {
        self.cell.clear();
    }
}
