//! Viewport provider.

use crate::snapshot::SnapshotCell;
use async_trait::async_trait;
use contextkeeper_core::{ContextFragment, ContextProvider, ProviderError, Trigger};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewportSnapshot {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
    #[serde(default = "default_pixel_ratio")]
    pub device_pixel_ratio: f64,
}

fn default_pixel_ratio() -> f64 {
    1.0
}

impl ViewportSnapshot {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scroll_x: 0.0,
            scroll_y: 0.0,
            device_pixel_ratio: default_pixel_ratio(),
        }
    }

    pub fn is_mobile(&self) -> bool {
        self.width < 768
    }
}

pub struct ViewportProvider {
    cell: SnapshotCell<ViewportSnapshot>,
    triggers: Vec<Trigger>,
}

impl Default for ViewportProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewportProvider {
    pub fn new() -> Self {
        Self {
            cell: SnapshotCell::new(),
            triggers: vec![Trigger::Navigation],
        }
    }

    pub fn update(&self, snapshot: ViewportSnapshot) {
        self.cell.update(snapshot);
    }

    /// Record a scroll without resending the whole viewport.
    pub fn scrolled_to(&self, x: f64, y: f64) -> bool {
        self.cell.modify(|v| {
            v.scroll_x = x;
            v.scroll_y = y;
        })
    }

    pub fn latest(&self) -> Option<ViewportSnapshot> {
        self.cell.latest()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.cell.set_enabled(enabled);
    }
}

#[async_trait]
impl ContextProvider for ViewportProvider {
    fn name(&self) -> &str {
        "viewport"
    }

    fn enabled(&self) -> bool {
        self.cell.is_enabled()
    }

    fn relevant_triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    fn priority(&self) -> f64 {
        0.5
    }

    async fn gather(&self) -> Result<ContextFragment, ProviderError> {
        self.cell.fragment(self.name())
    }

    fn destroy(&self) {
        self.cell.clear();
    }
}
