//! DOM provider — what the page currently shows.

use crate::snapshot::SnapshotCell;
use async_trait::async_trait;
use contextkeeper_core::{ContextFragment, ContextProvider, ProviderError, Trigger};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Visible text beyond this many characters is cut off.
pub const DEFAULT_MAX_TEXT_CHARS: usize = 4_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DomSnapshot {
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focused_element: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    #[serde(default)]
    pub visible_text: String,
    /// Set when `visible_text` was cut to the provider's limit
    #[serde(default)]
    pub truncated: bool,
}

pub struct DomProvider {
    cell: SnapshotCell<DomSnapshot>,
    triggers: Vec<Trigger>,
    max_text_chars: usize,
}

impl Default for DomProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DomProvider {
    pub fn new() -> Self {
        Self {
            cell: SnapshotCell::new(),
            triggers: vec![Trigger::UserPrompt, Trigger::Navigation, Trigger::Proactive],
            max_text_chars: DEFAULT_MAX_TEXT_CHARS,
        }
    }

    pub fn with_max_text_chars(mut self, max: usize) -> Self {
        self.max_text_chars = max;
        self
    }

    pub fn update(&self, mut snapshot: DomSnapshot) {
        if let Some((cut, _)) = snapshot.visible_text.char_indices().nth(self.max_text_chars) {
            debug!(
                chars = snapshot.visible_text.chars().count(),
                limit = self.max_text_chars,
                "Truncating visible DOM text"
            );
            snapshot.visible_text.truncate(cut);
            snapshot.truncated = true;
        }
        self.cell.update(snapshot);
    }

    pub fn latest(&self) -> Option<DomSnapshot> {
        self.cell.latest()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.cell.set_enabled(enabled);
    }
}

#[async_trait]
impl ContextProvider for DomProvider {
    fn name(&self) -> &str {
        "dom"
    }

    fn enabled(&self) -> bool {
        self.cell.is_enabled()
    }

    fn relevant_triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    fn priority(&self) -> f64 {
        0.9
    }

    async fn gather(&self) -> Result<ContextFragment, ProviderError> {
        self.cell.fragment(self.name())
    }

    fn destroy(&self) {
        self.cell.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(text: &str) -> DomSnapshot {
        DomSnapshot {
            url: "https://app.example/orders".into(),
            title: "Orders".into(),
            headings: vec!["Open orders".into()],
            visible_text: text.into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn no_data_before_first_snapshot() {
        let dom = DomProvider::new();
        assert!(matches!(dom.gather().await, Err(ProviderError::NoData(_))));
    }

    #[tokio::test]
    async fn gathers_latest_snapshot() {
        let dom = DomProvider::new();
        dom.update(page("first"));
        dom.update(page("second"));

        let fragment = dom.gather().await.unwrap();
        assert_eq!(fragment.provider, "dom");
        assert_eq!(fragment.payload["visible_text"], "second");
        assert_eq!(fragment.payload["title"], "Orders");
        assert!(fragment.payload.get("focused_element").is_none());
    }

    #[test]
    fn long_text_is_truncated_on_char_boundary() {
        let dom = DomProvider::new().with_max_text_chars(3);
        dom.update(page("héllo"));
        let snapshot = dom.latest().unwrap();
        assert_eq!(snapshot.visible_text, "hél");
        assert!(snapshot.truncated);

        dom.update(page("ok"));
        assert!(!dom.latest().unwrap().truncated);
    }

    #[tokio::test]
    async fn destroy_forgets_snapshot() {
        let dom = DomProvider::new();
        dom.update(page("x"));
        dom.destroy();
        assert!(dom.gather().await.is_err());
    }
}
