//! Form provider — the form the user is filling in, if any.
//!
//! Values of password-like fields never leave the provider.

use crate::snapshot::SnapshotCell;
use async_trait::async_trait;
use contextkeeper_core::{ContextFragment, ContextProvider, ProviderError, Trigger};
use serde::{Deserialize, Serialize};

const SENSITIVE_KINDS: &[&str] = &["password", "credit-card", "secret"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub name: String,
    /// Input type, e.g. "text", "email", "password"
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default = "default_true")]
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FormField {
    pub fn is_sensitive(&self) -> bool {
        SENSITIVE_KINDS.contains(&self.kind.as_str())
    }
}

fn default_kind() -> String {
    "text".into()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    pub fields: Vec<FormField>,
    #[serde(default)]
    pub dirty: bool,
}

impl FormSnapshot {
    pub fn invalid_fields(&self) -> impl Iterator<Item = &FormField> {
        self.fields.iter().filter(|f| !f.valid)
    }
}

pub struct FormProvider {
    cell: SnapshotCell<FormSnapshot>,
    triggers: Vec<Trigger>,
}

impl Default for FormProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl FormProvider {
    pub fn new() -> Self {
        Self {
            cell: SnapshotCell::new(),
            triggers: vec![Trigger::FormInteraction, Trigger::UserAction],
        }
    }

    /// Store a snapshot, dropping the values of sensitive fields.
    pub fn update(&self, mut snapshot: FormSnapshot) {
        for field in snapshot.fields.iter_mut().filter(|f| f.is_sensitive()) {
            field.value = None;
        }
        self.cell.update(snapshot);
    }

    /// The user left the form.
    pub fn clear(&self) {
        self.cell.clear();
    }

    pub fn latest(&self) -> Option<FormSnapshot> {
        self.cell.latest()
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.cell.set_enabled(enabled);
    }
}

#[async_trait]
impl ContextProvider for FormProvider {
    fn name(&self) -> &str {
        "form"
    }

    fn enabled(&self) -> bool {
        self.cell.is_enabled()
    }

    /// Only worth asking when a form is plausibly involved.
    fn should_include(&self, trigger: &Trigger) -> bool {
        !matches!(trigger, Trigger::Navigation)
    }

    fn relevant_triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    fn priority(&self) -> f64 {
        0.8
    }

    async fn gather(&self) -> Result<ContextFragment, ProviderError> {
        self.cell.fragment(self.name())
    }

    fn destroy(&self) {
        self.cell.clear();
    }
}
