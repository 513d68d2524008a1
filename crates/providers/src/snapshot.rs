//! Shared plumbing for snapshot-backed providers.

use chrono::{DateTime, Utc};
use contextkeeper_core::{ContextFragment, ProviderError};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

/// Serialize `value` into a fragment payload.
pub fn to_fragment<T: Serialize>(
    provider: &str,
    captured_at: DateTime<Utc>,
    value: &T,
) -> Result<ContextFragment, ProviderError> {
    let value = serde_json::to_value(value).map_err(|e| ProviderError::InvalidPayload {
        provider: provider.to_string(),
        reason: e.to_string(),
    })?;
    ContextFragment::from_value(provider, captured_at, value)
}

struct Captured<T> {
    at: DateTime<Utc>,
    value: T,
}

/// The latest snapshot of one kind of state, plus the provider's on/off switch.
pub struct SnapshotCell<T> {
    latest: RwLock<Option<Captured<T>>>,
    enabled: AtomicBool,
}

impl<T> Default for SnapshotCell<T> {
    fn default() -> Self {
        Self {
            latest: RwLock::new(None),
            enabled: AtomicBool::new(true),
        }
    }
}

impl<T: Serialize + Clone> SnapshotCell<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot, stamped with the current time.
    pub fn update(&self, value: T) {
        self.update_at(value, Utc::now());
    }

    /// Replace the snapshot with an explicit capture time.
    pub fn update_at(&self, value: T, at: DateTime<Utc>) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = Some(Captured { at, value });
    }

    /// Edit the current snapshot in place, refreshing its timestamp.
    /// Returns false when there is nothing to edit yet.
    pub fn modify<F: FnOnce(&mut T)>(&self, f: F) -> bool {
        let mut latest = self.latest.write().unwrap_or_else(PoisonError::into_inner);
        match latest.as_mut() {
            Some(captured) => {
                f(&mut captured.value);
                captured.at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn latest(&self) -> Option<T> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.value.clone())
    }

    pub fn captured_at(&self) -> Option<DateTime<Utc>> {
        self.latest
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.at)
    }

    pub fn clear(&self) {
        *self.latest.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Build a fragment from the latest snapshot, or `NoData` if there is none.
    pub fn fragment(&self, provider: &str) -> Result<ContextFragment, ProviderError> {
        let latest = self.latest.read().unwrap_or_else(PoisonError::into_inner);
        let captured = latest
            .as_ref()
            .ok_or_else(|| ProviderError::NoData(provider.to_string()))?;
        to_fragment(provider, captured.at, &captured.value)
    }
}
