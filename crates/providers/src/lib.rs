//! Built-in context providers.
//!
//! Each provider holds the latest snapshot of one slice of runtime state.
//! The UI layer pushes snapshots in (`update`, `visit`, `record`) whenever
//! something changes; the manager pulls them out during a gather. Until the
//! first snapshot arrives a provider answers with `ProviderError::NoData`,
//! which the manager counts as an ordinary provider failure.

pub mod dom;
pub mod form;
pub mod navigation;
pub mod performance;
pub mod snapshot;
pub mod user_action;
pub mod viewport;

pub use dom::{DomProvider, DomSnapshot};
pub use form::{FormField, FormProvider, FormSnapshot};
pub use navigation::{NavigationEntry, NavigationProvider};
pub use performance::{PerformanceProvider, PerformanceSnapshot};
pub use snapshot::{SnapshotCell, to_fragment};
pub use user_action::{UserAction, UserActionProvider};
pub use viewport::{ViewportProvider, ViewportSnapshot};

use contextkeeper_core::ContextProvider;
use std::sync::Arc;

/// One of each built-in provider, in the order they should be registered.
pub fn defaults() -> Vec<Arc<dyn ContextProvider>> {
    vec![
        Arc::new(DomProvider::new()),
        Arc::new(FormProvider::new()),
        Arc::new(ViewportProvider::new()),
        Arc::new(NavigationProvider::new()),
        Arc::new(PerformanceProvider::new()),
        Arc::new(UserActionProvider::new()),
    ]
}
