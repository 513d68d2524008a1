//! # ContextKeeper Core
//!
//! Domain types, traits, and error definitions for the ContextKeeper
//! context engine. This crate has **no engine logic** — it defines the
//! domain model that the cache, engine and provider crates implement against.
//!
//! ## Design Philosophy
//!
//! Every seam is defined here:
//! - [`ContextProvider`] is the pluggable source of one slice of context
//! - [`Clock`] lets tests drive TTL expiry and recency decay deterministically
//! - [`EventBus`] lets telemetry and UI collaborators observe the engine
//!   without being called by it

pub mod clock;
pub mod error;
pub mod event;
pub mod fragment;
pub mod gather;
pub mod provider;
pub mod trigger;

// Re-export key types at crate root for ergonomics
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CacheError, ContextError, ProviderError};
pub use event::{ContextEvent, EventBus};
pub use fragment::{ContextFragment, Payload, ScoredFragment};
pub use gather::{GatherOptions, GatherResult};
pub use provider::{ContextProvider, ProviderRegistry};
pub use trigger::Trigger;
