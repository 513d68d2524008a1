//! # ContextKeeper Engine
//!
//! Everything between "what do the providers know" and "what fits in the
//! prompt":
//!
//! - [`ContextManager`] owns the providers and runs the gather pipeline
//! - [`RelevancePrioritizer`] scores fragments by weight, trigger affinity
//!   and recency
//! - [`BudgetSelector`] keeps the highest-scoring fragments that fit a token
//!   budget
//! - [`TokenEstimator`] is the character-count heuristic both of them share

pub mod budget;
pub mod manager;
pub mod prioritizer;
pub mod stats;
pub mod token;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use budget::{BudgetSelector, Selection};
pub use manager::{ContextManager, derive_cache_key};
pub use prioritizer::{ProviderProfile, RelevancePrioritizer};
pub use stats::ContextStats;
pub use token::{DEFAULT_CHARS_PER_TOKEN, TokenEstimator};
