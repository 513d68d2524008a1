//! Greedy token-budget selection.
//!
//! Walks fragments in score order and keeps each one whose cost still fits.
//! A fragment that would overflow is skipped, not truncated, and the scan
//! continues so smaller, lower-scored fragments can still use the room left.
//! This guarantees the budget is never exceeded; it does not guarantee the
//! best possible packing.

use crate::token::TokenEstimator;
use contextkeeper_core::ScoredFragment;

/// The fragments that fit and what they cost.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub selected: Vec<ScoredFragment>,
    pub total_tokens: usize,
    /// Fragments left out because they would have overflowed the budget
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BudgetSelector {
    estimator: TokenEstimator,
}

impl BudgetSelector {
    pub fn new(estimator: TokenEstimator) -> Self {
        Self { estimator }
    }

    pub fn estimator(&self) -> &TokenEstimator {
        &self.estimator
    }

    /// Select from fragments already sorted by descending score.
    pub fn select(&self, scored: Vec<ScoredFragment>, token_budget: usize) -> Selection {
        select_by(scored, token_budget, |s| self.estimator.estimate_fragment(&s.fragment))
    }

    /// Keep everything, just totalling the cost.
    pub fn select_all(&self, scored: Vec<ScoredFragment>) -> Selection {
        let total_tokens = scored
            .iter()
            .map(|s| self.estimator.estimate_fragment(&s.fragment))
            .sum();
        Selection {
            selected: scored,
            total_tokens,
            skipped: 0,
        }
    }
}

/// Greedy selection with a caller-supplied cost function.
pub fn select_by<F>(scored: Vec<ScoredFragment>, token_budget: usize, cost: F) -> Selection
where
    F: Fn(&ScoredFragment) -> usize,
{
    let mut selection = Selection::default();

    for fragment in scored {
        let tokens = cost(&fragment);
        match selection.total_tokens.checked_add(tokens) {
            Some(total) if total <= token_budget => {
                selection.total_tokens = total;
                selection.selected.push(fragment);
            }
            _ => selection.skipped += 1,
        }
    }

    selection
}
