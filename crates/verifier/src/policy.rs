use crate::config::{DecisionPolicy, VerifierConfig};

/// Where a requirement goes after retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Similarity too weak for any evidence to apply.
    AutoMissing,
    Adjudicate,
    /// Strong enough to pass without a jury (auto-pass policy only).
    AutoPresent,
}

impl VerifierConfig {
    /// Routes a requirement on the best of its top-K scores.
    ///
    /// A score exactly at a threshold counts as reaching it.
    #[must_use]
    pub fn route(&self, best_score: f32) -> Route {
        if best_score < self.low_threshold {
            return Route::AutoMissing;
        }
        match self.policy {
            DecisionPolicy::AutoPass if best_score >= self.high_threshold => Route::AutoPresent,
            _ => Route::Adjudicate,
        }
    }
}
