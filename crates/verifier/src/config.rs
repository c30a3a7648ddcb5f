use crate::error::{Result, VerifyError};
use serde::{Deserialize, Serialize};

/// How strong retrieval matches are decided.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPolicy {
    /// Every match at or above the low threshold goes to the adjudicator.
    #[default]
    AlwaysAdjudicate,
    /// Matches at or above the high threshold pass without an adjudicator call.
    AutoPass,
}

impl DecisionPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AlwaysAdjudicate => "always_adjudicate",
            Self::AutoPass => "auto_pass",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    pub policy: DecisionPolicy,
    /// Best scores below this are MISSING without an adjudicator call.
    pub low_threshold: f32,
    /// Auto-pass threshold; only consulted by [`DecisionPolicy::AutoPass`].
    pub high_threshold: f32,
    /// Evidence chunks retrieved per requirement.
    pub top_k: usize,
    /// Adjudications in flight at once.
    pub max_concurrency: usize,
    /// Downgrade PRESENT verdicts whose excerpt is not a quote of the retrieved evidence.
    pub require_verbatim_evidence: bool,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            policy: DecisionPolicy::default(),
            low_threshold: 0.35,
            high_threshold: 0.90,
            top_k: 3,
            max_concurrency: 4,
            require_verbatim_evidence: true,
        }
    }
}

impl VerifierConfig {
    pub fn validate(&self) -> Result<()> {
        let in_unit = |v: f32| (0.0..=1.0).contains(&v);
        if !in_unit(self.low_threshold) || !in_unit(self.high_threshold) {
            return Err(VerifyError::Config(format!(
                "thresholds must lie in [0, 1] (low {}, high {})",
                self.low_threshold, self.high_threshold
            )));
        }
        if self.low_threshold > self.high_threshold {
            return Err(VerifyError::Config(format!(
                "low_threshold {} exceeds high_threshold {}",
                self.low_threshold, self.high_threshold
            )));
        }
        if self.top_k == 0 {
            return Err(VerifyError::Config("top_k must be at least 1".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(VerifyError::Config(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
