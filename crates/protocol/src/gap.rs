use crate::requirement::{AtomicRequirement, ObligationStrength};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder used wherever no evidence excerpt backs a decision.
pub const NOT_FOUND: &str = "Not Found";

/// Final per-requirement decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Present,
    Partial,
    Missing,
}

impl Verdict {
    /// Strict parse of an adjudicator status label.
    #[must_use]
    pub fn parse_label(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PRESENT" => Some(Self::Present),
            "PARTIAL" => Some(Self::Partial),
            "MISSING" => Some(Self::Missing),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Present => "PRESENT",
            Self::Partial => "PARTIAL",
            Self::Missing => "MISSING",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a materialized gap. There is no PRESENT variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum GapStatus {
    Partial,
    Missing,
}

impl GapStatus {
    #[must_use]
    pub const fn from_verdict(verdict: Verdict) -> Option<Self> {
        match verdict {
            Verdict::Present => None,
            Verdict::Partial => Some(Self::Partial),
            Verdict::Missing => Some(Self::Missing),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Partial => "PARTIAL",
            Self::Missing => "MISSING",
        }
    }
}

impl fmt::Display for GapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Gap {
    pub requirement_id: String,
    pub status: GapStatus,
    pub requirement_text: String,
    pub origin_context: String,
    pub source_reference: String,
    pub severity: ObligationStrength,
    pub sop_evidence: String,
    pub justification: String,
}

impl Gap {
    /// Projects a non-PRESENT decision on `requirement` into a gap.
    ///
    /// Returns `None` for PRESENT verdicts.
    #[must_use]
    pub fn from_decision(
        requirement: &AtomicRequirement,
        verdict: Verdict,
        sop_evidence: Option<&str>,
        justification: impl Into<String>,
    ) -> Option<Self> {
        let status = GapStatus::from_verdict(verdict)?;
        let sop_evidence = match status {
            GapStatus::Missing => NOT_FOUND.to_string(),
            GapStatus::Partial => sop_evidence
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .unwrap_or(NOT_FOUND)
                .to_string(),
        };
        Some(Self {
            requirement_id: requirement.id.clone(),
            status,
            requirement_text: requirement.text.clone(),
            origin_context: requirement.origin_context.clone(),
            source_reference: format!(
                "{} ({})",
                requirement.source_document, requirement.source_location
            ),
            severity: requirement.obligation_strength,
            sop_evidence,
            justification: justification.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::requirement::SourceLocation;
    use pretty_assertions::assert_eq;

    fn requirement() -> AtomicRequirement {
        AtomicRequirement {
            id: "ich.pdf-12-2".to_string(),
            text: "The Investigator should be qualified by training".to_string(),
            obligation_strength: ObligationStrength::Should,
            source_document: "ich.pdf".to_string(),
            source_location: SourceLocation::page(12),
            origin_context: "The Investigator should be qualified by education, training, and experience.".to_string(),
            embedding: vec![1.0],
        }
    }

    #[test]
    fn present_never_becomes_a_gap() {
        assert!(Gap::from_decision(&requirement(), Verdict::Present, Some("x"), "ok").is_none());
    }

    #[test]
    fn missing_gap_discards_any_excerpt() {
        let gap = Gap::from_decision(&requirement(), Verdict::Missing, Some("something"), "no")
            .unwrap();
        assert_eq!(gap.status, GapStatus::Missing);
        assert_eq!(gap.sop_evidence, NOT_FOUND);
        assert_eq!(gap.source_reference, "ich.pdf (Page 12)");
        assert_eq!(gap.severity, ObligationStrength::Should);
    }

    #[test]
    fn partial_gap_keeps_trimmed_excerpt() {
        let gap = Gap::from_decision(&requirement(), Verdict::Partial, Some("  trained staff "), "partly")
            .unwrap();
        assert_eq!(gap.sop_evidence, "trained staff");
        let blank = Gap::from_decision(&requirement(), Verdict::Partial, Some("   "), "partly").unwrap();
        assert_eq!(blank.sop_evidence, NOT_FOUND);
    }

    #[test]
    fn gap_json_uses_report_field_names() {
        let gap = Gap::from_decision(&requirement(), Verdict::Missing, None, "no match").unwrap();
        let json = serde_json::to_value(&gap).unwrap();
        for field in [
            "requirement_id",
            "status",
            "requirement_text",
            "origin_context",
            "source_reference",
            "severity",
            "sop_evidence",
            "justification",
        ] {
            assert!(json.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(json["status"], "MISSING");
    }

    #[test]
    fn verdict_labels_are_strict() {
        assert_eq!(Verdict::parse_label(" present "), Some(Verdict::Present));
        assert_eq!(Verdict::parse_label("WEAK"), None);
        assert_eq!(Verdict::parse_label(""), None);
    }
}
