use crate::engine::Outcome;
use crate::error::Result;
use crate::policy::Route;
use serde::{Deserialize, Serialize};
use sopcheck_protocol::{Gap, GapStatus, Verdict};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Default number of gaps listed in the operator summary.
pub const DEFAULT_SUMMARY_LIMIT: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSummary {
    /// Requirements checked
    pub total: usize,
    pub present: usize,
    pub partial: usize,
    pub missing: usize,
    /// Decided MISSING below the low threshold, without a jury
    pub auto_missing: usize,
    /// Passed above the high threshold, without a jury
    pub auto_present: usize,
    /// Sent to the adjudicator
    pub adjudicated: usize,
    /// PRESENT verdicts demoted for lack of grounded evidence
    pub downgraded: usize,
    /// Adjudications that failed after retries or returned an unrecognised answer
    pub jury_errors: usize,
    /// Requirement ids occurring more than once in the index
    pub duplicate_ids: usize,
}

impl VerificationSummary {
    pub(crate) fn record(&mut self, outcome: &Outcome) {
        match outcome.verdict {
            Verdict::Present => self.present += 1,
            Verdict::Partial => self.partial += 1,
            Verdict::Missing => self.missing += 1,
        }
        match outcome.route {
            Route::AutoMissing => self.auto_missing += 1,
            Route::AutoPresent => self.auto_present += 1,
            Route::Adjudicate => self.adjudicated += 1,
        }
        self.downgraded += usize::from(outcome.downgraded);
        self.jury_errors += usize::from(outcome.jury_error);
    }
}

/// Gaps in index order plus run counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub gaps: Vec<Gap>,
    pub summary: VerificationSummary,
}

impl VerificationReport {
    #[must_use]
    pub fn is_compliant(&self) -> bool {
        self.gaps.is_empty()
    }
}

/// Writes the gap array as JSON, replacing `path` atomically.
pub async fn write_gap_report(path: &Path, gaps: &[Gap]) -> Result<()> {
    let json = serde_json::to_vec_pretty(gaps).map_err(std::io::Error::other)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    log::info!("Gap report saved to {}", path.display());
    Ok(())
}

/// Operator-facing text: counts, then the first `limit` gaps.
#[must_use]
pub fn render_summary(report: &VerificationReport, limit: usize) -> String {
    let s = &report.summary;
    let mut out = String::new();
    let _ = writeln!(out, "=== VERIFICATION SUMMARY ===");
    let _ = writeln!(
        out,
        "Requirements checked: {}  (present {}, partial {}, missing {})",
        s.total, s.present, s.partial, s.missing
    );
    let _ = writeln!(
        out,
        "Decisions: {} adjudicated, {} auto-missing, {} auto-present",
        s.adjudicated, s.auto_missing, s.auto_present
    );
    if s.downgraded > 0 || s.jury_errors > 0 || s.duplicate_ids > 0 {
        let _ = writeln!(
            out,
            "Warnings: {} downgraded, {} jury errors, {} duplicate ids",
            s.downgraded, s.jury_errors, s.duplicate_ids
        );
    }

    if report.gaps.is_empty() {
        let _ = writeln!(out, "No gaps found. The SOP covers every reference requirement.");
        return out;
    }

    let _ = writeln!(out, "Total gaps found: {}", report.gaps.len());
    for gap in report.gaps.iter().take(limit) {
        let marker = match gap.status {
            GapStatus::Missing => "MISSING",
            GapStatus::Partial => "PARTIAL",
        };
        let _ = writeln!(out, "- [{marker}] {} ({})", gap.requirement_text, gap.severity);
        let _ = writeln!(out, "  Source: {}", gap.source_reference);
        let _ = writeln!(out, "  Reason: {}", gap.justification);
    }
    if report.gaps.len() > limit {
        let _ = writeln!(out, "... and {} more", report.gaps.len() - limit);
    }
    out
}
