use serde::Deserialize;
use sopcheck_completion::{extract_json_object, CompletionError, RetryPolicy, TextCompletion};
use sopcheck_protocol::{EvidenceChunk, Verdict, NOT_FOUND};
use std::sync::Arc;

/// Parsed jury answer, before evidence grounding is enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjudication {
    pub verdict: Verdict,
    pub justification: String,
    /// Verbatim excerpt, `None` when the jury quoted nothing.
    pub sop_evidence: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JuryResponse {
    status: String,
    justification: String,
    #[serde(default)]
    sop_evidence: Option<String>,
}

/// Semantic jury resolving ambiguous retrieval results.
pub struct Adjudicator {
    completion: Arc<dyn TextCompletion>,
    retry: RetryPolicy,
}

impl Adjudicator {
    pub fn new(completion: Arc<dyn TextCompletion>, retry: RetryPolicy) -> Self {
        Self { completion, retry }
    }

    /// Asks the jury about one requirement.
    ///
    /// Transient service errors are retried; an unrecognised answer is not.
    pub async fn adjudicate(
        &self,
        requirement_id: &str,
        requirement: &str,
        evidence: &[&EvidenceChunk],
    ) -> Result<Adjudication, CompletionError> {
        let prompt = build_prompt(requirement, evidence);
        let label = format!("adjudicate {requirement_id}");
        let reply = self
            .retry
            .run(&label, || self.completion.complete(&prompt))
            .await?;
        parse_response(&reply)
    }
}

fn build_prompt(requirement: &str, evidence: &[&EvidenceChunk]) -> String {
    let mut evidence_text = String::new();
    for chunk in evidence {
        evidence_text.push_str(&format!(
            "---\n[Page {}]\n{}\n",
            chunk.source_location.page, chunk.text
        ));
    }

    format!(
        r#"You are a rigorous Compliance Auditor.

TASK: Compare the "Reference Requirement" against the provided "SOP Evidence" excerpts.
Determine if the requirement is fully satisfied.

Reference Requirement:
"{requirement}"

SOP Evidence (best potential matches found):
{evidence_text}
INSTRUCTIONS:
1. If the evidence explicitly confirms the requirement, matching its intent and key details, output PRESENT.
2. If the concept is mentioned but key specific details from the requirement are missing, output PARTIAL.
3. If the evidence is irrelevant, contradictory or too vague, output MISSING.
4. Quote the sentence that supports your decision VERBATIM from the SOP Evidence in "sop_evidence". If nothing supports it, use "{NOT_FOUND}".

OUTPUT FORMAT:
{{
    "status": "PRESENT | PARTIAL | MISSING",
    "justification": "One sentence explanation.",
    "sop_evidence": "verbatim excerpt or {NOT_FOUND}"
}}

Return ONLY valid JSON."#
    )
}

/// Strict parse of the canonical `{status, justification, sop_evidence}` object.
pub fn parse_response(reply: &str) -> Result<Adjudication, CompletionError> {
    let snippet = || reply.chars().take(80).collect::<String>();
    let span = extract_json_object(reply)
        .ok_or_else(|| CompletionError::Parse(format!("no JSON object in reply: {}", snippet())))?;
    let raw: JuryResponse = serde_json::from_str(span)
        .map_err(|e| CompletionError::Parse(format!("{e}: {}", snippet())))?;
    let verdict = Verdict::parse_label(&raw.status)
        .ok_or_else(|| CompletionError::Parse(format!("unknown status '{}'", raw.status)))?;

    let sop_evidence = raw
        .sop_evidence
        .map(|text| text.trim().to_string())
        .filter(|text| !is_trivial_excerpt(text));

    Ok(Adjudication {
        verdict,
        justification: raw.justification.trim().to_string(),
        sop_evidence,
    })
}

/// True for excerpts that cannot ground a verdict: no alphanumeric word at
/// all, or a placeholder such as "Not Found.", "N/A" or "None".
pub(crate) fn is_trivial_excerpt(text: &str) -> bool {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect();
    if words.is_empty() {
        return true;
    }
    let phrase = words.join(" ");
    phrase == NOT_FOUND.to_lowercase()
        || matches!(
            phrase.as_str(),
            "n a" | "na" | "none" | "null" | "nil" | "not applicable" | "no evidence"
        )
}
