use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use sopcheck_completion::{extract_json_array, RetryPolicy, TextCompletion};
use sopcheck_protocol::{
    requirement_id, AtomicRequirement, ObligationStrength, Passage, Requirement,
};
use std::sync::Arc;

/// Marker a completion service uses to refuse an ambiguous passage.
pub const NORMALIZATION_FAILED: &str = "NORMALIZATION_FAILED";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Passages of one document decomposed at the same time.
    pub concurrency: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self { concurrency: 2 }
    }
}

#[derive(Debug, Deserialize)]
struct RawRequirement {
    requirement_text: String,
    #[serde(default)]
    severity: Option<String>,
}

/// Decomposes prose into atomic, independently auditable requirements.
pub struct Normalizer {
    completion: Arc<dyn TextCompletion>,
    retry: RetryPolicy,
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(
        completion: Arc<dyn TextCompletion>,
        retry: RetryPolicy,
        config: NormalizerConfig,
    ) -> Self {
        Self {
            completion,
            retry,
            config,
        }
    }

    /// Decomposes one passage.
    ///
    /// Never fails: any service or format problem yields exactly one
    /// decomposition failure record for the passage. Blank passages yield nothing.
    pub async fn decompose(&self, passage: &Passage) -> Vec<Requirement> {
        if passage.text.trim().is_empty() {
            return Vec::new();
        }

        let prompt = build_prompt(&passage.text);
        let label = format!(
            "decompose {} page {}",
            passage.source_document, passage.location.page
        );
        let reply = match self
            .retry
            .run(&label, || self.completion.complete(&prompt))
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                log::warn!("{label}: completion failed: {err}");
                return vec![Requirement::decomposition_failed(
                    passage,
                    format!("completion failed: {err}"),
                )];
            }
        };

        match parse_decomposition(&reply) {
            Ok(items) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| {
                    Requirement::Valid(AtomicRequirement {
                        id: requirement_id(
                            &passage.source_document,
                            passage.location.page,
                            idx + 1,
                        ),
                        text: item.requirement_text.trim().to_string(),
                        obligation_strength: item
                            .severity
                            .as_deref()
                            .map_or(ObligationStrength::Unknown, ObligationStrength::parse_label),
                        source_document: passage.source_document.clone(),
                        source_location: passage.location.clone(),
                        origin_context: passage.text.clone(),
                        embedding: Vec::new(),
                    })
                })
                .collect(),
            Err(reason) => {
                log::warn!("{label}: {reason}");
                vec![Requirement::decomposition_failed(passage, reason)]
            }
        }
    }

    /// Decomposes passages with bounded concurrency, preserving passage order.
    pub async fn decompose_all(&self, passages: &[Passage]) -> Vec<Requirement> {
        stream::iter(passages)
            .map(|passage| self.decompose(passage))
            .buffered(self.config.concurrency.max(1))
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect()
    }
}

fn build_prompt(text: &str) -> String {
    format!(
        r#"You are a regulatory compliance analyst.
Your task is to decompose reference text into atomic, auditable obligations.

Reference Text:
"""
{text}
"""

Instructions:
- Split the text into ATOMIC REQUIREMENTS.
- One requirement = one independently auditable obligation.
- Do NOT merge multiple obligations.
- Do NOT split a single obligation unnecessarily.
- Preserve original wording (no paraphrasing).
- If normalization is ambiguous, return {NORMALIZATION_FAILED}.
- For lists (e.g. "education, training, experience"), SPLIT into separate requirements, one per list item.
- For combined actions (e.g. "maintain documentation demonstrating..."), KEEP together.

Return JSON only:
[
  {{
    "requirement_text": "verbatim requirement",
    "severity": "MUST | SHOULD | MAY"
  }}
]"#
    )
}

fn parse_decomposition(reply: &str) -> Result<Vec<RawRequirement>, String> {
    if reply.to_ascii_uppercase().contains(NORMALIZATION_FAILED) {
        return Err("service marked the passage as not decomposable".to_string());
    }
    let Some(span) = extract_json_array(reply) else {
        return Err(format!(
            "no JSON array in response: {}",
            reply.chars().take(80).collect::<String>()
        ));
    };
    let items: Vec<RawRequirement> =
        serde_json::from_str(span).map_err(|e| format!("unparsable decomposition: {e}"))?;
    if items.is_empty() {
        return Err("service returned no requirements".to_string());
    }
    if items.iter().any(|item| item.requirement_text.trim().is_empty()) {
        return Err("service returned an empty requirement".to_string());
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use sopcheck_completion::{CompletionError, Result as CompletionResult};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted replies in order.
    struct Scripted {
        replies: Mutex<VecDeque<CompletionResult<String>>>,
        calls: Mutex<usize>,
    }

    impl Scripted {
        fn new(replies: Vec<CompletionResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TextCompletion for Scripted {
        async fn complete(&self, _prompt: &str) -> CompletionResult<String> {
            *self.calls.lock().unwrap() += 1;
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(CompletionError::Transient("script exhausted".into())))
        }
    }

    fn normalizer(script: Arc<Scripted>) -> Normalizer {
        Normalizer::new(script, RetryPolicy::immediate(3), NormalizerConfig::default())
    }

    fn passage() -> Passage {
        Passage::new(
            "The Investigator should be qualified by education, training, and experience.",
            "ich-e6.pdf",
            12,
        )
    }

    const THREE_ITEMS: &str = r#"```json
[
  {"requirement_text": "The Investigator should be qualified by education", "severity": "SHOULD"},
  {"requirement_text": "The Investigator should be qualified by training", "severity": "SHOULD"},
  {"requirement_text": "The Investigator should be qualified by experience", "severity": "SHOULD"}
]
```"#;

    #[tokio::test]
    async fn list_items_become_separate_requirements_with_stable_ids() {
        let script = Scripted::new(vec![Ok(THREE_ITEMS.to_string())]);
        let reqs = normalizer(script).decompose(&passage()).await;

        let ids: Vec<&str> = reqs.iter().map(Requirement::id).collect();
        assert_eq!(ids, vec!["ich-e6.pdf-12-1", "ich-e6.pdf-12-2", "ich-e6.pdf-12-3"]);
        for req in &reqs {
            let valid = req.as_valid().unwrap();
            assert_eq!(valid.obligation_strength, ObligationStrength::Should);
            assert_eq!(valid.origin_context, passage().text);
            assert!(valid.embedding.is_empty());
        }
        assert!(reqs[1].text().ends_with("training"));
    }

    #[tokio::test]
    async fn refusal_marker_yields_single_failure() {
        let script = Scripted::new(vec![Ok("NORMALIZATION_FAILED".to_string())]);
        let reqs = normalizer(script).decompose(&passage()).await;
        assert_eq!(reqs.len(), 1);
        assert!(reqs[0].is_failure());
        assert_eq!(reqs[0].id(), "ich-e6.pdf-12-FAIL");
    }

    #[tokio::test]
    async fn unparsable_or_empty_output_yields_single_failure() {
        for reply in ["I cannot help with that.", "[]", "[{\"text\": \"x\"}]", "[\"bare\"]"] {
            let script = Scripted::new(vec![Ok(reply.to_string())]);
            let reqs = normalizer(script).decompose(&passage()).await;
            assert_eq!(reqs.len(), 1, "reply {reply:?}");
            assert!(reqs[0].is_failure(), "reply {reply:?}");
        }
    }

    #[tokio::test]
    async fn transient_errors_are_retried() {
        let script = Scripted::new(vec![
            Err(CompletionError::RateLimited("throttled".into())),
            Ok(THREE_ITEMS.to_string()),
        ]);
        let reqs = normalizer(script.clone()).decompose(&passage()).await;
        assert_eq!(reqs.len(), 3);
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test]
    async fn exhausted_retries_become_a_failure_record() {
        let script = Scripted::new(vec![]);
        let reqs = normalizer(script.clone()).decompose(&passage()).await;
        assert_eq!(reqs.len(), 1);
        assert!(reqs[0].is_failure());
        assert_eq!(script.calls(), 3);
    }

    #[tokio::test]
    async fn blank_passage_is_skipped_without_a_call() {
        let script = Scripted::new(vec![]);
        let reqs = normalizer(script.clone())
            .decompose(&Passage::new("   \n", "a.txt", 1))
            .await;
        assert!(reqs.is_empty());
        assert_eq!(script.calls(), 0);
    }

    #[tokio::test]
    async fn decompose_all_keeps_passage_order() {
        let script = Scripted::new(vec![
            Ok(r#"[{"requirement_text": "first", "severity": "MUST"}]"#.to_string()),
            Ok(r#"[{"requirement_text": "second", "severity": "MAY"}]"#.to_string()),
        ]);
        let normalizer = Normalizer::new(
            script,
            RetryPolicy::immediate(1),
            NormalizerConfig { concurrency: 1 },
        );
        let passages = vec![
            Passage::new("First page.", "doc.txt", 1),
            Passage::new("Second page.", "doc.txt", 2),
        ];
        let reqs = normalizer.decompose_all(&passages).await;
        let ids: Vec<&str> = reqs.iter().map(Requirement::id).collect();
        assert_eq!(ids, vec!["doc.txt-1-1", "doc.txt-2-1"]);
        assert_eq!(
            reqs[1].as_valid().unwrap().obligation_strength,
            ObligationStrength::May
        );
    }
}
