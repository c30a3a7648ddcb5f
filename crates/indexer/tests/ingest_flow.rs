use async_trait::async_trait;
use pretty_assertions::assert_eq;
use sopcheck_completion::{CompletionError, RetryPolicy, TextCompletion};
use sopcheck_indexer::{
    load_reference_index, DocumentParser, FileParser, LocalBlobStore, Normalizer,
    NormalizerConfig, ParseError, ReferenceIndexer,
};
use sopcheck_protocol::{ObligationStrength, Passage, Requirement};
use sopcheck_vector_store::{Embedder, HashingBackend};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Decomposes list passages, refuses anything mentioning "ambiguous".
struct ListSplitter;

#[async_trait]
impl TextCompletion for ListSplitter {
    async fn complete(&self, prompt: &str) -> sopcheck_completion::Result<String> {
        let passage = prompt.split("\"\"\"").nth(1).unwrap_or_default().trim();
        if passage.contains("ambiguous") {
            return Ok("NORMALIZATION_FAILED".to_string());
        }
        if passage.contains("outage") {
            return Err(CompletionError::Rejected {
                status: 400,
                body: "bad request".to_string(),
            });
        }
        let items: Vec<serde_json::Value> = ["education", "training", "experience"]
            .iter()
            .map(|item| {
                serde_json::json!({
                    "requirement_text": format!("The Investigator shall be qualified by {item}"),
                    "severity": "SHALL",
                })
            })
            .collect();
        Ok(serde_json::to_string(&items).unwrap_or_default())
    }
}

/// Serves fixed pages for any path, without touching the filesystem.
struct FixedPages(Vec<&'static str>);

impl DocumentParser for FixedPages {
    fn parse(&self, path: &Path) -> Result<Vec<Passage>, ParseError> {
        let source = path.file_name().and_then(|n| n.to_str()).unwrap_or("DOC");
        Ok(self
            .0
            .iter()
            .enumerate()
            .map(|(idx, text)| Passage::new(*text, source, idx as u32 + 1))
            .collect())
    }
}

fn indexer(parser: Arc<dyn DocumentParser>) -> ReferenceIndexer {
    ReferenceIndexer::new(
        parser,
        Normalizer::new(
            Arc::new(ListSplitter),
            RetryPolicy::immediate(2),
            NormalizerConfig::default(),
        ),
        Embedder::new(Arc::new(HashingBackend::new(64))),
    )
}

#[tokio::test]
async fn mixed_pages_produce_requirements_and_failure_records() {
    let parser = FixedPages(vec![
        "The Investigator shall be qualified by education, training, and experience.",
        "This ambiguous clause may or may not apply.",
        "Service outage page.",
    ]);
    let (index, stats) = indexer(Arc::new(parser))
        .build(&[PathBuf::from("ich-e6.pdf")])
        .await;

    let ids: Vec<&str> = index.iter().map(Requirement::id).collect();
    assert_eq!(
        ids,
        vec![
            "ich-e6.pdf-1-1",
            "ich-e6.pdf-1-2",
            "ich-e6.pdf-1-3",
            "ich-e6.pdf-2-FAIL",
            "ich-e6.pdf-3-FAIL",
        ]
    );
    assert_eq!(stats.requirements, 3);
    assert_eq!(stats.decomposition_failures, 2);
    assert_eq!(stats.embedding_failures, 0);
    assert_eq!(index.failures().count(), 2);
    assert_eq!(index.embedding_dimension(), Ok(Some(64)));
    assert_eq!(
        index.requirements()[0].as_valid().map(|r| r.obligation_strength),
        Some(ObligationStrength::Must)
    );
    assert!(index.requirements()[3].embedding().is_empty());
}

#[tokio::test]
async fn missing_reference_file_is_skipped_and_index_persisted() {
    let tmp = TempDir::new().unwrap();
    let good = tmp.path().join("ich-e6.txt");
    std::fs::write(
        &good,
        "The Investigator shall be qualified by education, training, and experience.",
    )
    .unwrap();
    let store = LocalBlobStore::new(tmp.path().join("bucket"));

    let stats = indexer(Arc::new(FileParser::new()))
        .build_and_persist(
            &[tmp.path().join("gone.pdf"), good],
            &store,
            "reference_index.json",
        )
        .await
        .unwrap();
    assert_eq!(stats.files, 1);
    assert_eq!(stats.failed_files, 1);
    assert!(stats.errors[0].contains("gone.pdf"));

    let loaded = load_reference_index(&store, "reference_index.json")
        .await
        .unwrap();
    assert_eq!(loaded.len(), 3);
    assert!(loaded.duplicate_ids().is_empty());
}
