use crate::blob_store::{save_reference_index, BlobStore};
use crate::error::{IndexerError, ParseError, Result};
use crate::normalizer::Normalizer;
use crate::parser::DocumentParser;
use crate::stats::IndexStats;
use sopcheck_protocol::{Passage, ReferenceIndex, Requirement};
use sopcheck_vector_store::Embedder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Builds the reference index: parse → decompose → embed → persist.
pub struct ReferenceIndexer {
    parser: Arc<dyn DocumentParser>,
    normalizer: Normalizer,
    embedder: Embedder,
}

impl ReferenceIndexer {
    pub fn new(parser: Arc<dyn DocumentParser>, normalizer: Normalizer, embedder: Embedder) -> Self {
        Self {
            parser,
            normalizer,
            embedder,
        }
    }

    /// Processes `files` in order; a failing file is logged and skipped.
    pub async fn build(&self, files: &[PathBuf]) -> (ReferenceIndex, IndexStats) {
        let start = Instant::now();
        let mut stats = IndexStats::new();
        let mut index = ReferenceIndex::new();

        log::info!("Starting ingestion for {} files", files.len());
        for path in files {
            log::info!("Processing: {}", path.display());
            let passages = match self.parse(path).await {
                Ok(passages) => passages,
                Err(err) => {
                    log::warn!("Failed to process {}: {err}", path.display());
                    stats.add_error(format!("{}: {err}", path.display()));
                    continue;
                }
            };
            if passages.is_empty() {
                log::warn!("{} contains no text", path.display());
            }

            let requirements = self.process_document(&passages, &mut stats).await;
            log::info!(
                "  - Extracted {} records from {} passages",
                requirements.len(),
                passages.len()
            );
            stats.files += 1;
            stats.passages += passages.len();
            index.extend(requirements);
        }

        stats.time_ms = start.elapsed().as_millis() as u64;
        (index, stats)
    }

    /// Builds the index and persists it as one atomic write.
    ///
    /// Nothing is written when no record at all was produced.
    pub async fn build_and_persist(
        &self,
        files: &[PathBuf],
        store: &dyn BlobStore,
        key: &str,
    ) -> Result<IndexStats> {
        let (index, stats) = self.build(files).await;
        if index.is_empty() {
            return Err(IndexerError::NothingIndexed { files: files.len() });
        }
        save_reference_index(store, key, &index).await?;
        Ok(stats)
    }

    async fn parse(&self, path: &Path) -> std::result::Result<Vec<Passage>, ParseError> {
        let parser = self.parser.clone();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || parser.parse(&path))
            .await
            .map_err(|err| ParseError::Io(std::io::Error::other(format!("parser task: {err}"))))?
    }

    /// Decomposes a document and embeds its requirements in one batch.
    async fn process_document(
        &self,
        passages: &[Passage],
        stats: &mut IndexStats,
    ) -> Vec<Requirement> {
        let mut requirements = self.normalizer.decompose_all(passages).await;

        let texts: Vec<String> = requirements
            .iter()
            .filter_map(Requirement::as_valid)
            .map(|req| req.text.clone())
            .collect();
        let mut vectors = self.embedder.embed(&texts).await.into_iter();

        for req in &mut requirements {
            match req {
                Requirement::Valid(valid) => {
                    valid.embedding = vectors.next().unwrap_or_default();
                    stats.requirements += 1;
                    if valid.embedding.is_empty() {
                        stats.embedding_failures += 1;
                    }
                }
                Requirement::DecompositionFailed(_) => stats.decomposition_failures += 1,
            }
        }
        requirements
    }
}
