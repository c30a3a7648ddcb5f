use crate::error::{Result, VectorStoreError};
use crate::similarity::unit_normalize;
use crate::types::SearchHit;
use ndarray::{aview1, Array1, Array2};
use sopcheck_protocol::EvidenceChunk;

/// Ephemeral evidence collection backed by a dense matrix of unit vectors.
///
/// Rebuilt wholesale for every target document; there is no incremental update.
/// Chunks whose embedding failed occupy a zero row and score 0 against any query.
#[derive(Debug)]
pub struct EvidenceStore {
    chunks: Vec<EvidenceChunk>,
    matrix: Array2<f32>,
    dimension: Option<usize>,
}

impl EvidenceStore {
    pub fn build(mut chunks: Vec<EvidenceChunk>) -> Result<Self> {
        let dimension = chunks
            .iter()
            .map(|chunk| chunk.embedding.len())
            .find(|len| *len > 0);

        let width = dimension.unwrap_or(0);
        let mut flat = Vec::with_capacity(chunks.len() * width);
        for chunk in &mut chunks {
            if chunk.embedding.is_empty() {
                flat.extend(std::iter::repeat(0.0).take(width));
                continue;
            }
            if chunk.embedding.len() != width {
                return Err(VectorStoreError::InvalidDimension {
                    expected: width,
                    actual: chunk.embedding.len(),
                });
            }
            chunk.embedding = unit_normalize(&chunk.embedding);
            flat.extend_from_slice(&chunk.embedding);
        }

        let matrix = Array2::from_shape_vec((chunks.len(), width), flat)
            .map_err(|e| VectorStoreError::IndexError(format!("evidence matrix: {e}")))?;

        let unembedded = chunks.iter().filter(|c| c.embedding.is_empty()).count();
        if unembedded > 0 {
            log::warn!("{unembedded} evidence chunks have no embedding and cannot match");
        }
        log::debug!(
            "Evidence store built: {} chunks, dimension {:?}",
            chunks.len(),
            dimension
        );

        Ok(Self {
            chunks,
            matrix,
            dimension,
        })
    }

    /// Shared dimensionality of the embedded chunks, if any chunk is embedded.
    #[must_use]
    pub const fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    #[must_use]
    pub fn chunks(&self) -> &[EvidenceChunk] {
        &self.chunks
    }

    #[must_use]
    pub fn chunk(&self, index: usize) -> Option<&EvidenceChunk> {
        self.chunks.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Cosine similarity of `query` against every chunk, in chunk order.
    ///
    /// An empty query is non-matchable and scores 0 everywhere.
    pub fn scores(&self, query: &[f32]) -> Result<Array1<f32>> {
        let Some(dimension) = self.dimension else {
            return Ok(Array1::zeros(self.chunks.len()));
        };
        if query.is_empty() {
            return Ok(Array1::zeros(self.chunks.len()));
        }
        if query.len() != dimension {
            return Err(VectorStoreError::InvalidDimension {
                expected: dimension,
                actual: query.len(),
            });
        }
        let query = unit_normalize(query);
        Ok(self.matrix.dot(&aview1(&query)))
    }

    /// Top-`k` chunks by score, descending; ties keep chunk order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let scores = self.scores(query)?;
        let mut hits: Vec<SearchHit> = scores
            .iter()
            .enumerate()
            .map(|(index, score)| SearchHit {
                index,
                score: score.clamp(-1.0, 1.0),
            })
            .collect();
        // sort_by is stable: equal scores stay in chunk order.
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(k);
        Ok(hits)
    }
}
