use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

/// Batch text-in, vector-out provider.
///
/// Implementations return raw (un-normalized) vectors, one per input.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    fn dimension(&self) -> usize;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackendKind {
    /// Offline signed feature hashing over word tokens.
    Hashing,
    /// OpenAI-compatible `/embeddings` endpoint.
    Http,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: EmbeddingBackendKind,
    pub dimension: usize,
    pub endpoint: String,
    pub model: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackendKind::Hashing,
            dimension: 384,
            endpoint: "http://localhost:11434/v1".to_string(),
            model: "all-minilm".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

/// Deterministic embedding without a model: every lower-cased word token is
/// hashed into one signed bucket.
#[derive(Clone, Debug)]
pub struct HashingBackend {
    dimension: usize,
}

impl HashingBackend {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    #[must_use]
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimension];
        for word in text.unicode_words() {
            let hash = fnv1a_64(word.to_lowercase().as_bytes());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vec[bucket] += sign;
        }
        vec
    }
}

#[async_trait]
impl EmbeddingBackend for HashingBackend {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_one(text)).collect())
    }
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

pub struct HttpEmbeddingBackend {
    http: Client,
    url: String,
    model: String,
    api_key: Option<String>,
    dimension: usize,
}

impl HttpEmbeddingBackend {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;
        Ok(Self {
            http,
            url: format!("{}/embeddings", config.endpoint.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl EmbeddingBackend for HttpEmbeddingBackend {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut request = self.http.post(&self.url).json(&EmbeddingsRequest {
            model: &self.model,
            input: texts,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?.error_for_status()?;
        let mut parsed: EmbeddingsResponse = response.json().await?;
        parsed.data.sort_by_key(|item| item.index);
        Ok(parsed.data.into_iter().map(|item| item.embedding).collect())
    }
}

/// Batch embedder that never fails a batch.
///
/// Provider errors, a wrong vector count, or a wrong dimensionality turn the
/// whole batch into empty-vector sentinels so the affected items stay visible
/// (and non-matchable) downstream.
#[derive(Clone)]
pub struct Embedder {
    backend: Arc<dyn EmbeddingBackend>,
}

impl Embedder {
    pub fn new(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self { backend }
    }

    pub fn from_config(config: &EmbeddingConfig) -> Result<Self> {
        if config.dimension == 0 {
            return Err(VectorStoreError::EmbeddingError(
                "embedding dimension must be positive".to_string(),
            ));
        }
        let backend: Arc<dyn EmbeddingBackend> = match config.backend {
            EmbeddingBackendKind::Hashing => Arc::new(HashingBackend::new(config.dimension)),
            EmbeddingBackendKind::Http => Arc::new(HttpEmbeddingBackend::new(config)?),
        };
        log::info!(
            "Embedding backend: {:?} (dimension {})",
            config.backend,
            config.dimension
        );
        Ok(Self::new(backend))
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.backend.dimension()
    }

    pub async fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
        if texts.is_empty() {
            return Vec::new();
        }
        match self.try_embed(texts).await {
            Ok(vectors) => vectors,
            Err(err) => {
                log::warn!(
                    "Embedding failed for a batch of {} texts: {err}; marking them unembedded",
                    texts.len()
                );
                vec![Vec::new(); texts.len()]
            }
        }
    }

    async fn try_embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let vectors = self.backend.embed_batch(texts).await?;
        if vectors.len() != texts.len() {
            return Err(VectorStoreError::EmbeddingError(format!(
                "provider returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }
        let expected = self.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(VectorStoreError::InvalidDimension {
                expected,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }
}
