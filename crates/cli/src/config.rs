use anyhow::{anyhow, Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use sopcheck_completion::{CompletionConfig, RetryPolicy};
use sopcheck_indexer::{NormalizerConfig, StorageConfig};
use sopcheck_vector_store::EmbeddingConfig;
use sopcheck_verifier::VerifierConfig;
use std::path::Path;

/// Everything a run needs, as read from `sopcheck.toml`.
///
/// Every section is optional; missing keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub completion: CompletionConfig,
    pub embedding: EmbeddingConfig,
    pub retry: RetryPolicy,
    pub normalizer: NormalizerConfig,
    pub verifier: VerifierConfig,
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Applies an API key to every service that does not carry its own.
    pub fn apply_api_key(&mut self, key: Option<&str>) {
        let Some(key) = key.filter(|k| !k.trim().is_empty()) else {
            return;
        };
        self.completion
            .api_key
            .get_or_insert_with(|| key.to_string());
        self.embedding
            .api_key
            .get_or_insert_with(|| key.to_string());
    }

    pub fn validate(&self) -> Result<()> {
        self.verifier.validate()?;
        self.retry.validate().map_err(|e| anyhow!(e))?;
        if self.normalizer.concurrency == 0 {
            return Err(anyhow!("normalizer.concurrency must be at least 1"));
        }
        if self.storage.bucket_name.trim().is_empty() {
            return Err(anyhow!("storage.bucket_name must not be empty"));
        }
        Ok(())
    }
}
