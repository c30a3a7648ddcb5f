use crate::error::StoreError;
use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use serde::{Deserialize, Serialize};
use sopcheck_protocol::{ReferenceIndex, REFERENCE_INDEX_DEFAULT_KEY};
use std::path::PathBuf;
use std::sync::Arc;

/// Sentinel bucket name selecting the local filesystem.
pub const LOCAL_BUCKET: &str = "local";

/// Whole-blob key/value persistence.
///
/// `put` replaces the blob atomically: readers see either the old or the new
/// content, never a truncated one.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Human-readable location of `key`, for logs.
    fn describe(&self, key: &str) -> String;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Object-store bucket, or `"local"` for the filesystem.
    pub bucket_name: String,
    pub region: String,
    pub index_key: String,
    /// Directory holding local blobs.
    pub local_root: PathBuf,
    /// Custom endpoint for S3-compatible stores (MinIO, R2).
    pub endpoint: Option<String>,
    #[serde(skip_serializing)]
    pub access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket_name: LOCAL_BUCKET.to_string(),
            region: "us-east-1".to_string(),
            index_key: REFERENCE_INDEX_DEFAULT_KEY.to_string(),
            local_root: PathBuf::from("."),
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.bucket_name == LOCAL_BUCKET
    }
}

pub fn open_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, StoreError> {
    if config.is_local() {
        return Ok(Arc::new(LocalBlobStore::new(&config.local_root)));
    }

    let mut builder = AmazonS3Builder::new()
        .with_bucket_name(&config.bucket_name)
        .with_region(&config.region);
    if let Some(endpoint) = &config.endpoint {
        builder = builder.with_endpoint(endpoint);
    }
    if let (Some(key), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
        builder = builder
            .with_access_key_id(key)
            .with_secret_access_key(secret);
    }
    let store = builder.build()?;
    Ok(Arc::new(ObjectBlobStore::new(
        Arc::new(store),
        config.bucket_name.clone(),
    )))
}

/// Files under a root directory; writes go through a temporary file and a rename.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                key: self.describe(key),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn describe(&self, key: &str) -> String {
        self.path_for(key).display().to_string()
    }
}

/// Any `object_store` backend; a single PUT replaces the whole object.
pub struct ObjectBlobStore {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectBlobStore {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BlobStore for ObjectBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.store
            .put(&ObjectPath::from(key), PutPayload::from(bytes))
            .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let result = self.store.get(&ObjectPath::from(key)).await?;
        Ok(result.bytes().await?.to_vec())
    }

    fn describe(&self, key: &str) -> String {
        format!("s3://{}/{key}", self.bucket)
    }
}

pub async fn save_reference_index(
    store: &dyn BlobStore,
    key: &str,
    index: &ReferenceIndex,
) -> Result<(), StoreError> {
    let bytes = serde_json::to_vec_pretty(index).map_err(StoreError::Serialize)?;
    store.put(key, bytes).await?;
    log::info!(
        "Persisted {} requirements to {}",
        index.len(),
        store.describe(key)
    );
    Ok(())
}

/// Whole-document fetch and parse.
pub async fn load_reference_index(
    store: &dyn BlobStore,
    key: &str,
) -> Result<ReferenceIndex, StoreError> {
    log::info!("Loading reference index from {}", store.describe(key));
    let bytes = store.get(key).await?;
    let index: ReferenceIndex =
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
            key: store.describe(key),
            source,
        })?;
    log::info!("Loaded {} reference requirements", index.len());
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use pretty_assertions::assert_eq;
    use sopcheck_protocol::{AtomicRequirement, ObligationStrength, Passage, Requirement, SourceLocation};
    use tempfile::TempDir;

    fn sample_index() -> ReferenceIndex {
        ReferenceIndex::from_requirements(vec![
            Requirement::Valid(AtomicRequirement {
                id: "gcp.pdf-3-1".to_string(),
                text: "Records must be retained for 15 years".to_string(),
                obligation_strength: ObligationStrength::Must,
                source_document: "gcp.pdf".to_string(),
                source_location: SourceLocation {
                    page: 3,
                    section: Some("4.9".to_string()),
                },
                origin_context: "Records must be retained for 15 years.".to_string(),
                embedding: vec![0.125, -0.5, 0.0],
            }),
            Requirement::decomposition_failed(&Passage::new("???", "gcp.pdf", 4), "ambiguous"),
        ])
    }

    #[tokio::test]
    async fn local_round_trip_is_field_for_field() {
        let tmp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(tmp.path());
        let index = sample_index();

        save_reference_index(&store, "reference_index.json", &index)
            .await
            .unwrap();
        let loaded = load_reference_index(&store, "reference_index.json")
            .await
            .unwrap();
        assert_eq!(loaded, index);
        assert!(!tmp.path().join("reference_index.json.tmp").exists());
    }

    #[tokio::test]
    async fn local_put_replaces_existing_blob() {
        let tmp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(tmp.path());
        store.put("nested/key.json", b"old".to_vec()).await.unwrap();
        store.put("nested/key.json", b"new".to_vec()).await.unwrap();
        assert_eq!(store.get("nested/key.json").await.unwrap(), b"new".to_vec());
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(tmp.path());
        let err = load_reference_index(&store, "absent.json").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn malformed_json_is_reported() {
        let tmp = TempDir::new().unwrap();
        let store = LocalBlobStore::new(tmp.path());
        store.put("bad.json", b"[{\"kind\":".to_vec()).await.unwrap();
        let err = load_reference_index(&store, "bad.json").await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[tokio::test]
    async fn object_store_round_trip() {
        let store = ObjectBlobStore::new(Arc::new(InMemory::new()), "audits");
        let index = sample_index();
        save_reference_index(&store, "reference_index.json", &index)
            .await
            .unwrap();
        assert_eq!(
            load_reference_index(&store, "reference_index.json")
                .await
                .unwrap(),
            index
        );
        assert_eq!(store.describe("k.json"), "s3://audits/k.json");
        assert!(matches!(
            store.get("absent.json").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn local_sentinel_selects_filesystem() {
        let config = StorageConfig::default();
        assert!(config.is_local());
        let store = open_blob_store(&config).unwrap();
        assert!(store.describe("reference_index.json").ends_with("reference_index.json"));
    }
}
