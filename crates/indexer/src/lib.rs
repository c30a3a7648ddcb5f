//! # SOP Check Indexer
//!
//! Builds the reference index from regulatory documents.
//!
//! ## Pipeline
//!
//! ```text
//! Reference files
//!     │
//!     ├──> FileParser (PDF pages, form-feed text pages)
//!     │      └─> Passages
//!     │
//!     ├──> Normalizer (completion service, bounded concurrency)
//!     │      └─> Atomic requirements | decomposition failures
//!     │
//!     ├──> Embedder (one batch per document)
//!     │      └─> Requirement embeddings
//!     │
//!     └──> BlobStore (single atomic write)
//!            └─> reference_index.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//! use sopcheck_completion::{CompletionConfig, HttpCompletionClient, RetryPolicy};
//! use sopcheck_indexer::{
//!     open_blob_store, FileParser, Normalizer, NormalizerConfig, ReferenceIndexer, StorageConfig,
//! };
//! use sopcheck_vector_store::{Embedder, EmbeddingConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let completion = Arc::new(HttpCompletionClient::new(CompletionConfig::default())?);
//!     let indexer = ReferenceIndexer::new(
//!         Arc::new(FileParser::new()),
//!         Normalizer::new(completion, RetryPolicy::default(), NormalizerConfig::default()),
//!         Embedder::from_config(&EmbeddingConfig::default())?,
//!     );
//!     let store = open_blob_store(&StorageConfig::default())?;
//!     let stats = indexer
//!         .build_and_persist(&[PathBuf::from("ich-e6.pdf")], store.as_ref(), "reference_index.json")
//!         .await?;
//!
//!     println!("Indexed {} requirements from {} files", stats.requirements, stats.files);
//!     Ok(())
//! }
//! ```

mod blob_store;
mod error;
mod indexer;
mod normalizer;
mod parser;
mod stats;

pub use blob_store::{
    load_reference_index, open_blob_store, save_reference_index, BlobStore, LocalBlobStore,
    ObjectBlobStore, StorageConfig, LOCAL_BUCKET,
};
pub use error::{IndexerError, ParseError, Result, StoreError};
pub use indexer::ReferenceIndexer;
pub use normalizer::{Normalizer, NormalizerConfig, NORMALIZATION_FAILED};
pub use parser::{DocumentParser, FileParser};
pub use stats::IndexStats;
