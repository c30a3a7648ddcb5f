//! # SOP Check Vector Store
//!
//! Embedding and similarity search for the reverse check.
//!
//! ## Architecture
//!
//! ```text
//! texts
//!     │
//!     ├──> Embedder (batch, sentinel on failure)
//!     │      └─> raw Vector[dimension]
//!     │
//!     └──> EvidenceStore
//!            ├─> unit-normalized dense matrix (ndarray)
//!            └─> top-K cosine search, stable on ties
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sopcheck_protocol::{EvidenceChunk, Passage};
//! use sopcheck_vector_store::{Embedder, EvidenceStore, HashingBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let embedder = Embedder::new(Arc::new(HashingBackend::new(384)));
//!     let passages = vec![Passage::new("Staff are trained annually.", "sop.txt", 1)];
//!     let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
//!     let vectors = embedder.embed(&texts).await;
//!
//!     let chunks = passages
//!         .into_iter()
//!         .zip(vectors)
//!         .map(|(p, v)| EvidenceChunk::from_passage(p, v))
//!         .collect();
//!     let store = EvidenceStore::build(chunks)?;
//!
//!     let query = embedder.embed(&["annual training".to_string()]).await;
//!     for hit in store.search(&query[0], 3)? {
//!         println!("{}: {:.3}", hit.index, hit.score);
//!     }
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod similarity;
mod store;
mod types;

pub use embeddings::{
    Embedder, EmbeddingBackend, EmbeddingBackendKind, EmbeddingConfig, HashingBackend,
    HttpEmbeddingBackend,
};
pub use error::{Result, VectorStoreError};
pub use similarity::{cosine_similarity, dot, unit_normalize, NORM_EPSILON};
pub use store::EvidenceStore;
pub use types::SearchHit;
