use sopcheck_indexer::{ParseError, StoreError};
use sopcheck_vector_store::VectorStoreError;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, VerifyError>;

/// Fatal verification failures. Per-requirement problems never surface here.
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Reference index is empty; nothing to verify")]
    EmptyIndex,

    #[error(
        "Reference index contains {failures} decomposition failure record(s) (first: {first}); \
         re-run ingestion before verifying"
    )]
    TaintedIndex { failures: usize, first: String },

    #[error("Reference index mixes embedding dimensions {0:?}")]
    InconsistentDimensions(Vec<usize>),

    #[error("Embedding dimension mismatch: index has {index}, evidence has {evidence}")]
    DimensionMismatch { index: usize, evidence: usize },

    #[error("Target document {0} produced no text passages")]
    EmptyTarget(PathBuf),

    #[error("Failed to load reference index: {0}")]
    IndexLoad(#[from] StoreError),

    #[error("Failed to parse target document: {0}")]
    Parse(#[from] ParseError),

    #[error("Evidence store error: {0}")]
    Store(#[from] VectorStoreError),

    #[error("Invalid verifier configuration: {0}")]
    Config(String),

    #[error("Failed to write gap report: {0}")]
    Report(#[from] std::io::Error),
}
