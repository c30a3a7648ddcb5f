use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Unsupported file format '{extension}': {path}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("Failed to read PDF {path}: {message}")]
    Pdf { path: PathBuf, message: String },

    #[error("Failed to read DOCX {path}: {message}")]
    Docx { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Persistence failures; fatal for the ingest or load that hit them.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No reference index at {key}")]
    NotFound { key: String },

    #[error("Malformed reference index at {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize reference index: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Object store error: {0}")]
    Backend(String),
}

impl From<object_store::Error> for StoreError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => Self::NotFound { key: path },
            other => Self::Backend(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Persistence error: {0}")]
    Store(#[from] StoreError),

    #[error("No requirements extracted from {files} file(s); nothing was persisted")]
    NothingIndexed { files: usize },

    #[error("{0}")]
    Other(String),
}
