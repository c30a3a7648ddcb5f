use serde::{Deserialize, Serialize};

/// Statistics about an ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Files that parsed successfully
    pub files: usize,

    /// Files skipped because parsing or processing failed
    pub failed_files: usize,

    /// Passages handed to the normalizer
    pub passages: usize,

    /// Atomic requirements produced (failure records excluded)
    pub requirements: usize,

    /// Passages recorded as decomposition failures
    pub decomposition_failures: usize,

    /// Requirements left without an embedding
    pub embedding_failures: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// Errors encountered, one line per failed file
    pub errors: Vec<String>,
}

impl IndexStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: String) {
        self.failed_files += 1;
        self.errors.push(error);
    }

    /// Total records that will land in the index.
    #[must_use]
    pub const fn records(&self) -> usize {
        self.requirements + self.decomposition_failures
    }
}
