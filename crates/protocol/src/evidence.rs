use crate::requirement::{Passage, SourceLocation};
use serde::{Deserialize, Serialize};

/// A unit of target-document text considered as candidate proof of compliance.
///
/// Lives only for the duration of one verification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceChunk {
    pub text: String,
    pub source_document: String,
    pub source_location: SourceLocation,
    /// Unit length, or empty when embedding failed.
    pub embedding: Vec<f32>,
}

impl EvidenceChunk {
    #[must_use]
    pub fn from_passage(passage: Passage, embedding: Vec<f32>) -> Self {
        Self {
            text: passage.text,
            source_document: passage.source_document,
            source_location: passage.location,
            embedding,
        }
    }
}
