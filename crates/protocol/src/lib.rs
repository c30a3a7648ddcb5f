//! # SOP Check Protocol
//!
//! Records shared by the indexer, the verification engine and the CLI:
//! requirements as they are persisted in the reference index, evidence chunks
//! of a verification run, and the gaps written to the report.

mod evidence;
mod gap;
mod requirement;
mod schema;

pub use evidence::EvidenceChunk;
pub use gap::{Gap, GapStatus, Verdict, NOT_FOUND};
pub use requirement::{
    failure_id, requirement_id, AtomicRequirement, DecompositionFailure, ObligationStrength,
    Passage, ReferenceIndex, Requirement, SourceLocation, FAILURE_ID_SUFFIX,
};
pub use schema::{gap_report_schema, reference_index_schema};

pub const REFERENCE_INDEX_DEFAULT_KEY: &str = "reference_index.json";
