//! # SOP Check Verifier
//!
//! The reverse check: for every reference requirement, look for evidence of
//! compliance in the target SOP.
//!
//! ## Flow
//!
//! ```text
//! ReferenceIndex (clean, single dimension)
//!     │
//!     ├──> EvidenceStore (target passages, unit vectors)
//!     │
//!     ├──> per requirement, bounded concurrency:
//!     │      top-K retrieval ─> route on best score
//!     │          < low          ─> MISSING
//!     │          ≥ high (auto)  ─> PRESENT
//!     │          otherwise      ─> Adjudicator ─> evidence grounding
//!     │
//!     └──> VerificationReport (PARTIAL / MISSING gaps, index order)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use sopcheck_completion::{CompletionConfig, HttpCompletionClient, RetryPolicy};
//! use sopcheck_indexer::{open_blob_store, FileParser, StorageConfig};
//! use sopcheck_vector_store::{Embedder, EmbeddingConfig};
//! use sopcheck_verifier::{
//!     render_summary, write_gap_report, Adjudicator, VerificationEngine, VerifierConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let completion = Arc::new(HttpCompletionClient::new(CompletionConfig::default())?);
//!     let engine = VerificationEngine::new(
//!         VerifierConfig::default(),
//!         Arc::new(FileParser::new()),
//!         Embedder::from_config(&EmbeddingConfig::default())?,
//!         Adjudicator::new(completion, RetryPolicy::default()),
//!     )?;
//!     let store = open_blob_store(&StorageConfig::default())?;
//!
//!     let done = engine
//!         .load_index(store.as_ref(), "reference_index.json")
//!         .await?
//!         .ingest_target(Path::new("sop.pdf"))
//!         .await?
//!         .verify()
//!         .await;
//!
//!     write_gap_report(Path::new("gap_report.json"), &done.report().gaps).await?;
//!     print!("{}", render_summary(done.report(), 5));
//!     Ok(())
//! }
//! ```

mod adjudicator;
mod config;
mod engine;
mod error;
mod policy;
mod report;

pub use adjudicator::{parse_response, Adjudication, Adjudicator};
pub use config::{DecisionPolicy, VerifierConfig};
pub use engine::{EvidenceIngested, Idle, IndexLoaded, Reported, VerificationEngine};
pub use error::{Result, VerifyError};
pub use policy::Route;
pub use report::{
    render_summary, write_gap_report, VerificationReport, VerificationSummary,
    DEFAULT_SUMMARY_LIMIT,
};
