use crate::adjudicator::{is_trivial_excerpt, Adjudication, Adjudicator};
use crate::config::VerifierConfig;
use crate::error::{Result, VerifyError};
use crate::policy::Route;
use crate::report::{VerificationReport, VerificationSummary};
use sopcheck_completion::CompletionError;
use sopcheck_indexer::{load_reference_index, BlobStore, DocumentParser};
use sopcheck_protocol::{
    AtomicRequirement, EvidenceChunk, Gap, Passage, ReferenceIndex, Requirement, Verdict,
};
use sopcheck_vector_store::{Embedder, EvidenceStore, SearchHit};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const PROGRESS_EVERY: usize = 10;

/// No index loaded yet.
pub struct Idle;

/// A clean reference index is loaded.
pub struct IndexLoaded {
    index: Arc<ReferenceIndex>,
    dimension: Option<usize>,
    duplicate_ids: Vec<String>,
}

/// Target evidence is embedded and searchable.
pub struct EvidenceIngested {
    loaded: IndexLoaded,
    store: Arc<EvidenceStore>,
}

/// Terminal state holding the report.
pub struct Reported {
    report: VerificationReport,
}

/// Collaborators shared by every state of one run.
struct Services {
    config: VerifierConfig,
    parser: Arc<dyn DocumentParser>,
    embedder: Embedder,
    adjudicator: Arc<Adjudicator>,
}

/// One verification run: Idle → IndexLoaded → EvidenceIngested → Reported.
///
/// Each transition consumes the engine, so steps cannot run out of order and a
/// finished run cannot be reused.
pub struct VerificationEngine<S> {
    services: Services,
    state: S,
}

impl VerificationEngine<Idle> {
    pub fn new(
        config: VerifierConfig,
        parser: Arc<dyn DocumentParser>,
        embedder: Embedder,
        adjudicator: Adjudicator,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            services: Services {
                config,
                parser,
                embedder,
                adjudicator: Arc::new(adjudicator),
            },
            state: Idle,
        })
    }

    /// Fetches the index at `key` and checks the verification preconditions.
    pub async fn load_index(
        self,
        store: &dyn BlobStore,
        key: &str,
    ) -> Result<VerificationEngine<IndexLoaded>> {
        let index = load_reference_index(store, key).await?;
        self.with_index(index)
    }

    /// Accepts an in-memory index after checking the verification preconditions.
    ///
    /// Empty indexes, indexes holding decomposition failures and indexes with
    /// mixed embedding dimensions are rejected.
    pub fn with_index(self, index: ReferenceIndex) -> Result<VerificationEngine<IndexLoaded>> {
        if index.is_empty() {
            return Err(VerifyError::EmptyIndex);
        }

        let failures: Vec<&str> = index.failures().map(|fail| fail.id.as_str()).collect();
        if let Some(first) = failures.first() {
            return Err(VerifyError::TaintedIndex {
                failures: failures.len(),
                first: (*first).to_string(),
            });
        }

        let dimension = index
            .embedding_dimension()
            .map_err(VerifyError::InconsistentDimensions)?;

        let duplicate_ids = index.duplicate_ids();
        for id in &duplicate_ids {
            log::warn!("Duplicate requirement id in reference index: {id}");
        }

        let unembedded = index.iter().filter(|req| req.embedding().is_empty()).count();
        if unembedded > 0 {
            log::warn!("{unembedded} requirements have no embedding and will be reported MISSING");
        }

        Ok(VerificationEngine {
            services: self.services,
            state: IndexLoaded {
                index: Arc::new(index),
                dimension,
                duplicate_ids,
            },
        })
    }
}

impl VerificationEngine<IndexLoaded> {
    #[must_use]
    pub fn index(&self) -> &ReferenceIndex {
        &self.state.index
    }

    /// Parses the target document and builds the evidence store from its passages.
    pub async fn ingest_target(self, path: &Path) -> Result<VerificationEngine<EvidenceIngested>> {
        log::info!("Ingesting SOP: {}", path.display());
        let parser = self.services.parser.clone();
        let owned = path.to_path_buf();
        let passages = tokio::task::spawn_blocking(move || parser.parse(&owned))
            .await
            .map_err(|err| {
                VerifyError::Parse(std::io::Error::other(format!("parser task: {err}")).into())
            })??;
        if passages.is_empty() {
            return Err(VerifyError::EmptyTarget(path.to_path_buf()));
        }
        self.ingest_passages(passages).await
    }

    /// Embeds `passages` as evidence chunks.
    pub async fn ingest_passages(
        self,
        passages: Vec<Passage>,
    ) -> Result<VerificationEngine<EvidenceIngested>> {
        if let Some(index) = self.state.dimension {
            let evidence = self.services.embedder.dimension();
            if evidence != index {
                return Err(VerifyError::DimensionMismatch { index, evidence });
            }
        }

        let texts: Vec<String> = passages.iter().map(|p| p.text.clone()).collect();
        let vectors = self.services.embedder.embed(&texts).await;
        let chunks: Vec<EvidenceChunk> = passages
            .into_iter()
            .zip(vectors)
            .map(|(passage, vector)| EvidenceChunk::from_passage(passage, vector))
            .collect();
        let store = EvidenceStore::build(chunks)?;

        if let (Some(index), Some(evidence)) = (self.state.dimension, store.dimension()) {
            if index != evidence {
                return Err(VerifyError::DimensionMismatch { index, evidence });
            }
        }
        log::info!("SOP ingested. Vector store size: {} chunks", store.len());

        Ok(VerificationEngine {
            services: self.services,
            state: EvidenceIngested {
                loaded: self.state,
                store: Arc::new(store),
            },
        })
    }
}

impl VerificationEngine<EvidenceIngested> {
    #[must_use]
    pub fn evidence(&self) -> &EvidenceStore {
        &self.state.store
    }

    /// Runs the reverse check for every requirement.
    ///
    /// Per-requirement failures end up as MISSING gaps; this never fails.
    pub async fn verify(self) -> VerificationEngine<Reported> {
        let index = self.state.loaded.index.clone();
        let store = self.state.store.clone();
        let total = index.len();
        let limiter = Arc::new(Semaphore::new(self.services.config.max_concurrency));

        log::info!(
            "Verifying {total} requirements ({} policy, low {:.2}, high {:.2})",
            self.services.config.policy.as_str(),
            self.services.config.low_threshold,
            self.services.config.high_threshold
        );

        let mut tasks = JoinSet::new();
        for position in 0..total {
            let index = index.clone();
            let store = store.clone();
            let limiter = limiter.clone();
            let adjudicator = self.services.adjudicator.clone();
            let config = self.services.config.clone();
            tasks.spawn(async move {
                let outcome = match &index.requirements()[position] {
                    Requirement::Valid(req) => {
                        decide(req, &store, &adjudicator, &config, &limiter).await
                    }
                    // Tainted indexes never reach this state.
                    Requirement::DecompositionFailed(fail) => Outcome::missing(
                        Route::AutoMissing,
                        format!("Decomposition failure record: {}", fail.reason),
                    ),
                };
                (position, outcome)
            });
        }

        let mut outcomes: Vec<Option<Outcome>> = vec![None; total];
        let mut done = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, outcome)) => outcomes[position] = Some(outcome),
                Err(err) => log::warn!("Verification task failed: {err}"),
            }
            done += 1;
            if done % PROGRESS_EVERY == 0 || done == total {
                log::info!("Verified {done}/{total} requirements");
            }
        }

        let mut summary = VerificationSummary {
            total,
            duplicate_ids: self.state.loaded.duplicate_ids.len(),
            ..VerificationSummary::default()
        };
        let mut gaps = Vec::new();
        for (req, outcome) in index.requirements().iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|| {
                let mut aborted =
                    Outcome::missing(Route::Adjudicate, "Jury error: verification task aborted");
                aborted.jury_error = true;
                aborted
            });
            summary.record(&outcome);
            if let Some(gap) = req
                .as_valid()
                .and_then(|valid| outcome.into_gap(valid))
            {
                gaps.push(gap);
            }
        }

        log::info!(
            "Verification complete: {} present, {} partial, {} missing",
            summary.present,
            summary.partial,
            summary.missing
        );

        VerificationEngine {
            services: self.services,
            state: Reported {
                report: VerificationReport { gaps, summary },
            },
        }
    }
}

impl VerificationEngine<Reported> {
    #[must_use]
    pub fn report(&self) -> &VerificationReport {
        &self.state.report
    }

    #[must_use]
    pub fn into_report(self) -> VerificationReport {
        self.state.report
    }
}

/// Final decision for one requirement.
#[derive(Debug, Clone)]
pub(crate) struct Outcome {
    pub(crate) verdict: Verdict,
    pub(crate) route: Route,
    pub(crate) sop_evidence: Option<String>,
    pub(crate) justification: String,
    pub(crate) downgraded: bool,
    pub(crate) jury_error: bool,
}

impl Outcome {
    fn missing(route: Route, justification: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Missing,
            route,
            sop_evidence: None,
            justification: justification.into(),
            downgraded: false,
            jury_error: false,
        }
    }

    fn into_gap(self, requirement: &AtomicRequirement) -> Option<Gap> {
        Gap::from_decision(
            requirement,
            self.verdict,
            self.sop_evidence.as_deref(),
            self.justification,
        )
    }
}

async fn decide(
    req: &AtomicRequirement,
    store: &EvidenceStore,
    adjudicator: &Adjudicator,
    config: &VerifierConfig,
    limiter: &Semaphore,
) -> Outcome {
    if req.embedding.is_empty() {
        log::warn!("{}: no embedding, not matchable", req.id);
        return Outcome::missing(
            Route::AutoMissing,
            "Requirement has no embedding (embedding failed at ingestion) and cannot be matched.",
        );
    }

    let hits: Vec<SearchHit> = match store.search(&req.embedding, config.top_k) {
        Ok(hits) => hits,
        Err(err) => {
            log::warn!("{}: retrieval failed: {err}", req.id);
            return Outcome::missing(Route::AutoMissing, format!("Retrieval failed: {err}"));
        }
    };
    let best = hits.first().map_or(0.0, |hit| hit.score);
    let evidence: Vec<&EvidenceChunk> = hits.iter().filter_map(|hit| store.chunk(hit.index)).collect();

    match config.route(best) {
        Route::AutoMissing => Outcome::missing(
            Route::AutoMissing,
            format!(
                "Best similarity {best:.2} is below the {:.2} threshold; no plausible evidence.",
                config.low_threshold
            ),
        ),
        Route::AutoPresent => Outcome {
            verdict: Verdict::Present,
            route: Route::AutoPresent,
            sop_evidence: evidence.first().map(|chunk| chunk.text.clone()),
            justification: format!(
                "High confidence semantic match ({best:.2} >= {:.2}).",
                config.high_threshold
            ),
            downgraded: false,
            jury_error: false,
        },
        Route::Adjudicate => {
            let Ok(_permit) = limiter.acquire().await else {
                let mut outcome =
                    Outcome::missing(Route::Adjudicate, "Jury error: adjudication limiter closed");
                outcome.jury_error = true;
                return outcome;
            };
            match adjudicator.adjudicate(&req.id, &req.text, &evidence).await {
                Ok(adjudication) => ground(
                    &req.id,
                    adjudication,
                    &evidence,
                    config.require_verbatim_evidence,
                ),
                Err(err) => {
                    log::warn!("{}: adjudication failed: {err}", req.id);
                    let justification = match err {
                        CompletionError::Parse(detail) => {
                            format!("Jury error: unrecognised jury response ({detail})")
                        }
                        other => format!("Jury error: {other}"),
                    };
                    let mut outcome = Outcome::missing(Route::Adjudicate, justification);
                    outcome.jury_error = true;
                    outcome
                }
            }
        }
    }
}

/// Enforces that a PRESENT verdict is backed by a quoted excerpt.
fn ground(
    requirement_id: &str,
    adjudication: Adjudication,
    evidence: &[&EvidenceChunk],
    require_verbatim: bool,
) -> Outcome {
    let excerpt = adjudication.sop_evidence.as_deref().map(strip_quotes);
    let mut outcome = Outcome {
        verdict: adjudication.verdict,
        route: Route::Adjudicate,
        sop_evidence: excerpt.map(str::to_string),
        justification: adjudication.justification,
        downgraded: false,
        jury_error: false,
    };
    if adjudication.verdict != Verdict::Present {
        return outcome;
    }

    let problem = match excerpt {
        None => Some("no evidence excerpt was quoted"),
        Some(text) if is_trivial_excerpt(text) => {
            Some("the quoted excerpt is a placeholder without substantive text")
        }
        Some(text) if require_verbatim && !quoted_from(text, evidence) => {
            Some("the quoted excerpt does not occur in the retrieved evidence")
        }
        Some(_) => None,
    };
    if let Some(problem) = problem {
        log::warn!("{requirement_id}: PRESENT downgraded to MISSING, {problem}");
        outcome.verdict = Verdict::Missing;
        outcome.sop_evidence = None;
        outcome.justification = format!(
            "Downgraded from PRESENT: {problem}. Jury said: {}",
            outcome.justification
        );
        outcome.downgraded = true;
    }
    outcome
}

fn strip_quotes(text: &str) -> &str {
    text.trim()
        .trim_matches(|c| matches!(c, '"' | '\u{201c}' | '\u{201d}'))
        .trim()
}

/// Whitespace- and case-insensitive containment in any retrieved chunk.
fn quoted_from(excerpt: &str, evidence: &[&EvidenceChunk]) -> bool {
    let needle = squash(excerpt);
    !needle.is_empty() && evidence.iter().any(|chunk| squash(&chunk.text).contains(&needle))
}

fn squash(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
