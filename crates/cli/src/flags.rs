use clap::ValueEnum;
use sopcheck_vector_store::EmbeddingBackendKind;
use sopcheck_verifier::DecisionPolicy;

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum PolicyFlag {
    AlwaysAdjudicate,
    AutoPass,
}

impl PolicyFlag {
    pub(crate) const fn as_domain(self) -> DecisionPolicy {
        match self {
            PolicyFlag::AlwaysAdjudicate => DecisionPolicy::AlwaysAdjudicate,
            PolicyFlag::AutoPass => DecisionPolicy::AutoPass,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum EmbedMode {
    /// Deterministic token hashing, no model needed
    Hashing,
    /// OpenAI-compatible embeddings endpoint
    Http,
}

impl EmbedMode {
    pub(crate) const fn as_domain(self) -> EmbeddingBackendKind {
        match self {
            EmbedMode::Hashing => EmbeddingBackendKind::Hashing,
            EmbedMode::Http => EmbeddingBackendKind::Http,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub(crate) enum SchemaArtifact {
    /// The gap report written by `verify`
    GapReport,
    /// The reference index persisted by `ingest`
    ReferenceIndex,
}

impl SchemaArtifact {
    pub(crate) fn schema(self) -> schemars::Schema {
        match self {
            SchemaArtifact::GapReport => sopcheck_protocol::gap_report_schema(),
            SchemaArtifact::ReferenceIndex => sopcheck_protocol::reference_index_schema(),
        }
    }
}
