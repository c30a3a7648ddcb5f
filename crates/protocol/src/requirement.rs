use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Suffix carried by the id of every decomposition failure record.
pub const FAILURE_ID_SUFFIX: &str = "FAIL";

/// Normative force of an atomic requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ObligationStrength {
    Must,
    Should,
    May,
    Unknown,
}

impl ObligationStrength {
    /// Lenient parse of a strength label produced by a completion service.
    #[must_use]
    pub fn parse_label(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "MUST" | "SHALL" | "REQUIRED" | "MANDATORY" => Self::Must,
            "SHOULD" | "RECOMMENDED" => Self::Should,
            "MAY" | "OPTIONAL" | "CAN" => Self::May,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Must => "MUST",
            Self::Should => "SHOULD",
            Self::May => "MAY",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ObligationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a passage (and everything derived from it) came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SourceLocation {
    pub page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl SourceLocation {
    #[must_use]
    pub const fn page(page: u32) -> Self {
        Self {
            page,
            section: None,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.section {
            Some(section) => write!(f, "Page {}, §{section}", self.page),
            None => write!(f, "Page {}", self.page),
        }
    }
}

/// Raw text unit handed over by a document parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub text: String,
    pub source_document: String,
    pub location: SourceLocation,
}

impl Passage {
    pub fn new(text: impl Into<String>, source_document: impl Into<String>, page: u32) -> Self {
        Self {
            text: text.into(),
            source_document: source_document.into(),
            location: SourceLocation::page(page),
        }
    }
}

/// One independently auditable obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AtomicRequirement {
    pub id: String,
    pub text: String,
    pub obligation_strength: ObligationStrength,
    pub source_document: String,
    pub source_location: SourceLocation,
    pub origin_context: String,
    /// Empty when the embedding provider failed for this requirement's batch.
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// Terminal record for a passage that could not be decomposed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DecompositionFailure {
    pub id: String,
    pub text: String,
    pub obligation_strength: ObligationStrength,
    pub source_document: String,
    pub source_location: SourceLocation,
    pub origin_context: String,
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    Valid(AtomicRequirement),
    DecompositionFailed(DecompositionFailure),
}

/// Deterministic id for the `ordinal`-th (1-based) requirement of a passage.
#[must_use]
pub fn requirement_id(source_document: &str, page: u32, ordinal: usize) -> String {
    format!("{source_document}-{page}-{ordinal}")
}

#[must_use]
pub fn failure_id(source_document: &str, page: u32) -> String {
    format!("{source_document}-{page}-{FAILURE_ID_SUFFIX}")
}

impl Requirement {
    /// Builds the failure record for `passage`.
    pub fn decomposition_failed(passage: &Passage, reason: impl Into<String>) -> Self {
        let preview: String = passage.text.chars().take(50).collect();
        Self::DecompositionFailed(DecompositionFailure {
            id: failure_id(&passage.source_document, passage.location.page),
            text: format!("FAILED TO NORMALIZE: {preview}..."),
            obligation_strength: ObligationStrength::Unknown,
            source_document: passage.source_document.clone(),
            source_location: passage.location.clone(),
            origin_context: passage.text.clone(),
            embedding: Vec::new(),
            reason: reason.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Valid(req) => &req.id,
            Self::DecompositionFailed(fail) => &fail.id,
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Valid(req) => &req.text,
            Self::DecompositionFailed(fail) => &fail.text,
        }
    }

    #[must_use]
    pub fn embedding(&self) -> &[f32] {
        match self {
            Self::Valid(req) => &req.embedding,
            Self::DecompositionFailed(fail) => &fail.embedding,
        }
    }

    #[must_use]
    pub const fn as_valid(&self) -> Option<&AtomicRequirement> {
        match self {
            Self::Valid(req) => Some(req),
            Self::DecompositionFailed(_) => None,
        }
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::DecompositionFailed(_))
    }
}

/// Ordered collection of requirements; insertion order is document processing order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ReferenceIndex {
    requirements: Vec<Requirement>,
}

impl ReferenceIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn from_requirements(requirements: Vec<Requirement>) -> Self {
        Self { requirements }
    }

    pub fn extend(&mut self, requirements: impl IntoIterator<Item = Requirement>) {
        self.requirements.extend(requirements);
    }

    #[must_use]
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter()
    }

    pub fn failures(&self) -> impl Iterator<Item = &DecompositionFailure> {
        self.requirements.iter().filter_map(|req| match req {
            Requirement::DecompositionFailed(fail) => Some(fail),
            Requirement::Valid(_) => None,
        })
    }

    /// Ids that occur more than once, in first-seen order.
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<String> {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        let mut order = Vec::new();
        for req in &self.requirements {
            let count = counts.entry(req.id()).or_insert(0);
            *count += 1;
            if *count == 2 {
                order.push(req.id().to_string());
            }
        }
        order
    }

    /// The dimension shared by every non-empty embedding.
    ///
    /// `Ok(None)` when no requirement carries an embedding; `Err` lists the
    /// conflicting dimensions in ascending order.
    pub fn embedding_dimension(&self) -> Result<Option<usize>, Vec<usize>> {
        let dims: BTreeSet<usize> = self
            .requirements
            .iter()
            .map(|req| req.embedding().len())
            .filter(|len| *len > 0)
            .collect();
        match dims.len() {
            0 => Ok(None),
            1 => Ok(dims.into_iter().next()),
            _ => Err(dims.into_iter().collect()),
        }
    }
}

impl IntoIterator for ReferenceIndex {
    type Item = Requirement;
    type IntoIter = std::vec::IntoIter<Requirement>;

    fn into_iter(self) -> Self::IntoIter {
        self.requirements.into_iter()
    }
}
