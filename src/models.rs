//! Core data models used throughout the verifier.
//!
//! Documents and index entries flow through indexing; rubric and error
//! results are what a `verify` call hands back to its caller.

use serde::Serialize;

/// A reference passage loaded from the corpus. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    /// `doc_0`, `doc_1`, ... in corpus enumeration order.
    pub id: String,
    /// Path relative to the corpus root.
    pub source: String,
    pub text: String,
}

/// A document together with its embedding, as stored in the vector index.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub vector: Vec<f32>,
    pub document: Document,
}

impl IndexEntry {
    pub fn new(document: Document, vector: Vec<f32>) -> Self {
        Self {
            id: document.id.clone(),
            vector,
            document,
        }
    }
}

/// A document returned by a nearest-neighbor query.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievedDocument {
    pub document: Document,
    /// Cosine distance to the query vector, in `[0.0, 2.0]`.
    pub distance: f32,
}

/// Provenance of one context document used for grading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedSource {
    pub id: String,
    pub source: String,
    pub distance: f32,
}

impl From<&RetrievedDocument> for RetrievedSource {
    fn from(r: &RetrievedDocument) -> Self {
        Self {
            id: r.document.id.clone(),
            source: r.document.source.clone(),
            distance: r.distance,
        }
    }
}

/// Rating and feedback for one rubric criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Criterion {
    pub rating: String,
    pub feedback: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AiFeedback {
    pub strengths: String,
    pub suggestions: String,
}

/// Scored rubric for one student answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RubricResult {
    /// 0–100.
    pub overall_score: u32,
    pub accuracy: Criterion,
    pub completeness: Criterion,
    pub structure: Criterion,
    pub ai_feedback: AiFeedback,
    pub retrieved_sources: Vec<RetrievedSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmbeddingFailure,
    Blocked,
    TransportFailure,
    ParseFailure,
    InternalError,
}

impl ErrorKind {
    /// Wire name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::EmbeddingFailure => "embedding_failure",
            ErrorKind::Blocked => "blocked",
            ErrorKind::TransportFailure => "transport_failure",
            ErrorKind::ParseFailure => "parse_failure",
            ErrorKind::InternalError => "internal_error",
        }
    }
}

/// Structured failure returned to the caller in place of a rubric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResult {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}
