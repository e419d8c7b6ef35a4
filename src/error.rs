//! Error taxonomy for indexing and verification.
//!
//! Each failure is caught at the smallest scope that can name it. Backend
//! error text stays in these types (and in logs); callers of the HTTP API
//! only ever see the fixed messages from [`VerifyError::to_error_result`].

use thiserror::Error;

use crate::models::{ErrorKind, ErrorResult};

/// Failure of the embedding backend.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider is disabled")]
    Disabled,
    #[error("embedding backend request failed: {0}")]
    Transport(String),
    #[error("malformed embedding response: {0}")]
    Malformed(String),
}

/// Vector index invariant violations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("duplicate document id: {0}")]
    DuplicateId(String),
    #[error("vector for '{id}' has {actual} dimensions, index expects {expected}")]
    DimensionMismatch {
        id: String,
        expected: usize,
        actual: usize,
    },
}

/// Why the one-time indexing pass did not populate the index.
#[derive(Debug, Error)]
pub enum IndexingError {
    #[error("failed to embed corpus: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("failed to populate index: {0}")]
    Index(#[from] IndexError),
}

/// Genuine scanning failures of the response parser.
///
/// Missing or empty fields are never errors; they take their defaults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("overall score '{0}' is outside 0-100")]
    ScoreOutOfRange(String),
}

/// Terminal failure of a single `verify` call.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("grading backend returned no usable completion")]
    Blocked,
    #[error("grading backend transport failure: {0}")]
    Transport(String),
    #[error("failed to parse grading response: {source}")]
    Parse { source: ParseError, raw_text: String },
    #[error("internal error: {0}")]
    Internal(String),
}

impl VerifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerifyError::Embedding(_) => ErrorKind::EmbeddingFailure,
            VerifyError::Blocked => ErrorKind::Blocked,
            VerifyError::Transport(_) => ErrorKind::TransportFailure,
            VerifyError::Parse { .. } => ErrorKind::ParseFailure,
            VerifyError::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Caller-facing view: a fixed message per kind, plus the raw model
    /// reply for parse failures.
    pub fn to_error_result(&self) -> ErrorResult {
        let message = match self {
            VerifyError::Embedding(_) => {
                "The embedding service is unavailable. Please try again later."
            }
            VerifyError::Blocked => {
                "The AI's response was blocked for safety reasons. Please try a different query."
            }
            VerifyError::Transport(_) => {
                "An unexpected error occurred while contacting the AI model."
            }
            VerifyError::Parse { .. } => "Failed to parse the AI model's response.",
            VerifyError::Internal(_) => "An internal error occurred while verifying the answer.",
        };
        let raw_text = match self {
            VerifyError::Parse { raw_text, .. } => Some(raw_text.clone()),
            _ => None,
        };

        ErrorResult {
            kind: self.kind(),
            message: message.to_string(),
            raw_text,
        }
    }
}
