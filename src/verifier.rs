//! The verification pipeline.
//!
//! ```text
//! question ─▶ embed ─▶ index.query(k) ─▶ build_prompt ─▶ grade ─▶ parse ─▶ RubricResult
//!                                                           │
//!                                                           └─ Blocked / TransportFailure ─▶ VerifyError
//! ```
//!
//! A [`Verifier`] is built once at startup around shared, read-only
//! collaborators and holds no per-request state, so one instance can serve
//! any number of concurrent calls.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use crate::embedding::EmbeddingProvider;
use crate::error::VerifyError;
use crate::grading::{GradeOutcome, GradingClient};
use crate::index::VectorIndex;
use crate::models::{RetrievedSource, RubricResult};
use crate::parser::parse_response;
use crate::prompt::build_prompt;

/// Number of context documents retrieved per question.
pub const DEFAULT_TOP_K: usize = 2;

/// Upper bound on each backend stage (embedding, grading) of a call.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Verifier {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    grader: Arc<dyn GradingClient>,
    top_k: usize,
    stage_timeout: Duration,
}

impl Verifier {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        grader: Arc<dyn GradingClient>,
    ) -> Self {
        Self {
            embedder,
            index,
            grader,
            top_k: DEFAULT_TOP_K,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    /// Override the number of retrieved documents (at least 1).
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Grade `student_answer` to `question` against the indexed corpus.
    pub async fn verify(
        &self,
        question: &str,
        student_answer: &str,
    ) -> Result<RubricResult, VerifyError> {
        self.verify_with_k(question, student_answer, self.top_k).await
    }

    /// As [`verify`](Self::verify), retrieving `k` documents (at least 1)
    /// instead of the default.
    pub async fn verify_with_k(
        &self,
        question: &str,
        student_answer: &str,
        k: usize,
    ) -> Result<RubricResult, VerifyError> {
        let k = k.max(1);
        let span = tracing::info_span!("verify", request_id = %Uuid::new_v4(), k);
        async {
            let result = self.run(question, student_answer, k).await;
            match &result {
                Ok(rubric) => tracing::info!(score = rubric.overall_score, "verification complete"),
                Err(e) => tracing::warn!(kind = ?e.kind(), error = %e, "verification failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        question: &str,
        student_answer: &str,
        k: usize,
    ) -> Result<RubricResult, VerifyError> {
        tracing::debug!(stage = "embedding");
        let query_vector = tokio::time::timeout(self.stage_timeout, self.embedder.embed(question))
            .await
            .map_err(|_| {
                VerifyError::Transport(format!(
                    "embedding timed out after {:?}",
                    self.stage_timeout
                ))
            })??;

        tracing::debug!(stage = "retrieving");
        let context = self
            .index
            .query(&query_vector, k)
            .await
            .map_err(|e| VerifyError::Internal(format!("retrieval failed: {}", e)))?;
        if context.is_empty() {
            tracing::debug!("no documents retrieved; grading with empty context");
        }

        tracing::debug!(stage = "prompting", documents = context.len());
        let prompt = build_prompt(&context, question, student_answer);
        let sources: Vec<RetrievedSource> = context.iter().map(RetrievedSource::from).collect();

        tracing::debug!(stage = "grading", model = self.grader.model_name());
        let outcome = tokio::time::timeout(self.stage_timeout, self.grader.grade(&prompt))
            .await
            .map_err(|_| {
                VerifyError::Transport(format!(
                    "grading timed out after {:?}",
                    self.stage_timeout
                ))
            })?;

        let raw_text = match outcome {
            GradeOutcome::Success(text) => text,
            GradeOutcome::Blocked => return Err(VerifyError::Blocked),
            GradeOutcome::TransportFailure(message) => return Err(VerifyError::Transport(message)),
        };

        tracing::debug!(stage = "parsing", chars = raw_text.len());
        parse_response(&raw_text, sources).map_err(|source| VerifyError::Parse { source, raw_text })
    }
}
