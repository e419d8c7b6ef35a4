//! One-time indexing of the corpus.
//!
//! Runs before the verifier accepts requests: load documents, embed them
//! in one batch, add every entry to the index in a single call. Either the
//! whole corpus is indexed or nothing is.

use crate::embedding::EmbeddingProvider;
use crate::error::{EmbeddingError, IndexingError};
use crate::index::VectorIndex;
use crate::models::{Document, IndexEntry};

/// Outcome of an indexing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexReport {
    pub documents: usize,
    pub dims: Option<usize>,
}

impl IndexReport {
    pub fn empty() -> Self {
        Self {
            documents: 0,
            dims: None,
        }
    }
}

/// Embed `documents` and add them to `index`.
///
/// An empty corpus is a valid terminal state: the index stays empty.
pub async fn build_index(
    documents: Vec<Document>,
    provider: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
) -> Result<IndexReport, IndexingError> {
    if documents.is_empty() {
        tracing::warn!("no documents to index; retrieval will use empty context");
        return Ok(IndexReport::empty());
    }

    let texts: Vec<String> = documents.iter().map(|d| d.text.clone()).collect();
    let vectors = provider.embed_batch(&texts).await?;
    if vectors.len() != documents.len() {
        return Err(IndexingError::Embedding(EmbeddingError::Malformed(format!(
            "expected {} vectors, got {}",
            documents.len(),
            vectors.len()
        ))));
    }

    let dims = vectors.first().map(Vec::len);
    let entries: Vec<IndexEntry> = documents
        .into_iter()
        .zip(vectors)
        .map(|(document, vector)| IndexEntry::new(document, vector))
        .collect();
    let count = entries.len();

    index.add(entries).await?;

    tracing::info!(documents = count, model = provider.model_name(), "indexed corpus");
    Ok(IndexReport {
        documents: count,
        dims,
    })
}

/// Like [`build_index`], but a failure is logged and leaves the index empty.
pub async fn build_index_best_effort(
    documents: Vec<Document>,
    provider: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
) -> IndexReport {
    match build_index(documents, provider, index).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!(error = %e, "indexing failed; serving with an empty index");
            IndexReport::empty()
        }
    }
}
