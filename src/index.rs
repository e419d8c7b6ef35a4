//! Vector index abstraction and the in-memory implementation.
//!
//! The [`VectorIndex`] trait is the seam for pluggable backends. Indexes
//! are populated once at startup and only read afterwards, so
//! implementations must be `Send + Sync` and safe for concurrent queries.
//!
//! # Distance
//!
//! [`InMemoryIndex`] ranks by cosine distance, `1 - cos(a, b)`, in
//! `[0.0, 2.0]`. Smaller is more similar. Ties keep insertion order.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::IndexError;
use crate::models::{IndexEntry, RetrievedDocument};

/// Nearest-neighbor store over embedded documents.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Add entries atomically: either every entry is stored or none is.
    ///
    /// Rejects ids already present (or repeated within `entries`) with
    /// [`IndexError::DuplicateId`], and vectors whose width differs from
    /// the index's with [`IndexError::DimensionMismatch`].
    async fn add(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError>;

    /// Return up to `k` documents nearest to `vector`, most similar first.
    ///
    /// An empty index yields an empty result, never an error.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedDocument>, IndexError>;

    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Default)]
struct Inner {
    entries: Vec<IndexEntry>,
    ids: HashSet<String>,
    dims: Option<usize>,
}

/// Brute-force cosine index held in memory.
#[derive(Default)]
pub struct InMemoryIndex {
    inner: RwLock<Inner>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Width of stored vectors, if any entry has been added.
    pub fn dims(&self) -> Option<usize> {
        self.read().dims
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Check a batch against the current contents without mutating anything.
fn validate_batch(inner: &Inner, entries: &[IndexEntry]) -> Result<Option<usize>, IndexError> {
    let mut dims = inner.dims;
    let mut seen: HashSet<&str> = HashSet::with_capacity(entries.len());

    for entry in entries {
        if inner.ids.contains(&entry.id) || !seen.insert(entry.id.as_str()) {
            return Err(IndexError::DuplicateId(entry.id.clone()));
        }
        match dims {
            Some(expected) if expected != entry.vector.len() => {
                return Err(IndexError::DimensionMismatch {
                    id: entry.id.clone(),
                    expected,
                    actual: entry.vector.len(),
                });
            }
            Some(_) => {}
            None => dims = Some(entry.vector.len()),
        }
    }

    Ok(dims)
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn add(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let dims = validate_batch(&inner, &entries)?;

        inner.dims = dims;
        for entry in entries {
            inner.ids.insert(entry.id.clone());
            inner.entries.push(entry);
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RetrievedDocument>, IndexError> {
        let inner = self.read();
        if inner.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(expected) = inner.dims {
            if expected != vector.len() {
                return Err(IndexError::DimensionMismatch {
                    id: "<query>".to_string(),
                    expected,
                    actual: vector.len(),
                });
            }
        }

        let mut scored: Vec<(f32, &IndexEntry)> = inner
            .entries
            .iter()
            .map(|entry| (1.0 - cosine_similarity(vector, &entry.vector), entry))
            .collect();
        // Stable sort: equal distances keep insertion order.
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(distance, entry)| RetrievedDocument {
                document: entry.document.clone(),
                distance,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.read().entries.len()
    }
}
