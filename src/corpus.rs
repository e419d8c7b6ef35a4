//! Corpus loader: reads reference documents from a directory.
//!
//! Eligible files are those matching `corpus.include_globs` (relative to
//! the corpus root). They are sorted by relative path and numbered in that
//! order, so ids (`doc_0`, `doc_1`, ...) are stable for a given directory
//! listing. A missing directory is not an error: the corpus is just empty.

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::CorpusConfig;
use crate::models::Document;

pub fn load_corpus(config: &CorpusConfig) -> Result<Vec<Document>> {
    let root = &config.dir;
    if !root.is_dir() {
        tracing::warn!(dir = %root.display(), "knowledge base directory not found; corpus is empty");
        return Ok(Vec::new());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut candidates = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable corpus entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");

        if !include_set.is_match(&rel_str) {
            continue;
        }
        candidates.push((rel_str, path.to_path_buf()));
    }

    // Sort for deterministic ordering
    candidates.sort_by(|a, b| a.0.cmp(&b.0));

    let mut documents = Vec::with_capacity(candidates.len());
    for (rel_str, path) in candidates {
        let Some(text) = read_text(&path) else {
            continue;
        };
        documents.push(Document {
            id: format!("doc_{}", documents.len()),
            source: rel_str,
            text,
        });
    }

    tracing::info!(dir = %root.display(), documents = documents.len(), "loaded corpus");
    Ok(documents)
}

/// Reads a UTF-8 file, logging and skipping anything else.
fn read_text(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping corpus file");
            None
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
