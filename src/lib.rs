//! # Exam Verifier
//!
//! Retrieval-augmented grading of free-text exam answers.
//!
//! A reference corpus is embedded and indexed once at startup. Each
//! question is then embedded, its nearest reference passages retrieved,
//! and a language model asked to grade the student's answer against them.
//! The model's line-labeled reply is parsed into a [`RubricResult`](models::RubricResult).
//!
//! ## Architecture
//!
//! ```text
//! startup:   corpus ──▶ embedding ──▶ index            (once, before serving)
//!
//! request:   question ──▶ embedding ──▶ index.query ──▶ prompt ──▶ grading ──▶ parser
//!                                                                     │
//!                                                        Blocked / TransportFailure
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GROQ_API_KEY=...
//! verifier corpus                      # list reference documents
//! verifier verify --question "What is calculus?" --answer "It's about derivatives."
//! verifier serve                       # index, then start the HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | Tracing subscriber setup |
//! | [`error`] | Error taxonomy |
//! | [`models`] | Core data types |
//! | [`corpus`] | Corpus loader |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Vector index |
//! | [`indexer`] | One-time corpus indexing |
//! | [`prompt`] | Grading prompt construction |
//! | [`grading`] | Grading backend client |
//! | [`parser`] | Rubric reply parser |
//! | [`verifier`] | Verification pipeline |
//! | [`server`] | HTTP server |

pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod grading;
pub mod index;
pub mod indexer;
pub mod logging;
pub mod models;
pub mod parser;
pub mod prompt;
pub mod server;
pub mod verifier;
