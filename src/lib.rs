#![deny(missing_docs)]

//! Core library for the docchat CLI.
//!
//! docchat ingests a single PDF into a pgvector collection and answers
//! questions about it strictly from retrieved chunks via Gemini.

/// Character-window chunk splitting.
pub mod chunking;
/// Environment-driven configuration management.
pub mod config;
/// Document, chunk, and retrieval data types.
pub mod document;
/// Embedding client abstraction and the Gemini adapter.
pub mod embedding;
/// Chat client abstraction and the Gemini adapter.
pub mod llm;
/// PDF loading.
pub mod loader;
/// Structured logging and tracing setup.
pub mod logging;
/// Ingestion and query pipelines.
pub mod pipeline;
/// Prompt template and context serialization.
pub mod prompt;
/// Interactive question-answering shell.
pub mod shell;
/// pgvector store integration.
pub mod store;
