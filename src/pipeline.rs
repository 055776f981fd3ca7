//! Ingestion and query pipelines.
//!
//! Both pipelines are strictly linear and hold references to long-lived
//! collaborators constructed once at process entry, so tests can substitute
//! fakes for the embedding provider, store, and chat model.

use crate::chunking::{ChunkingError, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, split_documents};
use crate::document::{Document, EmbeddedChunk};
use crate::embedding::{EmbeddingClient, EmbeddingError};
use crate::llm::{ChatClient, LlmError};
use crate::loader::{LoadError, load_pdf};
use crate::prompt::{build_prompt, format_context};
use crate::store::{StoreQueryError, StoreWriteError, VectorStore};
use thiserror::Error;

/// Number of nearest chunks retrieved per question.
pub const TOP_K: usize = 10;

/// Errors emitted by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The document could not be loaded or parsed.
    #[error("Failed to load document: {0}")]
    Load(#[from] LoadError),
    /// Splitting the document into chunks failed.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed to produce vectors.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Vector store rejected the batch write.
    #[error("Vector store write failed: {0}")]
    StoreWrite(#[from] StoreWriteError),
}

/// Errors emitted by the query pipeline.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// Question was empty or whitespace-only.
    #[error("Question must not be empty")]
    EmptyQuestion,
    /// Embedding provider failed to produce a query vector.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingError),
    /// Vector store could not serve the similarity search.
    #[error("Vector store query failed: {0}")]
    StoreQuery(#[from] StoreQueryError),
    /// Chat model failed to produce an answer.
    #[error("Chat model failed: {0}")]
    Llm(#[from] LlmError),
}

/// Coordinates ingestion: load, split, embed, and upsert.
pub struct IngestionPipeline<'a> {
    embedding: &'a dyn EmbeddingClient,
    store: &'a dyn VectorStore,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl<'a> IngestionPipeline<'a> {
    /// Build a pipeline over the given collaborators with the default
    /// 1000-character window and 150-character overlap.
    pub fn new(embedding: &'a dyn EmbeddingClient, store: &'a dyn VectorStore) -> Self {
        Self {
            embedding,
            store,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }

    /// Override the chunk window.
    pub fn with_window(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    /// Load the PDF at `path` and ingest its pages.
    pub async fn ingest(&self, path: &str) -> Result<usize, IngestError> {
        let documents = load_pdf(path)?;
        self.ingest_documents(&documents).await
    }

    /// Split, embed, and upsert the given documents, returning the number of
    /// stored chunks.
    ///
    /// Zero extractable chunks is a clean success that leaves the store
    /// untouched. Re-ingesting the same documents regenerates the same
    /// `doc-<i>` identifiers, so prior records are overwritten rather than
    /// duplicated.
    pub async fn ingest_documents(&self, documents: &[Document]) -> Result<usize, IngestError> {
        let chunks = split_documents(documents, self.chunk_size, self.chunk_overlap)?;
        if chunks.is_empty() {
            tracing::info!("Document produced no chunks; nothing to store");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedding.generate_embeddings(texts).await?;
        debug_assert_eq!(chunks.len(), embeddings.len());

        let dimension = embeddings.first().map(Vec::len).unwrap_or(0);
        let batch: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| EmbeddedChunk { chunk, embedding })
            .collect();

        self.store.ensure_collection(dimension).await?;
        self.store.upsert(&batch).await?;

        tracing::info!(chunks = batch.len(), "Document indexed");
        Ok(batch.len())
    }
}

/// Coordinates answering: embed the question, search, compose, generate.
pub struct QueryPipeline<'a> {
    embedding: &'a dyn EmbeddingClient,
    store: &'a dyn VectorStore,
    chat: &'a dyn ChatClient,
}

impl<'a> QueryPipeline<'a> {
    /// Build a pipeline over the given collaborators.
    pub fn new(
        embedding: &'a dyn EmbeddingClient,
        store: &'a dyn VectorStore,
        chat: &'a dyn ChatClient,
    ) -> Self {
        Self {
            embedding,
            store,
            chat,
        }
    }

    /// Verify the store is reachable and the collection exists, once, before
    /// serving questions.
    pub async fn check_ready(&self) -> Result<(), StoreQueryError> {
        self.store.health().await
    }

    /// Answer one question strictly from retrieved context.
    ///
    /// Empty or whitespace-only questions are rejected before any external
    /// call. The model's text output is returned verbatim.
    pub async fn answer(&self, question: &str) -> Result<String, AnswerError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AnswerError::EmptyQuestion);
        }

        let mut vectors = self
            .embedding
            .generate_embeddings(vec![question.to_string()])
            .await?;
        let vector = vectors.pop().ok_or(AnswerError::Embedding(
            EmbeddingError::CountMismatch {
                expected: 1,
                actual: 0,
            },
        ))?;

        let hits = self.store.search(&vector, TOP_K).await?;
        debug_assert!(hits.windows(2).all(|pair| pair[0].score >= pair[1].score));
        tracing::debug!(hits = hits.len(), "Retrieved context");

        let prompt = build_prompt(&format_context(&hits), question);
        let answer = self.chat.generate(&prompt).await?;
        Ok(answer)
    }
}
