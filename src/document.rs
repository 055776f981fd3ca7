//! Core data types shared by the ingestion and query pipelines.

use serde_json::Value;
use std::collections::BTreeMap;

/// A page-level slice of the source PDF together with its metadata.
#[derive(Debug, Clone)]
pub struct Document {
    /// Extracted text content.
    pub text: String,
    /// Metadata mapping (source path, page number, ...).
    pub metadata: BTreeMap<String, Value>,
}

/// A bounded-length piece of a document used as the unit of retrieval.
///
/// Chunks are immutable once created; the splitter enforces the size and
/// overlap invariants.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    /// Deterministic identifier, `doc-<index>` in split order.
    pub id: String,
    /// Chunk text.
    pub text: String,
    /// Normalized metadata inherited from the parent document.
    pub metadata: BTreeMap<String, Value>,
}

/// A chunk paired with its embedding vector, ready for the store.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    /// The chunk being persisted.
    pub chunk: Chunk,
    /// Embedding vector produced for the chunk's text.
    pub embedding: Vec<f32>,
}

/// A stored record returned by similarity search.
#[derive(Debug, Clone)]
pub struct SearchHit {
    /// Identifier of the stored chunk.
    pub id: String,
    /// Stored chunk text.
    pub text: String,
    /// Stored metadata mapping.
    pub metadata: BTreeMap<String, Value>,
    /// Relevance score; results arrive ordered by non-increasing score.
    pub score: f32,
}

/// Drop metadata entries whose value is JSON null or an empty string.
///
/// Every other entry is preserved unchanged.
pub fn normalize_metadata(metadata: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    metadata
        .iter()
        .filter(|(_, value)| match value {
            Value::Null => false,
            Value::String(text) => !text.is_empty(),
            _ => true,
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Deterministic chunk identifier for the given split-order index.
pub fn chunk_id(index: usize) -> String {
    format!("doc-{index}")
}
