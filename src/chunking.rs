//! Character-window chunk splitting.
//!
//! Chunks are fixed character windows: every chunk holds at most `chunk_size`
//! characters and adjacent chunks share `overlap` characters, so spans around
//! boundaries remain visible to retrieval. Splitting operates on `char`
//! boundaries and never cuts through a multi-byte sequence.

use crate::document::{Chunk, Document, chunk_id, normalize_metadata};
use thiserror::Error;

/// Target chunk size, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Overlap between adjacent chunks, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

/// Errors produced while splitting text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// A zero chunk size can never make progress.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Split text into character windows of at most `chunk_size`, with adjacent
/// windows sharing `overlap` characters.
///
/// The overlap is clamped to `chunk_size - 1` so every step makes forward
/// progress. Returns an empty vector when the input is all whitespace.
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<String>, ChunkingError> {
    if chunk_size == 0 {
        return Err(ChunkingError::InvalidChunkSize);
    }
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let chars: Vec<char> = text.chars().collect();
    let effective_overlap = overlap.min(chunk_size - 1);
    let step = chunk_size - effective_overlap;

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}

/// Split a sequence of documents into identified chunks.
///
/// Each chunk inherits its parent document's normalized metadata and receives
/// a `doc-<index>` identifier, where the index is 0-based across the whole
/// sequence in split order. Re-splitting the same documents with the same
/// window yields identical identifiers.
pub fn split_documents(
    documents: &[Document],
    chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>, ChunkingError> {
    let mut chunks = Vec::new();
    for document in documents {
        let metadata = normalize_metadata(&document.metadata);
        for text in chunk_text(&document.text, chunk_size, overlap)? {
            chunks.push(Chunk {
                id: chunk_id(chunks.len()),
                text,
                metadata: metadata.clone(),
            });
        }
    }
    Ok(chunks)
}
