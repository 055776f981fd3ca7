//! PDF loading.

use crate::document::Document;
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while loading a PDF from disk.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The document path was missing or could not be read.
    #[error("failed to read document at {path}: {source}")]
    Unreadable {
        /// Path supplied to the loader.
        path: String,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The file contents could not be parsed as a PDF.
    #[error("failed to parse PDF at {path}: {message}")]
    Parse {
        /// Path supplied to the loader.
        path: String,
        /// Diagnostic reported by the PDF parser.
        message: String,
    },
}

/// Load a PDF into one [`Document`] per page.
///
/// Each document carries `source` (the supplied path) and `page` (0-based)
/// metadata. Pages with no extractable text are kept; the splitter discards
/// them later as a normal empty path.
pub fn load_pdf(path: &str) -> Result<Vec<Document>, LoadError> {
    let bytes = std::fs::read(path).map_err(|source| LoadError::Unreadable {
        path: path.to_string(),
        source,
    })?;

    let pages =
        pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|error| LoadError::Parse {
            path: path.to_string(),
            message: error.to_string(),
        })?;

    tracing::debug!(path, pages = pages.len(), "Loaded PDF");

    Ok(pages
        .into_iter()
        .enumerate()
        .map(|(index, text)| {
            let mut metadata = BTreeMap::new();
            metadata.insert("source".to_string(), json!(path));
            metadata.insert("page".to_string(), json!(index));
            Document { text, metadata }
        })
        .collect())
}
