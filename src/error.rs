//! Error types for the clinical RAG pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, RagError>;

/// Errors that can occur in the RAG pipeline.
#[derive(Error, Debug)]
pub enum RagError {
    /// A component was invoked before its prerequisites were in place
    /// (no index pair built yet, model still loading). Surfaced to the
    /// caller as a "try again later" condition, never retried internally.
    #[error("{0}")]
    NotReady(&'static str),

    /// Chunking a document produced zero passages. The previously active
    /// index pair is left untouched.
    #[error("Document produced no extractable passages")]
    EmptyDocument,

    /// The underlying model call failed. Fatal for the current query.
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Gold dataset could not be loaded or parsed.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Lexical index build or query error.
    #[error("Lexical index error: {0}")]
    Index(String),

    /// Embedding model error.
    #[error("Embedding error: {0}")]
    Embedding(String),
}

impl RagError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The retriever was asked for results before any document was indexed.
    pub fn retriever_not_ready() -> Self {
        Self::NotReady("No document indexed yet. Upload and process a protocol first.")
    }

    /// The generation service was asked for an answer before the model loaded.
    pub fn generator_not_ready() -> Self {
        Self::NotReady("The model is still loading. Please wait and try again.")
    }
}

impl From<reqwest::Error> for RagError {
    fn from(err: reqwest::Error) -> Self {
        RagError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for RagError {
    fn from(err: serde_json::Error) -> Self {
        RagError::Serialization(err.to_string())
    }
}

impl From<tantivy::TantivyError> for RagError {
    fn from(err: tantivy::TantivyError) -> Self {
        RagError::Index(err.to_string())
    }
}
