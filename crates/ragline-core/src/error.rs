use std::path::PathBuf;

use ragline_llm::LlmError;
use ragline_memory::document::DocumentError;
use ragline_memory::{StoreError, VectorStoreError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the retrieval pipeline, classified for the caller.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    /// Store, embedder, or generator failure; the original error is kept as the source.
    #[error("backend error: {0}")]
    Backend(#[source] BoxError),
}

impl RagError {
    pub fn backend(err: impl Into<BoxError>) -> Self {
        Self::Backend(err.into())
    }
}

impl From<DocumentError> for RagError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::NotFound(path) => Self::NotFound(path),
            DocumentError::UnsupportedFormat(ext) => Self::UnsupportedFormat(ext),
            other => Self::backend(other),
        }
    }
}

impl From<StoreError> for RagError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Configuration(msg) => Self::Configuration(msg),
            other => Self::backend(other),
        }
    }
}

impl From<LlmError> for RagError {
    fn from(err: LlmError) -> Self {
        Self::backend(err)
    }
}

impl From<VectorStoreError> for RagError {
    fn from(err: VectorStoreError) -> Self {
        Self::backend(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn document_errors_keep_their_class() {
        let err: RagError = DocumentError::NotFound(PathBuf::from("report.pdf")).into();
        assert!(matches!(err, RagError::NotFound(p) if p == PathBuf::from("report.pdf")));

        let err: RagError = DocumentError::UnsupportedFormat("csv".into()).into();
        assert!(matches!(err, RagError::UnsupportedFormat(ext) if ext == "csv"));

        let err: RagError = DocumentError::FileTooLarge {
            path: PathBuf::from("big.txt"),
            size: 10,
            limit: 1,
        }
        .into();
        assert!(matches!(err, RagError::Backend(_)));
    }

    #[test]
    fn store_configuration_error_maps_to_configuration() {
        let err: RagError = StoreError::Configuration("dimension mismatch".into()).into();
        assert!(matches!(err, RagError::Configuration(msg) if msg == "dimension mismatch"));
    }

    #[test]
    fn backend_preserves_source() {
        let err: RagError = StoreError::Backend(VectorStoreError::Search("boom".into())).into();
        let source = err.source().unwrap();
        assert!(source.to_string().contains("boom"));
        assert!(err.to_string().starts_with("backend error"));
    }

    #[test]
    fn llm_error_is_backend() {
        let err: RagError = LlmError::RateLimited.into();
        assert!(matches!(err, RagError::Backend(_)));
    }
}
