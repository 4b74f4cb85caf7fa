#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid batch: {0}")]
    InvalidBatch(String),

    #[error("embedding error: {0}")]
    Embedding(#[from] ragline_llm::LlmError),

    #[error("vector store error: {0}")]
    Backend(#[from] crate::vector_store::VectorStoreError),
}
