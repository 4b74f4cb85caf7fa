use crate::vector_store::Metadata;

/// Full text of one loaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub content_type: &'static str,
}

/// A chunk of text with its metadata, before an id is assigned at ingestion.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPayload {
    pub content: String,
    pub metadata: Metadata,
}
