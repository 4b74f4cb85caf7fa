use std::path::Path;

use ragline_llm::{Embedder, LlmProvider};
use ragline_memory::document::{ChunkPayload, ChunkProcessor};
use ragline_memory::{ChunkStore, CollectionInfo, Metadata};
use serde::Serialize;

use crate::error::RagError;
use crate::sources::{SourceGroup, group_by_source};

/// Answer returned when retrieval finds nothing to ground a response on.
pub const NO_INFORMATION_ANSWER: &str =
    "I couldn't find any relevant information to answer your question.";

pub const DEFAULT_MAX_RETRIEVED_DOCS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedSource {
    pub content: String,
    pub metadata: Metadata,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnswer {
    pub question: String,
    pub answer: String,
    /// Retrieved chunks, closest first.
    pub sources: Vec<RetrievedSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbeddingInfo {
    pub model_name: String,
    pub embedding_dimension: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratorInfo {
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub vector_store: CollectionInfo,
    pub embedding_model: EmbeddingInfo,
    pub llm: GeneratorInfo,
}

/// Ingests documents into a [`ChunkStore`] and answers questions from it.
pub struct RetrievalPipeline<E: Embedder, G: LlmProvider> {
    processor: ChunkProcessor,
    store: ChunkStore<E>,
    generator: G,
    max_retrieved_docs: usize,
    similarity_threshold: Option<f32>,
}

impl<E: Embedder, G: LlmProvider> std::fmt::Debug for RetrievalPipeline<E, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalPipeline")
            .field("store", &self.store)
            .field("generator", &self.generator.name())
            .field("max_retrieved_docs", &self.max_retrieved_docs)
            .field("similarity_threshold", &self.similarity_threshold)
            .finish_non_exhaustive()
    }
}

impl<E: Embedder, G: LlmProvider> RetrievalPipeline<E, G> {
    #[must_use]
    pub fn new(processor: ChunkProcessor, store: ChunkStore<E>, generator: G) -> Self {
        Self {
            processor,
            store,
            generator,
            max_retrieved_docs: DEFAULT_MAX_RETRIEVED_DOCS,
            similarity_threshold: None,
        }
    }

    #[must_use]
    pub fn with_max_retrieved_docs(mut self, max: usize) -> Self {
        self.max_retrieved_docs = max;
        self
    }

    /// Drop retrieved chunks whose cosine similarity is below `threshold`.
    #[must_use]
    pub fn with_similarity_threshold(mut self, threshold: Option<f32>) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    #[must_use]
    pub fn store(&self) -> &ChunkStore<E> {
        &self.store
    }

    #[must_use]
    pub fn generator(&self) -> &G {
        &self.generator
    }

    #[must_use]
    pub fn processor(&self) -> &ChunkProcessor {
        &self.processor
    }

    /// Chunk and store `text`, returning the number of chunks stored.
    ///
    /// # Errors
    ///
    /// Returns a backend error if embedding or storage fails.
    pub async fn ingest_text(
        &self,
        text: &str,
        metadata: Option<&Metadata>,
    ) -> Result<usize, RagError> {
        let chunks = self.processor.process_text(text, metadata);
        self.ingest_chunks(chunks).await
    }

    /// # Errors
    ///
    /// Returns `NotFound` or `UnsupportedFormat` for unusable paths, and a
    /// backend error if loading, embedding or storage fails.
    pub async fn ingest_file(&self, path: &Path) -> Result<usize, RagError> {
        let chunks = self.processor.process_file(path).await?;
        self.ingest_chunks(chunks).await
    }

    /// Ingest every supported file directly inside `dir`, skipping files that fail to load.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `dir` does not exist, and a backend error if
    /// embedding or storage fails.
    pub async fn ingest_directory(&self, dir: &Path) -> Result<usize, RagError> {
        let chunks = self.processor.process_directory(dir).await?;
        self.ingest_chunks(chunks).await
    }

    async fn ingest_chunks(&self, chunks: Vec<ChunkPayload>) -> Result<usize, RagError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let count = chunks.len();
        let ids = (0..count)
            .map(|_| uuid::Uuid::new_v4().to_string())
            .collect();
        let (texts, metadatas): (Vec<_>, Vec<_>) =
            chunks.into_iter().map(|c| (c.content, c.metadata)).unzip();

        self.store
            .add_documents(texts, Some(metadatas), Some(ids))
            .await?;
        tracing::info!(collection = %self.store.collection(), chunks = count, "ingested chunks");
        Ok(count)
    }

    /// Retrieve up to `max_results` chunks (the configured default when `None`)
    /// and generate an answer grounded on them.
    ///
    /// The generator is not called when nothing relevant is retrieved.
    ///
    /// # Errors
    ///
    /// Returns a backend error if retrieval or generation fails.
    pub async fn query(
        &self,
        question: &str,
        max_results: Option<usize>,
    ) -> Result<QueryAnswer, RagError> {
        let limit = max_results.unwrap_or(self.max_retrieved_docs);
        let result = self.store.query(question, limit).await?;

        let sources: Vec<RetrievedSource> = result
            .documents
            .into_iter()
            .zip(result.metadatas)
            .zip(result.distances)
            .map(|((content, metadata), distance)| RetrievedSource {
                content,
                metadata,
                distance,
            })
            .filter(|s| {
                self.similarity_threshold
                    .is_none_or(|threshold| 1.0 - s.distance >= threshold)
            })
            .collect();

        if sources.is_empty() {
            tracing::debug!("no relevant chunks retrieved");
            return Ok(QueryAnswer {
                question: question.to_owned(),
                answer: NO_INFORMATION_ANSWER.to_owned(),
                sources,
            });
        }

        let context: Vec<String> = sources.iter().map(|s| s.content.clone()).collect();
        let answer = self.generator.generate(question, &context).await?;
        tracing::debug!(sources = sources.len(), "generated answer");

        Ok(QueryAnswer {
            question: question.to_owned(),
            answer,
            sources,
        })
    }

    /// Reconstruct per-source documents from every stored chunk.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the full scan fails.
    pub async fn unique_documents(&self) -> Result<Vec<SourceGroup>, RagError> {
        let set = self.store.get_all_documents().await?;
        Ok(group_by_source(&set))
    }

    /// # Errors
    ///
    /// Returns a backend error if the collection stats cannot be read.
    pub async fn system_info(&self) -> Result<SystemInfo, RagError> {
        let embedder = self.store.embedder();
        Ok(SystemInfo {
            vector_store: self.store.collection_info().await?,
            embedding_model: EmbeddingInfo {
                model_name: embedder.model_name().to_owned(),
                embedding_dimension: embedder.dimension(),
            },
            llm: GeneratorInfo {
                provider: self.generator.name().to_owned(),
                model: self.generator.model().to_owned(),
            },
        })
    }

    /// Empty the collection, leaving it ready for new chunks.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the collection cannot be recreated.
    pub async fn reset(&self) -> Result<(), RagError> {
        self.store.reset().await?;
        Ok(())
    }

    /// Drop the collection and consume the pipeline.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the drop fails.
    pub async fn delete_collection(self) -> Result<(), RagError> {
        self.store.delete_collection().await?;
        Ok(())
    }
}
