//! Built-in sample documents for trying out a fresh collection.

use ragline_llm::{Embedder, LlmProvider};
use ragline_memory::Metadata;
use serde_json::Value;

use crate::error::RagError;
use crate::pipeline::RetrievalPipeline;

pub struct SampleText {
    pub source: &'static str,
    pub kind: &'static str,
    pub text: &'static str,
}

impl SampleText {
    #[must_use]
    pub fn metadata(&self) -> Metadata {
        let mut meta = Metadata::new();
        meta.insert("source".into(), Value::from(self.source));
        meta.insert("type".into(), Value::from(self.kind));
        meta
    }
}

pub const SAMPLE_TEXTS: [SampleText; 4] = [
    SampleText {
        source: "AI Basics",
        kind: "educational",
        text: "Artificial Intelligence (AI) is a branch of computer science that aims to create \
               intelligent machines that can perform tasks that typically require human \
               intelligence. Machine learning is a subset of AI that enables systems to learn and \
               improve from experience without being explicitly programmed.",
    },
    SampleText {
        source: "NLP Overview",
        kind: "educational",
        text: "Natural Language Processing (NLP) is a field of AI that focuses on the interaction \
               between computers and human language. It involves teaching computers to understand, \
               interpret, and generate human language in a way that is valuable. Common NLP tasks \
               include text classification, sentiment analysis, and machine translation.",
    },
    SampleText {
        source: "Vector DB Guide",
        kind: "technical",
        text: "Vector databases are specialized databases designed to store and query \
               high-dimensional vectors efficiently. They are essential for applications like \
               semantic search, recommendation systems, and AI-powered search engines. Unlike \
               traditional databases that use exact matches, vector databases use similarity \
               search to find the most similar vectors to a given query vector.",
    },
    SampleText {
        source: "RAG Systems",
        kind: "technical",
        text: "Retrieval-Augmented Generation (RAG) is an AI framework that combines the strengths \
               of large language models with information retrieval. RAG systems first retrieve \
               relevant information from a knowledge base and then use that information to \
               generate more accurate and contextually relevant responses. This approach helps \
               reduce hallucinations and improves the factual accuracy of AI responses.",
    },
];

/// Ingest every sample text, returning `(source, chunks)` per sample.
///
/// # Errors
///
/// Stops at the first sample that fails to ingest.
pub async fn ingest_samples<E: Embedder, G: LlmProvider>(
    pipeline: &RetrievalPipeline<E, G>,
) -> Result<Vec<(&'static str, usize)>, RagError> {
    let mut counts = Vec::with_capacity(SAMPLE_TEXTS.len());
    for sample in &SAMPLE_TEXTS {
        let count = pipeline
            .ingest_text(sample.text, Some(&sample.metadata()))
            .await?;
        tracing::info!(source = sample.source, chunks = count, "ingested sample");
        counts.push((sample.source, count));
    }
    Ok(counts)
}
