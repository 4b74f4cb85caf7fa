use std::path::Path;

use ragline_core::sample::{SAMPLE_TEXTS, ingest_samples};
use ragline_core::{NO_INFORMATION_ANSWER, RagError, RetrievalPipeline};
use ragline_llm::mock::{MockEmbedder, MockProvider};
use ragline_memory::document::{ChunkProcessor, SplitterConfig};
use ragline_memory::{ChunkStore, Metadata, SqliteVectorStore};
use serde_json::json;

type TestPipeline = RetrievalPipeline<MockEmbedder, MockProvider>;

async fn pipeline_with(config: SplitterConfig, generator: MockProvider) -> TestPipeline {
    let backend = SqliteVectorStore::open(":memory:").await.unwrap();
    let store = ChunkStore::open(Box::new(backend), "rag_documents", MockEmbedder::new(256))
        .await
        .unwrap();
    RetrievalPipeline::new(ChunkProcessor::new(config), store, generator)
}

async fn pipeline(generator: MockProvider) -> TestPipeline {
    pipeline_with(SplitterConfig::default(), generator).await
}

async fn document_count(pipeline: &TestPipeline) -> u64 {
    pipeline
        .system_info()
        .await
        .unwrap()
        .vector_store
        .document_count
}

fn source(label: &str) -> Metadata {
    let mut meta = Metadata::new();
    meta.insert("source".into(), json!(label));
    meta
}

#[tokio::test]
async fn ingest_text_increases_count_by_returned_chunks() {
    let pipeline = pipeline_with(
        SplitterConfig {
            chunk_size: 80,
            chunk_overlap: 20,
            sentence_aware: true,
        },
        MockProvider::default(),
    )
    .await;

    let before = document_count(&pipeline).await;
    let chunks = pipeline
        .ingest_text(SAMPLE_TEXTS[3].text, None)
        .await
        .unwrap();
    assert!(chunks > 1);
    assert_eq!(document_count(&pipeline).await, before + chunks as u64);

    let more = pipeline.ingest_text("One more sentence.", None).await.unwrap();
    assert_eq!(more, 1);
    assert_eq!(document_count(&pipeline).await, before + (chunks + more) as u64);
}

#[tokio::test]
async fn empty_text_ingests_nothing() {
    let pipeline = pipeline(MockProvider::default()).await;
    pipeline.ingest_text("seed", None).await.unwrap();

    let before = document_count(&pipeline).await;
    assert_eq!(pipeline.ingest_text("", None).await.unwrap(), 0);
    assert_eq!(pipeline.ingest_text("  \n ", None).await.unwrap(), 0);
    assert_eq!(document_count(&pipeline).await, before);
    assert_eq!(pipeline.store().embedder().batch_count(), 1);
}

#[tokio::test]
async fn query_on_empty_collection_skips_generator() {
    let generator = MockProvider::default();
    let pipeline = pipeline(generator.clone()).await;

    let answer = pipeline.query("What is RAG?", None).await.unwrap();
    assert_eq!(answer.question, "What is RAG?");
    assert_eq!(answer.answer, NO_INFORMATION_ANSWER);
    assert!(answer.sources.is_empty());
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test]
async fn query_respects_limit_and_orders_by_distance() {
    let generator = MockProvider::with_response("answer");
    let pipeline = pipeline(generator.clone()).await;
    ingest_samples(&pipeline).await.unwrap();

    for k in [1, 2, 3, 10] {
        let answer = pipeline
            .query("vector databases similarity search", Some(k))
            .await
            .unwrap();
        assert!(answer.sources.len() <= k);
        assert!(!answer.sources.is_empty());
        for pair in answer.sources.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    let answer = pipeline
        .query("vector databases similarity search", Some(1))
        .await
        .unwrap();
    assert_eq!(answer.answer, "answer");
    assert_eq!(answer.sources[0].metadata["source"], json!("Vector DB Guide"));
    assert_eq!(generator.call_count(), 5);
}

#[tokio::test]
async fn default_limit_is_configurable() {
    let pipeline = pipeline(MockProvider::default())
        .await
        .with_max_retrieved_docs(2);
    ingest_samples(&pipeline).await.unwrap();

    let answer = pipeline.query("AI", None).await.unwrap();
    assert_eq!(answer.sources.len(), 2);
}

#[tokio::test]
async fn inserted_chunk_round_trips_into_source_group() {
    let pipeline = pipeline(MockProvider::default()).await;
    let mut meta = source("doc.txt");
    meta.insert("chunk_id".into(), json!(0));

    pipeline
        .store()
        .add_documents(
            vec!["The inserted text.".into()],
            Some(vec![meta]),
            Some(vec!["chunk-1".into()]),
        )
        .await
        .unwrap();

    let groups = pipeline.unique_documents().await.unwrap();
    let group = groups.iter().find(|g| g.source == "doc.txt").unwrap();
    assert_eq!(group.chunks[0].content, "The inserted text.");
    assert_eq!(group.chunks[0].id, "chunk-1");
}

#[tokio::test]
async fn reset_is_idempotent() {
    let pipeline = pipeline(MockProvider::default()).await;
    ingest_samples(&pipeline).await.unwrap();
    assert!(document_count(&pipeline).await > 0);

    pipeline.reset().await.unwrap();
    assert_eq!(document_count(&pipeline).await, 0);

    pipeline.reset().await.unwrap();
    assert_eq!(document_count(&pipeline).await, 0);

    assert_eq!(pipeline.ingest_text("fresh start", None).await.unwrap(), 1);
    assert_eq!(document_count(&pipeline).await, 1);
}

#[tokio::test]
async fn unique_documents_groups_by_source_in_chunk_order() {
    let pipeline = pipeline_with(
        SplitterConfig {
            chunk_size: 30,
            chunk_overlap: 0,
            sentence_aware: true,
        },
        MockProvider::default(),
    )
    .await;

    let a = pipeline
        .ingest_text(
            "Alpha one is here. Alpha two is here. Alpha three is here.",
            Some(&source("A")),
        )
        .await
        .unwrap();
    let b = pipeline
        .ingest_text("Beta one is here. Beta two is here.", Some(&source("B")))
        .await
        .unwrap();
    assert_eq!((a, b), (3, 2));

    let groups = pipeline.unique_documents().await.unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].source, "A");
    assert_eq!(groups[0].total_chunks, 3);
    assert_eq!(groups[1].source, "B");
    assert_eq!(groups[1].total_chunks, 2);

    let ids: Vec<_> = groups[0].chunks.iter().map(|c| c.chunk_id).collect();
    assert_eq!(ids, vec![Some(0), Some(1), Some(2)]);
    assert!(groups[0].chunks[0].content.starts_with("Alpha one"));
    assert!(groups[0].chunks[2].content.starts_with("Alpha three"));
}

#[tokio::test]
async fn missing_file_is_not_found_and_stores_nothing() {
    let pipeline = pipeline(MockProvider::default()).await;
    let before = document_count(&pipeline).await;

    let result = pipeline
        .ingest_file(Path::new("/nonexistent/report.pdf"))
        .await;
    assert!(matches!(result, Err(RagError::NotFound(_))));
    assert_eq!(document_count(&pipeline).await, before);
}

#[tokio::test]
async fn unsupported_extension_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes.csv");
    std::fs::write(&file, "a,b,c").unwrap();

    let pipeline = pipeline(MockProvider::default()).await;
    let result = pipeline.ingest_file(&file).await;
    assert!(matches!(result, Err(RagError::UnsupportedFormat(_))));
}

#[tokio::test]
async fn ingest_file_and_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("guide.md"), "# Guide\n\nVectors are lists of numbers.").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "Chunks overlap a little.").unwrap();
    std::fs::write(dir.path().join("ignored.json"), "{}").unwrap();

    let pipeline = pipeline(MockProvider::default()).await;
    let single = pipeline
        .ingest_file(&dir.path().join("notes.txt"))
        .await
        .unwrap();
    assert_eq!(single, 1);

    let all = pipeline.ingest_directory(dir.path()).await.unwrap();
    assert_eq!(all, 2);
    assert_eq!(document_count(&pipeline).await, 3);

    let groups = pipeline.unique_documents().await.unwrap();
    let labels: Vec<_> = groups.iter().map(|g| g.source.as_str()).collect();
    assert_eq!(labels, vec!["notes.txt", "guide.md"]);
    assert_eq!(groups[0].total_chunks, 2);
    assert_eq!(groups[1].metadata["content_type"], json!("text/markdown"));
}

#[tokio::test]
async fn large_file_without_sentence_breaks_is_chunked_within_size() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("log.txt");
    let text = "line of log output\n".repeat(4000);
    assert!(text.len() > 65_535);
    std::fs::write(&path, &text).unwrap();

    let pipeline = pipeline(MockProvider::default()).await;
    let count = pipeline.ingest_file(&path).await.unwrap();
    assert!(count > 1);
    assert_eq!(document_count(&pipeline).await, count as u64);

    let all = pipeline.store().get_all_documents().await.unwrap();
    assert_eq!(all.documents.len(), count);
    for doc in &all.documents {
        assert!(doc.chars().count() <= SplitterConfig::default().chunk_size);
    }
}

#[tokio::test]
async fn missing_directory_is_not_found() {
    let pipeline = pipeline(MockProvider::default()).await;
    let result = pipeline
        .ingest_directory(Path::new("/nonexistent/docs"))
        .await;
    assert!(matches!(result, Err(RagError::NotFound(_))));
}

#[tokio::test]
async fn embedding_failure_propagates_as_backend_error() {
    let backend = SqliteVectorStore::open(":memory:").await.unwrap();
    let store = ChunkStore::open(Box::new(backend), "rag_documents", MockEmbedder::failing(16))
        .await
        .unwrap();
    let pipeline = RetrievalPipeline::new(
        ChunkProcessor::default(),
        store,
        MockProvider::default(),
    );

    let result = pipeline.ingest_text("will not embed", None).await;
    assert!(matches!(result, Err(RagError::Backend(_))));
}

#[tokio::test]
async fn delete_collection_is_terminal() {
    let backend = SqliteVectorStore::open(":memory:").await.unwrap();
    let pool = backend.pool().clone();
    let store = ChunkStore::open(Box::new(backend), "rag_documents", MockEmbedder::new(8))
        .await
        .unwrap();
    let pipeline = RetrievalPipeline::new(
        ChunkProcessor::default(),
        store,
        MockProvider::default(),
    );
    pipeline.ingest_text("to be dropped", None).await.unwrap();

    pipeline.delete_collection().await.unwrap();

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM collections")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}
