//! Builds the embedder, generator, vector store and pipeline from [`Config`].

use ragline_llm::any::{AnyEmbedder, AnyProvider};
use ragline_llm::ollama::{OLLAMA_BASE_URL, OllamaEmbedder, OllamaProvider};
use ragline_llm::openai::{GROQ_BASE_URL, OPENAI_BASE_URL, OpenAiEmbedder, OpenAiProvider};
use ragline_memory::document::ChunkProcessor;
use ragline_memory::{ChunkStore, QdrantOps, SqliteVectorStore, VectorStore};

use crate::config::{Config, EmbeddingProviderKind, Environment, LlmProviderKind};
use crate::error::RagError;
use crate::pipeline::RetrievalPipeline;

pub type DefaultPipeline = RetrievalPipeline<AnyEmbedder, AnyProvider>;

/// Validate `config` and assemble a ready pipeline over an open collection.
///
/// # Errors
///
/// Returns `Configuration` for invalid settings or a collection whose vector
/// width differs from the embedder's, and a backend error if any external
/// service is unreachable.
pub async fn build_pipeline(config: &Config) -> Result<DefaultPipeline, RagError> {
    config.validate()?;

    let embedder = build_embedder(config).await?;
    let generator = build_generator(config)?;
    let backend = build_store(config).await?;

    let store = ChunkStore::open(backend, config.store.collection_name.clone(), embedder).await?;

    Ok(RetrievalPipeline::new(
        ChunkProcessor::new(config.chunking.splitter()),
        store,
        generator,
    )
    .with_max_retrieved_docs(config.retrieval.max_retrieved_docs)
    .with_similarity_threshold(config.retrieval.similarity_threshold))
}

/// Create the configured embedder, discovering its output width.
///
/// # Errors
///
/// Returns an error if the embedding backend cannot be reached or loaded.
pub async fn build_embedder(config: &Config) -> Result<AnyEmbedder, RagError> {
    let model = config.embedding.model.clone();
    let embedder = match config.embedding.provider {
        EmbeddingProviderKind::Ollama => {
            let base_url = config.embedding.base_url.as_deref().unwrap_or(OLLAMA_BASE_URL);
            AnyEmbedder::Ollama(OllamaEmbedder::connect(base_url, model).await?)
        }
        EmbeddingProviderKind::OpenAi => {
            let key = config
                .secrets
                .embedding_api_key
                .as_ref()
                .ok_or_else(|| {
                    RagError::Configuration("openai embeddings require an API key".into())
                })?
                .expose()
                .to_owned();
            let base_url = config.embedding.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
            AnyEmbedder::OpenAi(OpenAiEmbedder::connect(key, base_url, model).await?)
        }
        #[cfg(feature = "candle")]
        EmbeddingProviderKind::Candle => {
            use ragline_llm::candle_embed::{CandleDevice, CandleEmbedder};

            let embedder = tokio::task::spawn_blocking(move || {
                CandleEmbedder::load(&model, &CandleDevice::Cpu)
            })
            .await
            .map_err(RagError::backend)??;
            AnyEmbedder::Candle(embedder)
        }
        #[cfg(not(feature = "candle"))]
        EmbeddingProviderKind::Candle => {
            return Err(RagError::Configuration(
                "candle embeddings require building with the `candle` feature".into(),
            ));
        }
    };

    tracing::info!(
        model = %config.embedding.model,
        dimension = ragline_llm::Embedder::dimension(&embedder),
        "embedder ready"
    );
    Ok(embedder)
}

/// Create the configured generator.
///
/// # Errors
///
/// Returns `Configuration` if a hosted provider has no API key, or an error
/// if the HTTP client cannot be built.
pub fn build_generator(config: &Config) -> Result<AnyProvider, RagError> {
    let llm = &config.llm;
    let api_key = || {
        config
            .secrets
            .llm_api_key
            .as_ref()
            .map(|k| k.expose().to_owned())
            .ok_or_else(|| {
                RagError::Configuration(format!("{} requires an API key", llm.provider.as_str()))
            })
    };

    let provider = match llm.provider {
        LlmProviderKind::Groq => {
            let base_url = llm.base_url.as_deref().unwrap_or(GROQ_BASE_URL);
            AnyProvider::OpenAi(
                OpenAiProvider::new(api_key()?, base_url, llm.model.clone(), llm.max_tokens)?
                    .with_name("groq"),
            )
        }
        LlmProviderKind::OpenAi => {
            let base_url = llm.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
            AnyProvider::OpenAi(OpenAiProvider::new(
                api_key()?,
                base_url,
                llm.model.clone(),
                llm.max_tokens,
            )?)
        }
        LlmProviderKind::Ollama => {
            let base_url = llm.base_url.as_deref().unwrap_or(OLLAMA_BASE_URL);
            AnyProvider::Ollama(OllamaProvider::new(base_url, llm.model.clone()))
        }
    };
    Ok(provider)
}

/// Open the vector store backend selected by the environment.
///
/// # Errors
///
/// Returns `Configuration` if production has no Qdrant URL, or a backend
/// error if the store cannot be opened.
pub async fn build_store(config: &Config) -> Result<Box<dyn VectorStore>, RagError> {
    match config.environment {
        Environment::Development => {
            let store = SqliteVectorStore::open(&config.store.sqlite_path).await?;
            tracing::info!(path = %config.store.sqlite_path, "using sqlite vector store");
            Ok(Box::new(store))
        }
        Environment::Production => {
            let url = config.store.qdrant_url.as_deref().ok_or_else(|| {
                RagError::Configuration("qdrant_url must be set in production".into())
            })?;
            let api_key = config.secrets.qdrant_api_key.as_ref().map(|k| k.expose());
            let store = QdrantOps::new(url, api_key).map_err(RagError::backend)?;
            tracing::info!(url, "using qdrant vector store");
            Ok(Box::new(store))
        }
    }
}
