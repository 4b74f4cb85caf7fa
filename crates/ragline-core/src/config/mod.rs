mod env;
mod types;


pub use types::*;

use std::path::Path;

use anyhow::Context;

use crate::error::RagError;

impl Config {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Check settings that would otherwise fail deep inside a backend.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] describing the first invalid setting.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.chunking.chunk_size == 0 {
            return Err(RagError::Configuration("chunk_size must be > 0".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.max_retrieved_docs == 0 {
            return Err(RagError::Configuration(
                "max_retrieved_docs must be > 0".into(),
            ));
        }
        if let Some(threshold) = self.retrieval.similarity_threshold
            && !(0.0..=1.0).contains(&threshold)
        {
            return Err(RagError::Configuration(format!(
                "similarity_threshold must be within [0, 1], got {threshold}"
            )));
        }
        if self.store.collection_name.trim().is_empty() {
            return Err(RagError::Configuration(
                "collection_name must not be empty".into(),
            ));
        }
        if self.environment == Environment::Production && self.store.qdrant_url.is_none() {
            return Err(RagError::Configuration(
                "qdrant_url must be set in the production environment".into(),
            ));
        }
        if self.environment == Environment::Production && self.secrets.qdrant_api_key.is_none() {
            return Err(RagError::Configuration(
                "the production environment requires a Qdrant API key (RAGLINE_QDRANT_API_KEY)"
                    .into(),
            ));
        }
        if self.llm.provider.requires_api_key() && self.secrets.llm_api_key.is_none() {
            return Err(RagError::Configuration(format!(
                "{} requires an API key (RAGLINE_LLM_API_KEY)",
                self.llm.provider.as_str()
            )));
        }
        if self.embedding.provider == EmbeddingProviderKind::OpenAi
            && self.secrets.embedding_api_key.is_none()
        {
            return Err(RagError::Configuration(
                "openai embeddings require an API key (RAGLINE_EMBEDDING_API_KEY)".into(),
            ));
        }
        Ok(())
    }

    /// Where chunks are persisted: the `SQLite` path or the Qdrant URL.
    #[must_use]
    pub fn storage_descriptor(&self) -> &str {
        match self.environment {
            Environment::Development => &self.store.sqlite_path,
            Environment::Production => self.store.qdrant_url.as_deref().unwrap_or_default(),
        }
    }
}
