use super::{Config, LlmProviderKind, Secret};

fn parse_kind<T: serde::de::DeserializeOwned>(value: &str) -> Option<T> {
    serde_json::from_value(serde_json::Value::String(value.to_ascii_lowercase())).ok()
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_core();
        self.apply_env_secrets();
    }

    fn apply_env_overrides_core(&mut self) {
        if let Ok(v) = std::env::var("RAGLINE_ENVIRONMENT") {
            if let Some(env) = parse_kind(&v) {
                self.environment = env;
            } else {
                tracing::warn!("ignoring invalid RAGLINE_ENVIRONMENT value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGLINE_CHUNK_SIZE") {
            if let Ok(size) = v.parse::<usize>() {
                self.chunking.chunk_size = size;
            } else {
                tracing::warn!("ignoring invalid RAGLINE_CHUNK_SIZE value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGLINE_CHUNK_OVERLAP") {
            if let Ok(overlap) = v.parse::<usize>() {
                self.chunking.chunk_overlap = overlap;
            } else {
                tracing::warn!("ignoring invalid RAGLINE_CHUNK_OVERLAP value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGLINE_MAX_RETRIEVED_DOCS") {
            if let Ok(n) = v.parse::<usize>() {
                self.retrieval.max_retrieved_docs = n;
            } else {
                tracing::warn!("ignoring invalid RAGLINE_MAX_RETRIEVED_DOCS value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGLINE_SIMILARITY_THRESHOLD") {
            if let Ok(threshold) = v.parse::<f32>() {
                self.retrieval.similarity_threshold = Some(threshold);
            } else {
                tracing::warn!("ignoring invalid RAGLINE_SIMILARITY_THRESHOLD value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGLINE_EMBEDDING_PROVIDER") {
            if let Some(kind) = parse_kind(&v) {
                self.embedding.provider = kind;
            } else {
                tracing::warn!("ignoring invalid RAGLINE_EMBEDDING_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGLINE_EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("RAGLINE_LLM_PROVIDER") {
            if let Some(kind) = parse_kind(&v) {
                self.llm.provider = kind;
            } else {
                tracing::warn!("ignoring invalid RAGLINE_LLM_PROVIDER value: {v}");
            }
        }
        if let Ok(v) = std::env::var("RAGLINE_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Ok(v) = std::env::var("RAGLINE_LLM_BASE_URL") {
            self.llm.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("RAGLINE_COLLECTION_NAME") {
            self.store.collection_name = v;
        }
        if let Ok(v) = std::env::var("RAGLINE_SQLITE_PATH") {
            self.store.sqlite_path = v;
        }
        if let Ok(v) = std::env::var("RAGLINE_QDRANT_URL") {
            self.store.qdrant_url = Some(v);
        }
    }

    fn apply_env_secrets(&mut self) {
        let provider_key = match self.llm.provider {
            LlmProviderKind::Groq => non_empty_var("GROQ_API_KEY"),
            LlmProviderKind::OpenAi => non_empty_var("OPENAI_API_KEY"),
            LlmProviderKind::Ollama => None,
        };
        if let Some(key) = non_empty_var("RAGLINE_LLM_API_KEY").or(provider_key) {
            self.secrets.llm_api_key = Some(Secret::new(key));
        }
        if let Some(key) =
            non_empty_var("RAGLINE_EMBEDDING_API_KEY").or_else(|| non_empty_var("OPENAI_API_KEY"))
        {
            self.secrets.embedding_api_key = Some(Secret::new(key));
        }
        if let Some(key) = non_empty_var("RAGLINE_QDRANT_API_KEY") {
            self.secrets.qdrant_api_key = Some(Secret::new(key));
        }
    }
}
