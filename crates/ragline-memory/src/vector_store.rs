use std::future::Future;
use std::pin::Pin;

use serde::Serialize;

/// Open-ended per-chunk metadata.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, thiserror::Error)]
pub enum VectorStoreError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("collection error: {0}")]
    Collection(String),
    #[error("upsert error: {0}")]
    Upsert(String),
    #[error("search error: {0}")]
    Search(String),
    #[error("scroll error: {0}")]
    Scroll(String),
    #[error("count error: {0}")]
    Count(String),
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    Cosine,
}

impl DistanceMetric {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
        }
    }
}

/// Index type over the vector field; `Auto` lets the backend choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Auto,
}

impl IndexKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
        }
    }
}

/// Persisted collection layout: string id, bounded text, open metadata, fixed-width vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionSchema {
    pub dimension: u64,
    pub metric: DistanceMetric,
    pub index: IndexKind,
    pub id_max_chars: usize,
    pub text_max_chars: usize,
}

impl CollectionSchema {
    pub const ID_MAX_CHARS: usize = 100;
    pub const TEXT_MAX_CHARS: usize = 65_535;

    #[must_use]
    pub fn for_dimension(dimension: u64) -> Self {
        Self {
            dimension,
            metric: DistanceMetric::Cosine,
            index: IndexKind::Auto,
            id_max_chars: Self::ID_MAX_CHARS,
            text_max_chars: Self::TEXT_MAX_CHARS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: Metadata,
}

#[derive(Debug, Clone)]
pub struct ScoredVectorPoint {
    pub id: String,
    /// Cosine similarity, higher is closer.
    pub score: f32,
    pub text: String,
    pub metadata: Metadata,
}

/// A stored record without its vector, as returned by a full scan.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
}

/// Where a backend keeps its data, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionDescriptor {
    pub backend: &'static str,
    pub location: String,
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait VectorStore: Send + Sync {
    /// Create the collection with `schema` unless it already exists.
    fn ensure_collection(
        &self,
        collection: &str,
        schema: &CollectionSchema,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>>;

    /// Vector width of an existing collection, `None` when it is absent.
    fn collection_dimension(
        &self,
        collection: &str,
    ) -> BoxFuture<'_, Result<Option<u64>, VectorStoreError>>;

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Insert or replace all points as one batch; visible to reads once this resolves.
    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>>;

    /// Nearest neighbours of `vector`, best match first.
    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>>;

    fn scroll_all(&self, collection: &str)
    -> BoxFuture<'_, Result<Vec<StoredPoint>, VectorStoreError>>;

    /// Exact number of stored points.
    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>>;

    fn describe(&self) -> ConnectionDescriptor;
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
