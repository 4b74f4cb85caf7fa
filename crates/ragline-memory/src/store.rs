use ragline_llm::Embedder;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;
use crate::vector_store::{CollectionSchema, ConnectionDescriptor, Metadata, VectorPoint, VectorStore};

/// Nearest chunks for one query as parallel sequences, closest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<Metadata>,
    /// `1 - cosine similarity`; lower is closer.
    pub distances: Vec<f32>,
}

impl QueryResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Every stored chunk as parallel sequences.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentSet {
    pub ids: Vec<String>,
    pub documents: Vec<String>,
    pub metadatas: Vec<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub document_count: u64,
    pub connection: ConnectionDescriptor,
}

/// A named collection of embedded chunks on top of any [`VectorStore`] backend.
pub struct ChunkStore<E: Embedder> {
    backend: Box<dyn VectorStore>,
    collection: String,
    embedder: E,
    schema: CollectionSchema,
}

impl<E: Embedder> std::fmt::Debug for ChunkStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkStore")
            .field("collection", &self.collection)
            .field("backend", &self.backend.describe())
            .field("dimension", &self.schema.dimension)
            .finish_non_exhaustive()
    }
}

impl<E: Embedder> ChunkStore<E> {
    /// Open `collection`, creating it with the embedder's dimension if absent.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the existing collection was created with a
    /// different vector width, or a backend error if the store is unreachable.
    pub async fn open(
        backend: Box<dyn VectorStore>,
        collection: impl Into<String>,
        embedder: E,
    ) -> Result<Self, StoreError> {
        let collection = collection.into();
        let dimension = embedder.dimension() as u64;
        let schema = CollectionSchema::for_dimension(dimension);

        match backend.collection_dimension(&collection).await? {
            Some(existing) if existing != dimension => {
                return Err(StoreError::Configuration(format!(
                    "collection '{collection}' stores {existing}-dimensional vectors but \
                     embedding model '{}' produces {dimension}",
                    embedder.model_name()
                )));
            }
            Some(_) => {
                tracing::debug!(collection = %collection, dimension, "opened existing collection");
            }
            None => {
                backend.ensure_collection(&collection, &schema).await?;
                tracing::info!(collection = %collection, dimension, "created collection");
            }
        }

        Ok(Self {
            backend,
            collection,
            embedder,
            schema,
        })
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    #[must_use]
    pub fn schema(&self) -> &CollectionSchema {
        &self.schema
    }

    /// Embed `texts` in one batch and store them atomically.
    ///
    /// Missing ids default to `doc_{i}` and missing metadata to
    /// `{"source": "document_{i}"}`, where `i` is the position in `texts`.
    /// Reusing an id replaces the stored chunk.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBatch` on length mismatches or oversized ids/texts,
    /// before anything is embedded. Embedding and backend failures abort the
    /// whole batch.
    pub async fn add_documents(
        &self,
        texts: Vec<String>,
        metadatas: Option<Vec<Metadata>>,
        ids: Option<Vec<String>>,
    ) -> Result<(), StoreError> {
        let len = texts.len();
        let metadatas = match metadatas {
            Some(m) if m.len() != len => {
                return Err(StoreError::InvalidBatch(format!(
                    "{} metadata entries for {len} texts",
                    m.len()
                )));
            }
            Some(m) => m,
            None => (0..len)
                .map(|i| {
                    let mut meta = Metadata::new();
                    meta.insert("source".into(), Value::from(format!("document_{i}")));
                    meta
                })
                .collect(),
        };
        let ids = match ids {
            Some(ids) if ids.len() != len => {
                return Err(StoreError::InvalidBatch(format!(
                    "{} ids for {len} texts",
                    ids.len()
                )));
            }
            Some(ids) => ids,
            None => (0..len).map(|i| format!("doc_{i}")).collect(),
        };

        if len == 0 {
            return Ok(());
        }

        self.check_bounds(&texts, &ids)?;

        let vectors = self.embedder.embed_batch(&texts).await?;
        if let Some(bad) = vectors
            .iter()
            .find(|v| v.len() as u64 != self.schema.dimension)
        {
            return Err(StoreError::Configuration(format!(
                "embedder returned a {}-dimensional vector, collection expects {}",
                bad.len(),
                self.schema.dimension
            )));
        }

        let points: Vec<VectorPoint> = ids
            .into_iter()
            .zip(texts)
            .zip(metadatas)
            .zip(vectors)
            .map(|(((id, text), metadata), vector)| VectorPoint {
                id,
                vector,
                text,
                metadata,
            })
            .collect();

        self.backend.upsert(&self.collection, points).await?;
        tracing::debug!(collection = %self.collection, count = len, "stored chunks");
        Ok(())
    }

    fn check_bounds(&self, texts: &[String], ids: &[String]) -> Result<(), StoreError> {
        if let Some(id) = ids
            .iter()
            .find(|id| id.is_empty() || id.chars().count() > self.schema.id_max_chars)
        {
            return Err(StoreError::InvalidBatch(format!(
                "id must be 1..={} characters, got {}",
                self.schema.id_max_chars,
                id.chars().count()
            )));
        }
        if let Some((i, _)) = texts
            .iter()
            .enumerate()
            .find(|(_, t)| t.chars().count() > self.schema.text_max_chars)
        {
            return Err(StoreError::InvalidBatch(format!(
                "text at position {i} exceeds {} characters",
                self.schema.text_max_chars
            )));
        }
        Ok(())
    }

    /// Return up to `limit` chunks nearest to `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding or the backend search fails.
    pub async fn query(&self, text: &str, limit: usize) -> Result<QueryResult, StoreError> {
        if limit == 0 {
            return Ok(QueryResult::default());
        }

        let vector = self.embedder.embed(text).await?;
        let hits = self
            .backend
            .search(&self.collection, vector, limit as u64)
            .await?;

        let mut result = QueryResult::default();
        for hit in hits {
            result.ids.push(hit.id);
            result.documents.push(hit.text);
            result.metadatas.push(hit.metadata);
            result.distances.push(1.0 - hit.score);
        }
        Ok(result)
    }

    /// Scan every stored chunk.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend scan fails.
    pub async fn get_all_documents(&self) -> Result<DocumentSet, StoreError> {
        let points = self.backend.scroll_all(&self.collection).await?;
        let mut set = DocumentSet::default();
        for point in points {
            set.ids.push(point.id);
            set.documents.push(point.text);
            set.metadatas.push(point.metadata);
        }
        Ok(set)
    }

    /// # Errors
    ///
    /// Returns an error if the backend count fails.
    pub async fn collection_info(&self) -> Result<CollectionInfo, StoreError> {
        let document_count = self.backend.count(&self.collection).await?;
        Ok(CollectionInfo {
            name: self.collection.clone(),
            document_count,
            connection: self.backend.describe(),
        })
    }

    /// Drop and recreate the collection with the same schema.
    ///
    /// An absent collection is only recreated. A failed drop is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be recreated.
    pub async fn reset(&self) -> Result<(), StoreError> {
        match self.backend.collection_exists(&self.collection).await {
            Ok(false) => {
                tracing::debug!(collection = %self.collection, "collection already absent");
            }
            Ok(true) | Err(_) => {
                if let Err(e) = self.backend.delete_collection(&self.collection).await {
                    tracing::warn!(collection = %self.collection, "failed to drop collection: {e:#}");
                }
            }
        }
        self.backend
            .ensure_collection(&self.collection, &self.schema)
            .await?;
        tracing::info!(collection = %self.collection, "collection reset");
        Ok(())
    }

    /// Drop the collection; the store cannot be used afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend drop fails.
    pub async fn delete_collection(self) -> Result<(), StoreError> {
        self.backend.delete_collection(&self.collection).await?;
        tracing::info!(collection = %self.collection, "collection deleted");
        Ok(())
    }
}
