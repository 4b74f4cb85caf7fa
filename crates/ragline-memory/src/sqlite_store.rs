//! Embedded vector store on a single `SQLite` database file.
//!
//! Vectors are stored as little-endian `f32` blobs and ranked by exact cosine
//! similarity in process, which suits the local development deployment.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::vector_store::{
    CollectionSchema, ConnectionDescriptor, Metadata, ScoredVectorPoint, StoredPoint, VectorPoint,
    VectorStore, VectorStoreError, cosine_similarity,
};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

const SCHEMA: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY,
        dimension INTEGER NOT NULL,
        metric TEXT NOT NULL,
        index_kind TEXT NOT NULL,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    )",
    "CREATE TABLE IF NOT EXISTS chunk_points (
        collection TEXT NOT NULL REFERENCES collections(name) ON DELETE CASCADE,
        id TEXT NOT NULL,
        text TEXT NOT NULL,
        metadata TEXT NOT NULL,
        vector BLOB NOT NULL,
        PRIMARY KEY (collection, id)
    )",
];

#[derive(Debug, Clone)]
pub struct SqliteVectorStore {
    pool: SqlitePool,
    path: String,
}

impl SqliteVectorStore {
    /// Open (or create) the database and its tables.
    ///
    /// `":memory:"` opens a private in-memory database on a single connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the tables cannot be created.
    pub async fn open(path: &str) -> Result<Self, VectorStoreError> {
        let in_memory = path == ":memory:";
        let url = if in_memory {
            "sqlite::memory:".to_string()
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent).map_err(|e| {
                    VectorStoreError::Connection(format!(
                        "failed to create {}: {e}",
                        parent.display()
                    ))
                })?;
            }
            format!("sqlite:{path}?mode=rwc")
        };

        let opts = SqliteConnectOptions::from_str(&url)
            .map_err(connection_err)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        // Every in-memory connection is a separate database, so keep exactly one alive.
        let pool_opts = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_opts
            .connect_with(opts)
            .await
            .map_err(connection_err)?;

        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(connection_err)?;
        }

        tracing::debug!(path, "opened sqlite vector store");

        Ok(Self {
            pool,
            path: path.to_owned(),
        })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn dimension_of(&self, collection: &str) -> Result<Option<u64>, sqlx::Error> {
        let dim: Option<i64> =
            sqlx::query_scalar("SELECT dimension FROM collections WHERE name = ?")
                .bind(collection)
                .fetch_optional(&self.pool)
                .await?;
        Ok(dim.and_then(|d| u64::try_from(d).ok()))
    }

    async fn insert_batch(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> Result<(), VectorStoreError> {
        let dimension = self
            .dimension_of(collection)
            .await
            .map_err(|e| VectorStoreError::Upsert(e.to_string()))?
            .ok_or_else(|| {
                VectorStoreError::Collection(format!("collection {collection} does not exist"))
            })?;

        if let Some(bad) = points
            .iter()
            .find(|p| p.vector.len() as u64 != dimension)
        {
            return Err(VectorStoreError::Upsert(format!(
                "point {} has {} dimensions, collection expects {dimension}",
                bad.id,
                bad.vector.len()
            )));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;

        for point in points {
            let metadata = serde_json::to_string(&point.metadata)
                .map_err(|e| VectorStoreError::Serialization(e.to_string()))?;
            sqlx::query(
                "INSERT INTO chunk_points (collection, id, text, metadata, vector) \
                 VALUES (?, ?, ?, ?, ?) \
                 ON CONFLICT(collection, id) DO UPDATE SET \
                 text = excluded.text, metadata = excluded.metadata, vector = excluded.vector",
            )
            .bind(collection)
            .bind(&point.id)
            .bind(&point.text)
            .bind(metadata)
            .bind(encode_vector(&point.vector))
            .execute(&mut *tx)
            .await
            .map_err(|e| VectorStoreError::Upsert(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| VectorStoreError::Upsert(e.to_string()))
    }
}

impl VectorStore for SqliteVectorStore {
    fn ensure_collection(
        &self,
        collection: &str,
        schema: &CollectionSchema,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        let schema = *schema;
        Box::pin(async move {
            let dimension = i64::try_from(schema.dimension)
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            sqlx::query(
                "INSERT INTO collections (name, dimension, metric, index_kind) \
                 VALUES (?, ?, ?, ?) ON CONFLICT(name) DO NOTHING",
            )
            .bind(&collection)
            .bind(dimension)
            .bind(schema.metric.as_str())
            .bind(schema.index.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(())
        })
    }

    fn collection_exists(&self, collection: &str) -> BoxFuture<'_, Result<bool, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.dimension_of(&collection)
                .await
                .map(|d| d.is_some())
                .map_err(|e| VectorStoreError::Collection(e.to_string()))
        })
    }

    fn collection_dimension(
        &self,
        collection: &str,
    ) -> BoxFuture<'_, Result<Option<u64>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            self.dimension_of(&collection)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))
        })
    }

    fn delete_collection(&self, collection: &str) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            sqlx::query("DELETE FROM collections WHERE name = ?")
                .bind(&collection)
                .execute(&self.pool)
                .await
                .map_err(|e| VectorStoreError::Collection(e.to_string()))?;
            Ok(())
        })
    }

    fn upsert(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> BoxFuture<'_, Result<(), VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            if points.is_empty() {
                return Ok(());
            }
            self.insert_batch(&collection, points).await
        })
    }

    fn search(
        &self,
        collection: &str,
        vector: Vec<f32>,
        limit: u64,
    ) -> BoxFuture<'_, Result<Vec<ScoredVectorPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let rows: Vec<(String, String, String, Vec<u8>)> = sqlx::query_as(
                "SELECT id, text, metadata, vector FROM chunk_points \
                 WHERE collection = ? ORDER BY rowid",
            )
            .bind(&collection)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VectorStoreError::Search(e.to_string()))?;

            let mut scored = Vec::with_capacity(rows.len());
            for (id, text, metadata, blob) in rows {
                let score = cosine_similarity(&vector, &decode_vector(&blob));
                scored.push(ScoredVectorPoint {
                    id,
                    score,
                    text,
                    metadata: parse_metadata(&metadata)?,
                });
            }

            // Stable sort keeps insertion order among equal scores.
            scored.sort_by(|a, b| b.score.total_cmp(&a.score));
            scored.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
            Ok(scored)
        })
    }

    fn scroll_all(
        &self,
        collection: &str,
    ) -> BoxFuture<'_, Result<Vec<StoredPoint>, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let rows: Vec<(String, String, String)> = sqlx::query_as(
                "SELECT id, text, metadata FROM chunk_points \
                 WHERE collection = ? ORDER BY rowid",
            )
            .bind(&collection)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| VectorStoreError::Scroll(e.to_string()))?;

            rows.into_iter()
                .map(|(id, text, metadata)| {
                    Ok(StoredPoint {
                        id,
                        text,
                        metadata: parse_metadata(&metadata)?,
                    })
                })
                .collect()
        })
    }

    fn count(&self, collection: &str) -> BoxFuture<'_, Result<u64, VectorStoreError>> {
        let collection = collection.to_owned();
        Box::pin(async move {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM chunk_points WHERE collection = ?")
                    .bind(&collection)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| VectorStoreError::Count(e.to_string()))?;
            u64::try_from(count).map_err(|e| VectorStoreError::Count(e.to_string()))
        })
    }

    fn describe(&self) -> ConnectionDescriptor {
        ConnectionDescriptor {
            backend: "sqlite",
            location: self.path.clone(),
        }
    }
}

#[allow(clippy::needless_pass_by_value)]
fn connection_err(e: sqlx::Error) -> VectorStoreError {
    VectorStoreError::Connection(e.to_string())
}

fn parse_metadata(raw: &str) -> Result<Metadata, VectorStoreError> {
    serde_json::from_str(raw).map_err(|e| VectorStoreError::Serialization(e.to_string()))
}

fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn decode_vector(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn point(id: &str, vector: Vec<f32>, text: &str) -> VectorPoint {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), json!("test.txt"));
        VectorPoint {
            id: id.to_owned(),
            vector,
            text: text.to_owned(),
            metadata,
        }
    }

    async fn store_with_collection(dim: u64) -> SqliteVectorStore {
        let store = SqliteVectorStore::open(":memory:").await.unwrap();
        store
            .ensure_collection("docs", &CollectionSchema::for_dimension(dim))
            .await
            .unwrap();
        store
    }

    #[test]
    fn vector_blob_encoding_is_little_endian() {
        let v = vec![1.0f32, -2.5, 0.0];
        let bytes = encode_vector(&v);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(decode_vector(&bytes), v);
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent() {
        let store = store_with_collection(3).await;
        store
            .ensure_collection("docs", &CollectionSchema::for_dimension(3))
            .await
            .unwrap();
        assert!(store.collection_exists("docs").await.unwrap());
        assert_eq!(store.collection_dimension("docs").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn missing_collection_has_no_dimension() {
        let store = SqliteVectorStore::open(":memory:").await.unwrap();
        assert!(!store.collection_exists("nope").await.unwrap());
        assert_eq!(store.collection_dimension("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn upsert_then_search_orders_by_similarity() {
        let store = store_with_collection(3).await;
        store
            .upsert(
                "docs",
                vec![
                    point("a", vec![1.0, 0.0, 0.0], "alpha"),
                    point("b", vec![0.0, 1.0, 0.0], "beta"),
                    point("c", vec![0.9, 0.1, 0.0], "gamma"),
                ],
            )
            .await
            .unwrap();

        let results = store.search("docs", vec![1.0, 0.0, 0.0], 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert_eq!(results[1].id, "c");
        assert!(results[0].score >= results[1].score);
        assert_eq!(results[0].metadata["source"], "test.txt");
    }

    #[tokio::test]
    async fn upsert_replaces_existing_id() {
        let store = store_with_collection(2).await;
        store
            .upsert("docs", vec![point("x", vec![1.0, 0.0], "old")])
            .await
            .unwrap();
        store
            .upsert("docs", vec![point("x", vec![0.0, 1.0], "new")])
            .await
            .unwrap();
        assert_eq!(store.count("docs").await.unwrap(), 1);
        let all = store.scroll_all("docs").await.unwrap();
        assert_eq!(all[0].text, "new");
    }

    #[tokio::test]
    async fn upsert_dimension_mismatch_rejects_whole_batch() {
        let store = store_with_collection(2).await;
        let result = store
            .upsert(
                "docs",
                vec![
                    point("ok", vec![1.0, 0.0], "fine"),
                    point("bad", vec![1.0, 0.0, 0.0], "wrong width"),
                ],
            )
            .await;
        assert!(matches!(result, Err(VectorStoreError::Upsert(_))));
        assert_eq!(store.count("docs").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn upsert_into_missing_collection_errors() {
        let store = SqliteVectorStore::open(":memory:").await.unwrap();
        let result = store
            .upsert("ghost", vec![point("a", vec![1.0], "t")])
            .await;
        assert!(matches!(result, Err(VectorStoreError::Collection(_))));
    }

    #[tokio::test]
    async fn scroll_all_preserves_insertion_order() {
        let store = store_with_collection(2).await;
        store
            .upsert(
                "docs",
                vec![
                    point("3", vec![1.0, 0.0], "third"),
                    point("1", vec![1.0, 0.0], "first"),
                ],
            )
            .await
            .unwrap();
        let all = store.scroll_all("docs").await.unwrap();
        let ids: Vec<_> = all.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[tokio::test]
    async fn delete_collection_removes_points() {
        let store = store_with_collection(2).await;
        store
            .upsert("docs", vec![point("a", vec![1.0, 0.0], "t")])
            .await
            .unwrap();
        store.delete_collection("docs").await.unwrap();
        assert!(!store.collection_exists("docs").await.unwrap());
        assert_eq!(store.count("docs").await.unwrap(), 0);
        store.delete_collection("docs").await.unwrap();
    }

    #[tokio::test]
    async fn empty_collection_search_and_scroll() {
        let store = store_with_collection(2).await;
        assert!(store.search("docs", vec![1.0, 0.0], 5).await.unwrap().is_empty());
        assert!(store.scroll_all("docs").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_database_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("rag.db");
        let path = path.to_str().unwrap();
        {
            let store = SqliteVectorStore::open(path).await.unwrap();
            store
                .ensure_collection("docs", &CollectionSchema::for_dimension(2))
                .await
                .unwrap();
            store
                .upsert("docs", vec![point("a", vec![1.0, 0.0], "kept")])
                .await
                .unwrap();
            store.pool().close().await;
        }
        let store = SqliteVectorStore::open(path).await.unwrap();
        assert_eq!(store.count("docs").await.unwrap(), 1);
        assert_eq!(store.describe().backend, "sqlite");
        assert_eq!(store.describe().location, path);
    }
}
