//! Document chunking and embedded-chunk storage.
//!
//! [`document`] turns text and files into tagged chunks, [`ChunkStore`] embeds
//! and persists them behind the [`VectorStore`] backend trait, implemented by
//! [`SqliteVectorStore`] for local use and [`QdrantOps`] for a managed server.

pub mod document;
pub mod error;
pub mod qdrant_ops;
pub mod sqlite_store;
pub mod store;
pub mod vector_store;

pub use error::StoreError;
pub use qdrant_ops::QdrantOps;
pub use sqlite_store::SqliteVectorStore;
pub use store::{ChunkStore, CollectionInfo, DocumentSet, QueryResult};
pub use vector_store::{
    CollectionSchema, ConnectionDescriptor, Metadata, VectorStore, VectorStoreError,
};
