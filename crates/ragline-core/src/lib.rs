//! Retrieval-augmented generation pipeline: configuration, bootstrap, ingestion and query.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod sample;
pub mod sources;

pub use bootstrap::{DefaultPipeline, build_pipeline};
pub use config::Config;
pub use error::RagError;
pub use pipeline::{NO_INFORMATION_ANSWER, QueryAnswer, RetrievalPipeline, SystemInfo};
pub use sources::{SourceGroup, group_by_source};
