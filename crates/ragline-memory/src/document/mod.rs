pub mod error;
pub mod loader;
pub mod processor;
pub mod splitter;
pub mod types;

pub use error::DocumentError;
pub use loader::{DEFAULT_MAX_FILE_SIZE, FileLoader, SourceFormat};
pub use processor::{ChunkProcessor, SUPPORTED_EXTENSIONS};
pub use splitter::{SplitterConfig, TextSplitter};
pub use types::{ChunkPayload, Document};
