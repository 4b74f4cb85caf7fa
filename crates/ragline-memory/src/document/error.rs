use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Holds the offending extension, or the whole path when there is none.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{} is {size} bytes, limit is {limit}", path.display())]
    FileTooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("text extraction failed for {}: {reason}", path.display())]
    Extraction { path: PathBuf, reason: String },
}
