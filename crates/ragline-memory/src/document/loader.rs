//! Reads supported files into plain text.

use std::path::Path;

use super::{Document, DocumentError};

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Pdf,
    Text,
    Markdown,
}

impl SourceFormat {
    /// Detect the format from the file extension, case-insensitively.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::from_extension(&ext)
    }

    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            "md" => Some(Self::Markdown),
            _ => None,
        }
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Text => "text/plain",
            Self::Markdown => "text/markdown",
        }
    }
}

/// Loads a whole file as one [`Document`], refusing files above `max_file_size`.
#[derive(Debug, Clone, Copy)]
pub struct FileLoader {
    pub max_file_size: u64,
}

impl Default for FileLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl FileLoader {
    /// Read `path` as `format`.
    ///
    /// Text and Markdown replace invalid UTF-8 rather than failing. PDF pages
    /// are concatenated into a single document.
    ///
    /// # Errors
    ///
    /// Returns `FileTooLarge` above the size limit, `Io` if the file cannot be
    /// read, `Extraction` if PDF parsing fails, and `UnsupportedFormat` for PDF
    /// when built without the `pdf` feature.
    pub async fn load(&self, path: &Path, format: SourceFormat) -> Result<Document, DocumentError> {
        let size = tokio::fs::metadata(path).await?.len();
        if size > self.max_file_size {
            return Err(DocumentError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.max_file_size,
            });
        }

        let content = match format {
            SourceFormat::Pdf => extract_pdf(path).await?,
            SourceFormat::Text | SourceFormat::Markdown => {
                let bytes = tokio::fs::read(path).await?;
                String::from_utf8_lossy(&bytes).into_owned()
            }
        };

        Ok(Document {
            content,
            content_type: format.content_type(),
        })
    }
}

#[cfg(feature = "pdf")]
async fn extract_pdf(path: &Path) -> Result<String, DocumentError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text(&owned).map_err(|e| DocumentError::Extraction {
            reason: e.to_string(),
            path: owned,
        })
    })
    .await
    .map_err(|e| DocumentError::Io(std::io::Error::other(e)))?
}

#[cfg(not(feature = "pdf"))]
#[allow(clippy::unused_async)]
async fn extract_pdf(_path: &Path) -> Result<String, DocumentError> {
    Err(DocumentError::UnsupportedFormat("pdf".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_detection() {
        assert_eq!(
            SourceFormat::from_path(Path::new("a/REPORT.PDF")),
            Some(SourceFormat::Pdf)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("notes.md")),
            Some(SourceFormat::Markdown)
        );
        assert_eq!(SourceFormat::from_path(Path::new("data.csv")), None);
        assert_eq!(SourceFormat::from_path(Path::new("Makefile")), None);
    }

    #[tokio::test]
    async fn load_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("test.txt");
        std::fs::write(&file, "hello world").unwrap();

        let doc = FileLoader::default()
            .load(&file, SourceFormat::Text)
            .await
            .unwrap();
        assert_eq!(doc.content, "hello world");
        assert_eq!(doc.content_type, "text/plain");
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("latin1.txt");
        std::fs::write(&file, [b'c', b'a', b'f', 0xE9]).unwrap();

        let doc = FileLoader::default()
            .load(&file, SourceFormat::Text)
            .await
            .unwrap();
        assert!(doc.content.starts_with("caf"));
        assert!(doc.content.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let result = FileLoader::default()
            .load(Path::new("/nonexistent/file.md"), SourceFormat::Markdown)
            .await;
        assert!(matches!(result, Err(DocumentError::Io(_))));
    }

    #[tokio::test]
    async fn file_too_large_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.pdf");
        std::fs::write(&file, "%PDF").unwrap();

        let loader = FileLoader { max_file_size: 1 };
        let result = loader.load(&file, SourceFormat::Pdf).await;
        assert!(matches!(
            result,
            Err(DocumentError::FileTooLarge { size: 4, limit: 1, .. })
        ));
    }

    #[tokio::test]
    async fn broken_pdf_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("broken.pdf");
        std::fs::write(&file, "not a pdf").unwrap();

        let result = FileLoader::default().load(&file, SourceFormat::Pdf).await;
        assert!(result.is_err());
    }
}
