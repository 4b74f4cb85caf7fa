use std::path::Path;

use serde_json::Value;

use super::{ChunkPayload, DocumentError, FileLoader, SourceFormat, SplitterConfig, TextSplitter};
use crate::vector_store::Metadata;

/// File extensions accepted for ingestion, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt", "md"];

/// Turns raw text and files into tagged chunks ready for embedding.
#[derive(Debug, Clone)]
pub struct ChunkProcessor {
    splitter: TextSplitter,
    loader: FileLoader,
}

impl Default for ChunkProcessor {
    fn default() -> Self {
        Self::new(SplitterConfig::default())
    }
}

impl ChunkProcessor {
    #[must_use]
    pub fn new(config: SplitterConfig) -> Self {
        Self {
            splitter: TextSplitter::new(config),
            loader: FileLoader::default(),
        }
    }

    /// Reject files above `bytes` instead of the default 50 MiB.
    #[must_use]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.loader.max_file_size = bytes;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SplitterConfig {
        self.splitter.config()
    }

    /// Split `text` and tag every span with `chunk_id`, `total_chunks` and `source`.
    ///
    /// Caller metadata is copied into each chunk. Without a caller `source`
    /// each chunk is labelled `Custom Text {n}` with its 1-based position.
    #[must_use]
    pub fn process_text(&self, text: &str, metadata: Option<&Metadata>) -> Vec<ChunkPayload> {
        let spans = self.splitter.split(text);
        let total = spans.len();

        spans
            .into_iter()
            .enumerate()
            .map(|(i, content)| {
                let mut meta = metadata.cloned().unwrap_or_default();
                if !meta.contains_key("source") {
                    meta.insert("source".into(), Value::from(format!("Custom Text {}", i + 1)));
                }
                meta.insert("chunk_id".into(), Value::from(i));
                meta.insert("total_chunks".into(), Value::from(total));
                ChunkPayload { content, metadata: meta }
            })
            .collect()
    }

    /// Load a single `pdf`, `txt` or `md` file and chunk its text.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` for other extensions, `NotFound` when the
    /// path does not exist, and loader errors for unreadable content.
    pub async fn process_file(&self, path: &Path) -> Result<Vec<ChunkPayload>, DocumentError> {
        let Some(format) = SourceFormat::from_path(path) else {
            let ext = extension_of(path);
            return Err(DocumentError::UnsupportedFormat(if ext.is_empty() {
                path.display().to_string()
            } else {
                ext
            }));
        };
        if !tokio::fs::try_exists(path).await? {
            return Err(DocumentError::NotFound(path.to_path_buf()));
        }

        let document = self.loader.load(path, format).await?;
        let spans = self.splitter.split(&document.content);

        let source_file = path.display().to_string();
        let source = file_name(path);

        let total = spans.len();
        Ok(spans
            .into_iter()
            .enumerate()
            .map(|(i, content)| {
                let mut meta = Metadata::new();
                meta.insert("source_file".into(), Value::from(source_file.clone()));
                meta.insert("source".into(), Value::from(source.clone()));
                meta.insert("content_type".into(), Value::from(document.content_type));
                meta.insert("chunk_id".into(), Value::from(i));
                meta.insert("total_chunks".into(), Value::from(total));
                ChunkPayload { content, metadata: meta }
            })
            .collect())
    }

    /// Chunk every supported file directly inside `dir`.
    ///
    /// Subdirectories are not descended into. Symlinks are followed. Entries
    /// that cannot be stat'ed or loaded are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when `dir` does not exist, or an IO error if it
    /// cannot be listed.
    pub async fn process_directory(&self, dir: &Path) -> Result<Vec<ChunkPayload>, DocumentError> {
        if !tokio::fs::try_exists(dir).await? {
            return Err(DocumentError::NotFound(dir.to_path_buf()));
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if SourceFormat::from_path(&path).is_none() {
                continue;
            }
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => files.push(path),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(file = %path.display(), "skipping unreadable entry: {e}");
                }
            }
        }
        files.sort();

        let mut chunks = Vec::new();
        for path in files {
            match self.process_file(&path).await {
                Ok(file_chunks) => {
                    tracing::info!(
                        file = %path.display(),
                        chunks = file_chunks.len(),
                        "processed file"
                    );
                    chunks.extend(file_chunks);
                }
                Err(e) => {
                    tracing::warn!(file = %path.display(), "failed to process file: {e:#}");
                }
            }
        }

        Ok(chunks)
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn file_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn small() -> ChunkProcessor {
        ChunkProcessor::new(SplitterConfig {
            chunk_size: 40,
            chunk_overlap: 10,
            sentence_aware: true,
        })
    }

    #[test]
    fn supported_extensions_have_formats() {
        for ext in SUPPORTED_EXTENSIONS {
            assert!(SourceFormat::from_extension(ext).is_some(), "{ext}");
        }
    }

    #[tokio::test]
    async fn process_file_respects_size_limit() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "More than eight bytes.").unwrap();

        let result = ChunkProcessor::default()
            .with_max_file_size(8)
            .process_file(&file)
            .await;
        assert!(matches!(result, Err(DocumentError::FileTooLarge { .. })));
    }

    #[test]
    fn process_text_tags_chunks() {
        let chunks = small().process_text(
            "First sentence here. Second sentence here. Third sentence here.",
            None,
        );
        assert!(chunks.len() > 1);
        let total = chunks.len();
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.metadata["chunk_id"], json!(i));
            assert_eq!(chunk.metadata["total_chunks"], json!(total));
            assert_eq!(
                chunk.metadata["source"],
                json!(format!("Custom Text {}", i + 1))
            );
        }
    }

    #[test]
    fn process_text_keeps_caller_metadata() {
        let mut meta = Metadata::new();
        meta.insert("source".into(), json!("AI Basics"));
        meta.insert("topic".into(), json!("ai"));

        let chunks = ChunkProcessor::default().process_text("Short text.", Some(&meta));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "Short text.");
        assert_eq!(chunks[0].metadata["source"], json!("AI Basics"));
        assert_eq!(chunks[0].metadata["topic"], json!("ai"));
        assert_eq!(chunks[0].metadata["chunk_id"], json!(0));
        assert_eq!(chunks[0].metadata["total_chunks"], json!(1));
    }

    #[test]
    fn process_empty_text_yields_nothing() {
        assert!(ChunkProcessor::default().process_text("", None).is_empty());
        assert!(ChunkProcessor::default().process_text("   \n", None).is_empty());
    }

    #[tokio::test]
    async fn process_file_attaches_source() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "Vector databases store embeddings.").unwrap();

        let chunks = ChunkProcessor::default().process_file(&file).await.unwrap();
        assert_eq!(chunks.len(), 1);
        let meta = &chunks[0].metadata;
        assert_eq!(meta["source"], json!("notes.txt"));
        assert_eq!(meta["source_file"], json!(file.display().to_string()));
        assert_eq!(meta["content_type"], json!("text/plain"));
        assert_eq!(meta["chunk_id"], json!(0));
        assert_eq!(meta["total_chunks"], json!(1));
    }

    #[tokio::test]
    async fn process_file_extension_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("README.MD");
        std::fs::write(&file, "# Heading").unwrap();

        let chunks = ChunkProcessor::default().process_file(&file).await.unwrap();
        assert_eq!(chunks[0].metadata["content_type"], json!("text/markdown"));
    }

    #[tokio::test]
    async fn process_file_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.csv");
        std::fs::write(&file, "a,b").unwrap();

        let result = ChunkProcessor::default().process_file(&file).await;
        assert!(matches!(result, Err(DocumentError::UnsupportedFormat(ext)) if ext == "csv"));
    }

    #[tokio::test]
    async fn process_file_missing() {
        let result = ChunkProcessor::default()
            .process_file(Path::new("/nonexistent/missing.txt"))
            .await;
        assert!(matches!(result, Err(DocumentError::NotFound(_))));
    }

    #[tokio::test]
    async fn process_empty_file_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("empty.md");
        std::fs::write(&file, "").unwrap();

        let chunks = ChunkProcessor::default().process_file(&file).await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn process_directory_is_flat_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "Second file.").unwrap();
        std::fs::write(dir.path().join("a.md"), "First file.").unwrap();
        std::fs::write(dir.path().join("skip.csv"), "x,y").unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        std::fs::write(nested.join("deep.txt"), "Not included.").unwrap();

        let chunks = ChunkProcessor::default()
            .process_directory(dir.path())
            .await
            .unwrap();
        let sources: Vec<_> = chunks
            .iter()
            .map(|c| c.metadata["source"].as_str().unwrap().to_owned())
            .collect();
        assert_eq!(sources, vec!["a.md", "b.txt"]);
    }

    #[tokio::test]
    async fn process_directory_skips_failing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.txt"), "Readable.").unwrap();
        // Not a valid PDF; with the pdf feature enabled extraction fails and is skipped.
        std::fs::write(dir.path().join("broken.pdf"), "not a pdf").unwrap();

        let chunks = ChunkProcessor::default()
            .process_directory(dir.path())
            .await
            .unwrap();
        assert!(chunks.iter().any(|c| c.metadata["source"] == json!("good.txt")));
    }

    #[tokio::test]
    async fn process_directory_missing() {
        let result = ChunkProcessor::default()
            .process_directory(Path::new("/nonexistent/dir"))
            .await;
        assert!(matches!(result, Err(DocumentError::NotFound(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_directory_follows_symlinks() {
        let target_dir = tempfile::tempdir().unwrap();
        let target = target_dir.path().join("real.txt");
        std::fs::write(&target, "Linked content.").unwrap();

        let dir = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("linked.txt")).unwrap();
        std::fs::create_dir(dir.path().join("folder.txt")).unwrap();

        let chunks = ChunkProcessor::default()
            .process_directory(dir.path())
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata["source"], json!("linked.txt"));
        assert_eq!(chunks[0].content, "Linked content.");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn process_directory_skips_broken_symlink() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.txt"), "Still ingested.").unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone.txt"), dir.path().join("dangling.txt"))
            .unwrap();

        let chunks = ChunkProcessor::default()
            .process_directory(dir.path())
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata["source"], json!("good.txt"));
    }
}
