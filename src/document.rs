//! Documents, chunks and loaders.
//!
//! A [`Document`] is one unit of source text (a whole text file, or one page
//! of a PDF). Loaders are bound to a path when constructed and produce the
//! corpus on [`DocumentLoader::load`].

use crate::BoxFuture;
use crate::error::{Result, VectorboardError};
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Where a document or chunk came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct DocumentMetadata {
    /// Source path or caller-chosen name.
    pub source: String,
    /// 1-indexed page number, for paged sources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<usize>,
}

/// A single document of the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Text content.
    pub content: String,
    pub metadata: DocumentMetadata,
}

impl Document {
    /// Create a document from raw text content.
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: DocumentMetadata {
                source: source.into(),
                page: None,
            },
        }
    }

    /// Attach a page number.
    pub fn with_page(mut self, page: usize) -> Self {
        self.metadata.page = Some(page);
        self
    }

    /// Number of characters in the document.
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// A passage cut from a document by the splitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Chunk {
    /// Chunk text content.
    pub content: String,
    /// Metadata of the originating document.
    pub metadata: DocumentMetadata,
    /// Position of the chunk within its document.
    pub chunk_index: usize,
}

/// Something that can produce the document corpus.
pub trait DocumentLoader: Send + Sync {
    fn load(&self) -> BoxFuture<'_, Result<Vec<Document>>>;
}

/// Loads a single text or markdown file as one document.
pub struct TextLoader {
    path: PathBuf,
}

impl TextLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentLoader for TextLoader {
    fn load(&self) -> BoxFuture<'_, Result<Vec<Document>>> {
        Box::pin(async move {
            let content = tokio::fs::read_to_string(&self.path)
                .await
                .map_err(|e| VectorboardError::io(&self.path, e))?;
            Ok(vec![Document::new(self.path.display().to_string(), content)])
        })
    }
}

/// Loads a PDF file, one document per page.
#[cfg(feature = "pdf")]
pub struct PdfLoader {
    path: PathBuf,
}

#[cfg(feature = "pdf")]
impl PdfLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[cfg(feature = "pdf")]
impl DocumentLoader for PdfLoader {
    fn load(&self) -> BoxFuture<'_, Result<Vec<Document>>> {
        Box::pin(async move {
            let path = self.path.clone();
            let pages = tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_by_pages(&path)
                    .map_err(|e| VectorboardError::Document(e.to_string()))
            })
            .await
            .map_err(|e| VectorboardError::Document(e.to_string()))??;

            let source = self.path.display().to_string();
            Ok(pages
                .into_iter()
                .enumerate()
                .map(|(i, text)| Document::new(source.clone(), text).with_page(i + 1))
                .collect())
        })
    }
}

/// Loads every supported file under a directory, in path order.
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn supported(path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("txt" | "md" | "markdown") => true,
            #[cfg(feature = "pdf")]
            Some("pdf") => true,
            _ => false,
        }
    }

    /// Files the loader would read.
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.root.is_dir() {
            return Err(VectorboardError::Document(format!(
                "'{}' is not a directory",
                self.root.display()
            )));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| VectorboardError::Document(e.to_string()))?;
            if entry.file_type().is_file() && Self::supported(entry.path()) {
                files.push(entry.into_path());
            }
        }
        Ok(files)
    }
}

impl DocumentLoader for DirectoryLoader {
    fn load(&self) -> BoxFuture<'_, Result<Vec<Document>>> {
        Box::pin(async move {
            let mut documents = Vec::new();
            for path in self.files()? {
                let loader = loader_for_path(&path);
                documents.extend(loader.load().await?);
            }
            tracing::debug!(root = %self.root.display(), count = documents.len(), "loaded directory");
            Ok(documents)
        })
    }
}

/// Pick a loader for a file or directory path.
pub fn loader_for_path(path: &Path) -> Box<dyn DocumentLoader> {
    if path.is_dir() {
        return Box::new(DirectoryLoader::new(path));
    }
    if let Some(loader) = pdf_loader(path) {
        return loader;
    }
    Box::new(TextLoader::new(path))
}

#[cfg(feature = "pdf")]
fn pdf_loader(path: &Path) -> Option<Box<dyn DocumentLoader>> {
    path.extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.eq_ignore_ascii_case("pdf"))
        .map(|_| Box::new(PdfLoader::new(path)) as Box<dyn DocumentLoader>)
}

#[cfg(not(feature = "pdf"))]
fn pdf_loader(_path: &Path) -> Option<Box<dyn DocumentLoader>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_document_new() {
        let doc = Document::new("notes", "Some content.");
        assert_eq!(doc.metadata.source, "notes");
        assert!(doc.metadata.page.is_none());
        assert_eq!(doc.char_count(), 13);
        assert_eq!(doc.with_page(3).metadata.page, Some(3));
    }

    #[tokio::test]
    async fn test_text_loader() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello world").unwrap();

        let docs = TextLoader::new(&path).load().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "hello world");
        assert!(docs[0].metadata.source.ends_with("a.txt"));
    }

    #[tokio::test]
    async fn test_text_loader_missing_file() {
        let result = TextLoader::new("/nonexistent/file.txt").load().await;
        assert!(matches!(result, Err(VectorboardError::Io { .. })));
    }

    #[tokio::test]
    async fn test_directory_loader_skips_unsupported() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.md"), "# B").unwrap();
        std::fs::write(dir.path().join("a.txt"), "A").unwrap();
        std::fs::write(dir.path().join("data.csv"), "x,y").unwrap();

        let docs = DirectoryLoader::new(dir.path()).load().await.unwrap();
        let contents: Vec<_> = docs.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["A", "# B"]);
    }

    #[test]
    fn test_directory_loader_rejects_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "A").unwrap();
        assert!(DirectoryLoader::new(&path).files().is_err());
    }
}
