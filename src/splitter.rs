//! Recursive character text splitting.
//!
//! Text is split on the first separator (from a priority list) that occurs
//! in it; pieces that are still too long are split again with the remaining
//! separators, and short pieces are merged back together up to the chunk
//! size. Lengths are measured in characters.

use crate::document::{Chunk, Document};
use crate::error::{Result, VectorboardError};

/// Default separator priority: paragraphs, lines, words, characters.
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Configuration for text chunking.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 0,
        }
    }
}

impl ChunkConfig {
    /// Chunk size with no overlap, as used by every experiment.
    pub fn without_overlap(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap: 0,
        }
    }
}

/// Splits documents into passages.
#[derive(Debug, Clone)]
pub struct RecursiveTextSplitter {
    config: ChunkConfig,
    separators: Vec<String>,
}

impl RecursiveTextSplitter {
    /// Create a splitter with the default separators.
    pub fn new(config: ChunkConfig) -> Result<Self> {
        if config.chunk_size == 0 {
            return Err(VectorboardError::InvalidGrid(
                "chunk_size must be greater than zero".to_string(),
            ));
        }
        if config.chunk_overlap > config.chunk_size {
            return Err(VectorboardError::InvalidGrid(format!(
                "chunk overlap ({}) is larger than chunk size ({})",
                config.chunk_overlap, config.chunk_size
            )));
        }
        Ok(Self {
            config,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replace the separator priority list.
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    /// Split every document, carrying its metadata onto each chunk.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.content)
                    .into_iter()
                    .enumerate()
                    .map(|(chunk_index, content)| Chunk {
                        content,
                        metadata: doc.metadata.clone(),
                        chunk_index,
                    })
            })
            .collect()
    }

    /// Split raw text into chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // First separator present in the text wins; "" always matches.
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                separator = "";
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let splits = split_keeping_separator(text, separator);

        let mut chunks = Vec::new();
        let mut good: Vec<String> = Vec::new();
        for piece in splits {
            if char_len(&piece) < self.config.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                chunks.extend(self.merge_splits(&good));
                good.clear();
            }
            if remaining.is_empty() {
                chunks.push(piece);
            } else {
                chunks.extend(self.split_recursive(&piece, remaining));
            }
        }
        if !good.is_empty() {
            chunks.extend(self.merge_splits(&good));
        }
        chunks
    }

    /// Greedily join pieces into chunks no longer than the chunk size.
    fn merge_splits(&self, splits: &[String]) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;

        let mut docs = Vec::new();
        let mut current: std::collections::VecDeque<&str> = std::collections::VecDeque::new();
        let mut total = 0usize;

        for piece in splits {
            let len = char_len(piece);
            if total + len > size && !current.is_empty() {
                push_joined(&mut docs, &current);
                while total > overlap || (total + len > size && total > 0) {
                    match current.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            current.push_back(piece);
            total += len;
        }
        push_joined(&mut docs, &current);
        docs
    }
}

fn push_joined(docs: &mut Vec<String>, parts: &std::collections::VecDeque<&str>) {
    let joined: String = parts.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

/// Split on `separator`, attaching it to the start of every piece after the first.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    if separator.is_empty() {
        return text.chars().map(String::from).collect();
    }
    let mut parts = text.split(separator);
    let mut out = Vec::new();
    if let Some(first) = parts.next() {
        if !first.is_empty() {
            out.push(first.to_string());
        }
    }
    for part in parts {
        out.push(format!("{separator}{part}"));
    }
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(size: usize, overlap: usize) -> RecursiveTextSplitter {
        RecursiveTextSplitter::new(ChunkConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        })
        .unwrap()
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let chunks = splitter(100, 0).split_text("A short paragraph.");
        assert_eq!(chunks, vec!["A short paragraph."]);
    }

    #[test]
    fn test_paragraphs_split_first() {
        let text = "First paragraph here.\n\nSecond paragraph here.";
        let chunks = splitter(25, 0).split_text(text);
        assert_eq!(chunks, vec!["First paragraph here.", "Second paragraph here."]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let chunks = splitter(15, 0).split_text(text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 15, "chunk too long: {chunk:?}");
        }
        assert_eq!(chunks.join(" "), text);
    }

    #[test]
    fn test_long_word_falls_back_to_characters() {
        let chunks = splitter(4, 0).split_text("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_overlap_repeats_tail() {
        let chunks = splitter(10, 4).split_text("aa bb cc dd ee");
        assert!(chunks.len() >= 2);
        // Second chunk starts with words carried over from the first.
        let first_last = chunks[0].split_whitespace().last().unwrap();
        assert!(chunks[1].starts_with(first_last));
    }

    #[test]
    fn test_empty_text() {
        assert!(splitter(10, 0).split_text("").is_empty());
        assert!(splitter(10, 0).split_text("   \n\n  ").is_empty());
    }

    #[test]
    fn test_split_documents_keeps_metadata() {
        let docs = vec![
            Document::new("a.txt", "alpha beta gamma delta"),
            Document::new("b.txt", "epsilon").with_page(2),
        ];
        let chunks = splitter(11, 0).split_documents(&docs);
        assert_eq!(chunks.last().unwrap().metadata.page, Some(2));
        assert_eq!(chunks[0].metadata.source, "a.txt");
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
    }

    #[test]
    fn test_invalid_config() {
        assert!(RecursiveTextSplitter::new(ChunkConfig::without_overlap(0)).is_err());
        assert!(
            RecursiveTextSplitter::new(ChunkConfig {
                chunk_size: 5,
                chunk_overlap: 6
            })
            .is_err()
        );
    }
}
