// crates/ragpoint-core/src/text/splitter.rs
// ============================================================================
// Module: Ragpoint Text Splitter
// Description: Recursive separator-based text chunking with overlap.
// Purpose: Turn loaded documents into bounded chunks for embedding.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The splitter walks its separator list in order, splitting on the first
//! separator present in the text. Pieces are greedily merged into chunks no
//! longer than `chunk_size` characters; each new chunk begins with a tail of
//! the previous pieces totalling at most `chunk_overlap` characters. Pieces
//! that are still too long are split with the remaining separators and, once
//! those run out, cut into fixed-size character windows.
//!
//! Invariants:
//! - Every emitted chunk is trimmed, non-empty, and at most `chunk_size` chars.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::document::Document;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default maximum chunk length in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;
/// Default overlap between consecutive chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 30;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Splitter configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitterError {
    /// Chunk size was zero.
    #[error("chunk_size must be greater than zero")]
    ZeroChunkSize,
    /// Overlap was not smaller than the chunk size.
    #[error("chunk_overlap ({overlap}) must be smaller than chunk_size ({size})")]
    OverlapTooLarge {
        /// Configured overlap.
        overlap: usize,
        /// Configured chunk size.
        size: usize,
    },
    /// A separator was empty.
    #[error("separators must be non-empty strings")]
    EmptySeparator,
}

/// Splitter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitterConfig {
    /// Maximum chunk length in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Separators tried in order.
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: default_separators(),
        }
    }
}

impl SplitterConfig {
    /// Validates the splitter settings.
    ///
    /// # Errors
    ///
    /// Returns [`SplitterError`] when the settings are inconsistent.
    pub fn validate(&self) -> Result<(), SplitterError> {
        if self.chunk_size == 0 {
            return Err(SplitterError::ZeroChunkSize);
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(SplitterError::OverlapTooLarge {
                overlap: self.chunk_overlap,
                size: self.chunk_size,
            });
        }
        if self.separators.iter().any(String::is_empty) {
            return Err(SplitterError::EmptySeparator);
        }
        Ok(())
    }
}

/// Default chunk size.
const fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

/// Default chunk overlap.
const fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

/// Default separator list: whitespace only.
fn default_separators() -> Vec<String> {
    vec![" ".to_string()]
}

// ============================================================================
// SECTION: Splitter
// ============================================================================

/// Recursive character text splitter.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    /// Validated configuration.
    config: SplitterConfig,
}

impl TextSplitter {
    /// Builds a splitter from validated settings.
    ///
    /// # Errors
    ///
    /// Returns [`SplitterError`] when the settings are inconsistent.
    pub fn new(config: SplitterConfig) -> Result<Self, SplitterError> {
        config.validate()?;
        Ok(Self {
            config,
        })
    }

    /// Returns the splitter settings.
    #[must_use]
    pub const fn config(&self) -> &SplitterConfig {
        &self.config
    }

    /// Splits text into chunks.
    #[must_use]
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.config.separators)
    }

    /// Splits documents, copying each document's metadata into its chunks.
    #[must_use]
    pub fn split_documents(&self, documents: &[Document]) -> Vec<Document> {
        documents
            .iter()
            .flat_map(|document| {
                self.split_text(&document.content).into_iter().map(|content| Document {
                    content,
                    metadata: document.metadata.clone(),
                })
            })
            .collect()
    }

    /// Splits `text` with the first applicable separator of `separators`.
    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let position = separators.iter().position(|sep| text.contains(sep.as_str()));
        let (pieces, remaining): (Vec<&str>, &[String]) = match position {
            Some(index) => (
                text.split(separators[index].as_str()).filter(|piece| !piece.is_empty()).collect(),
                &separators[index + 1 ..],
            ),
            None => (vec![text], &[]),
        };
        let separator = position.map_or("", |index| separators[index].as_str());

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();
        for piece in pieces {
            if char_len(piece) <= self.config.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending, separator));
                pending.clear();
            }
            if remaining.is_empty() {
                chunks.extend(self.hard_split(piece));
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending, separator));
        }
        chunks
    }

    /// Greedily merges pieces into overlapping chunks.
    fn merge(&self, pieces: &[&str], separator: &str) -> Vec<String> {
        let size = self.config.chunk_size;
        let overlap = self.config.chunk_overlap;
        let sep_len = char_len(separator);
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            let joined = |window: &VecDeque<&str>| if window.is_empty() { 0 } else { sep_len };
            if total + len + joined(&window) > size {
                if !window.is_empty() {
                    push_chunk(&mut chunks, &window, separator);
                    while total > overlap || (total > 0 && total + len + joined(&window) > size) {
                        let Some(front) = window.pop_front() else {
                            break;
                        };
                        total -= char_len(front) + if window.is_empty() { 0 } else { sep_len };
                    }
                }
            }
            total += len + joined(&window);
            window.push_back(piece);
        }
        push_chunk(&mut chunks, &window, separator);
        chunks
    }

    /// Cuts an unsplittable piece into fixed-size character windows.
    fn hard_split(&self, piece: &str) -> Vec<String> {
        let chars: Vec<char> = piece.chars().collect();
        chars
            .chunks(self.config.chunk_size)
            .map(|window| window.iter().collect::<String>())
            .filter_map(|chunk| {
                let trimmed = chunk.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Joins the window and records it when non-empty after trimming.
fn push_chunk(chunks: &mut Vec<String>, window: &VecDeque<&str>, separator: &str) {
    let joined = window.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Returns the length of `value` in characters.
fn char_len(value: &str) -> usize {
    value.chars().count()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only splitter assertions.")]

    use super::SplitterConfig;
    use super::SplitterError;
    use super::TextSplitter;
    use crate::core::document::Document;

    fn splitter(size: usize, overlap: usize) -> TextSplitter {
        TextSplitter::new(SplitterConfig {
            chunk_size: size,
            chunk_overlap: overlap,
            ..SplitterConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = splitter(1024, 30).split_text("  hello world  ");
        assert_eq!(chunks, vec!["hello world"]);
    }

    #[test]
    fn chunks_overlap_by_trailing_words() {
        let chunks = splitter(10, 4).split_text("aaa bbb ccc ddd");
        assert_eq!(chunks, vec!["aaa bbb", "bbb ccc", "ccc ddd"]);
    }

    #[test]
    fn long_words_are_cut_into_windows() {
        let chunks = splitter(4, 1).split_text("abcdefghij");
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn whitespace_only_text_yields_nothing() {
        assert!(splitter(8, 2).split_text("     ").is_empty());
        assert!(splitter(8, 2).split_text("").is_empty());
    }

    #[test]
    fn documents_keep_metadata() {
        let doc = Document::with_source("one two three four five six", "a.txt");
        let chunks = splitter(9, 0).split_documents(&[doc]);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|chunk| chunk.source() == Some("a.txt")));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let err = TextSplitter::new(SplitterConfig {
            chunk_size: 10,
            chunk_overlap: 10,
            ..SplitterConfig::default()
        })
        .unwrap_err();
        assert_eq!(
            err,
            SplitterError::OverlapTooLarge {
                overlap: 10,
                size: 10
            }
        );
        assert!(
            TextSplitter::new(SplitterConfig {
                chunk_size: 0,
                chunk_overlap: 0,
                ..SplitterConfig::default()
            })
            .is_err()
        );
    }
}
