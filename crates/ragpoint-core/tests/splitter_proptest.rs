// crates/ragpoint-core/tests/splitter_proptest.rs
// ============================================================================
// Module: Splitter Property Tests
// Description: Chunk bounds for arbitrary text.
// Purpose: Ensure chunks stay within size and never come back empty.
// ============================================================================

//! Property tests for the recursive text splitter.

#![allow(clippy::unwrap_used, reason = "Test-only assertions and helpers are permitted.")]

use proptest::prelude::*;
use ragpoint_core::SplitterConfig;
use ragpoint_core::TextSplitter;

fn splitter(chunk_size: usize, chunk_overlap: usize) -> TextSplitter {
    TextSplitter::new(SplitterConfig {
        chunk_size,
        chunk_overlap,
        separators: vec!["\n\n".to_string(), "\n".to_string(), " ".to_string()],
    })
    .unwrap()
}

proptest! {
    #[test]
    fn chunks_are_bounded_trimmed_and_non_empty(
        text in "[a-z \n]{0,400}",
        chunk_size in 1usize..64,
        overlap_ratio in 0usize..100,
    ) {
        let chunk_overlap = chunk_size * overlap_ratio / 100;
        let chunks = splitter(chunk_size, chunk_overlap).split_text(&text);
        for chunk in &chunks {
            prop_assert!(!chunk.is_empty());
            prop_assert_eq!(chunk.trim(), chunk.as_str());
            prop_assert!(chunk.chars().count() <= chunk_size);
        }
    }

    #[test]
    fn every_word_survives_splitting(words in proptest::collection::vec("[a-z]{1,8}", 0..40)) {
        let text = words.join(" ");
        let chunks = splitter(16, 4).split_text(&text);
        let joined = chunks.join(" ");
        for word in &words {
            prop_assert!(joined.contains(word.as_str()));
        }
    }
}
