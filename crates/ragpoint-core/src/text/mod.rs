// crates/ragpoint-core/src/text/mod.rs
// ============================================================================
// Module: Ragpoint Text Processing
// Description: Chunking and keyword extraction.
// Purpose: Prepare loaded documents for embedding.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Text processing is pure and deterministic: the same input always yields
//! the same chunks and keywords.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod keywords;
pub mod splitter;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use keywords::Keyword;
pub use keywords::KeywordExtractor;
pub use keywords::extract_keywords_for_metadata;
pub use keywords::keywords_metadata;
pub use splitter::SplitterConfig;
pub use splitter::SplitterError;
pub use splitter::TextSplitter;
