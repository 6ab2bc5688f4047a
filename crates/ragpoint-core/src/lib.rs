// crates/ragpoint-core/src/lib.rs
// ============================================================================
// Module: Ragpoint Core Library
// Description: Public API surface for the Ragpoint core.
// Purpose: Expose core types, interfaces, text processing, and the brain.
// Dependencies: crate::{core, interfaces, runtime, text}
// ============================================================================

//! ## Overview
//! Ragpoint core provides retrieval-augmented question answering over
//! per-project document collections. It is backend-agnostic: models, vector
//! stores, and the user catalog plug in through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;
pub mod text;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use crate::core::*;

pub use interfaces::Catalog;
pub use interfaces::CatalogError;
pub use interfaces::EmbeddingError;
pub use interfaces::EmbeddingModel;
pub use interfaces::LlmClient;
pub use interfaces::LlmError;
pub use interfaces::ModelError;
pub use interfaces::ModelFactory;
pub use interfaces::VectorStore;
pub use interfaces::VectorStoreError;
pub use interfaces::VectorStoreFactory;
pub use runtime::Brain;
pub use runtime::BrainError;
pub use runtime::BrainSettings;
pub use runtime::ChatLimits;
pub use runtime::DEFAULT_SYSTEM_PROMPT;
pub use runtime::InMemoryCatalog;
pub use runtime::InMemoryVectorStore;
pub use runtime::InMemoryVectorStores;
pub use runtime::Project;
pub use text::KeywordExtractor;
pub use text::SplitterConfig;
pub use text::SplitterError;
pub use text::TextSplitter;
