// crates/ragpoint-core/src/runtime/mod.rs
// ============================================================================
// Module: Ragpoint Runtime
// Description: Brain engine, prompts, retrieval math, and in-memory backends.
// Purpose: Execute ingestion and question answering over the interfaces.
// Dependencies: crate::{core, interfaces, text}
// ============================================================================

//! ## Overview
//! Runtime modules implement the brain and the helpers every backend shares.
//! All surfaces (REST, CLI) call into the same [`Brain`] to keep behaviour
//! identical.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod brain;
pub mod memory;
pub mod prompts;
pub mod sessions;
pub mod similarity;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use brain::Brain;
pub use brain::BrainError;
pub use brain::BrainSettings;
pub use brain::Project;
pub use memory::InMemoryCatalog;
pub use memory::InMemoryVectorStore;
pub use memory::InMemoryVectorStores;
pub use prompts::DEFAULT_SYSTEM_PROMPT;
pub use sessions::ChatLimits;
