// crates/ragpoint-providers/src/lib.rs
// ============================================================================
// Module: Ragpoint Providers
// Description: Model clients, document loaders, and the model registry.
// Purpose: Connect the brain to LLMs, embedders, files, and web pages.
// Dependencies: ragpoint-core, regex, reqwest, serde, tracing
// ============================================================================

//! ## Overview
//! This crate implements the outward-facing collaborators of the brain:
//! OpenAI-compatible and Ollama completion clients, remote and offline
//! embedding models, loaders for uploaded files and URLs, and a
//! [`ModelRegistry`] that resolves configured model names into cached clients.
//! All network access goes through [`HttpClient`], which enforces scheme,
//! timeout, redirect, and response size limits.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod embeddings;
pub mod http;
pub mod llm;
pub mod loaders;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use embeddings::EmbeddingBackend;
pub use embeddings::EmbeddingEntry;
pub use embeddings::HashingEmbeddings;
pub use embeddings::OllamaEmbeddings;
pub use embeddings::OpenAiEmbeddings;
pub use http::FetchedPage;
pub use http::HttpClient;
pub use http::HttpError;
pub use http::HttpPolicy;
pub use llm::LlmBackend;
pub use llm::LlmEntry;
pub use llm::OllamaClient;
pub use llm::OpenAiChatClient;
pub use loaders::DocumentLoaders;
pub use loaders::FileKind;
pub use loaders::LoaderError;
pub use loaders::SUPPORTED_EXTENSIONS;
pub use registry::EnvLookup;
pub use registry::ModelRegistry;
