// crates/ragpoint-core/src/interfaces/mod.rs
// ============================================================================
// Module: Ragpoint Interfaces
// Description: Backend-agnostic interfaces for models, vector stores, catalogs.
// Purpose: Define the contract surfaces used by the Ragpoint brain.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Interfaces describe how the brain talks to language models, embedding
//! models, vector stores, and the user/project catalog without embedding
//! backend-specific details. All interfaces are synchronous; async callers
//! move work onto blocking threads.
//!
//! Invariants:
//! - Embedding vectors handed to a [`VectorStore`] are L2-normalised.
//! - Implementations fail closed on invalid or corrupt data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::core::document::EmbeddedChunk;
use crate::core::document::ScoredChunk;
use crate::core::document::SourceDocuments;
use crate::core::document::SourceFilter;
use crate::core::document::SourceListing;
use crate::core::document::StoreInfo;
use crate::core::identifiers::ChunkId;
use crate::core::identifiers::ModelName;
use crate::core::identifiers::ProjectName;
use crate::core::identifiers::Username;
use crate::core::project::NewUser;
use crate::core::project::ProjectModel;
use crate::core::project::UserRecord;
use crate::core::project::UserUpdate;

// ============================================================================
// SECTION: Language Models
// ============================================================================

/// Language model errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Request could not be sent or the backend rejected it.
    #[error("llm request failed: {0}")]
    Request(String),
    /// Backend response could not be interpreted.
    #[error("llm response invalid: {0}")]
    Response(String),
}

/// Text completion backend.
pub trait LlmClient: Send + Sync {
    /// Returns the registry name of the model.
    fn name(&self) -> &str;

    /// Completes a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] when the backend fails.
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

// ============================================================================
// SECTION: Embedding Models
// ============================================================================

/// Embedding model errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Request could not be sent or the backend rejected it.
    #[error("embedding request failed: {0}")]
    Request(String),
    /// Backend response could not be interpreted.
    #[error("embedding response invalid: {0}")]
    Response(String),
}

/// Text embedding backend.
pub trait EmbeddingModel: Send + Sync {
    /// Returns the registry name of the model.
    fn name(&self) -> &str;

    /// Embeds a batch of documents, one vector per input, in order.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError`] when the backend fails.
    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Embeds a search query.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError`] when the backend fails.
    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_documents(&[text.to_string()])?
            .pop()
            .ok_or_else(|| EmbeddingError::Response("empty embedding batch".to_string()))
    }
}

// ============================================================================
// SECTION: Model Factory
// ============================================================================

/// Model resolution errors.
#[derive(Debug, Error)]
pub enum ModelError {
    /// No model is registered under the name.
    #[error("unknown model: {0}")]
    Unknown(String),
    /// Model construction failed.
    #[error("model initialisation failed: {0}")]
    Init(String),
}

/// Resolves registry names into cached model clients.
pub trait ModelFactory: Send + Sync {
    /// Returns the LLM registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when the name is unknown or construction fails.
    fn llm(&self, name: &ModelName) -> Result<Arc<dyn LlmClient>, ModelError>;

    /// Returns the embedding model registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when the name is unknown or construction fails.
    fn embedding(&self, name: &ModelName) -> Result<Arc<dyn EmbeddingModel>, ModelError>;

    /// Returns the registered LLM names, sorted.
    fn llm_names(&self) -> Vec<String>;

    /// Returns the registered embedding model names, sorted.
    fn embedding_names(&self) -> Vec<String>;
}

// ============================================================================
// SECTION: Vector Stores
// ============================================================================

/// Vector store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Storage I/O error.
    #[error("vector store io error: {0}")]
    Io(String),
    /// Stored data is corrupt or inconsistent.
    #[error("vector store corruption: {0}")]
    Corrupt(String),
    /// Caller supplied invalid data.
    #[error("vector store invalid input: {0}")]
    Invalid(String),
    /// Backend error.
    #[error("vector store error: {0}")]
    Store(String),
}

/// Persistent collection of embedded chunks.
pub trait VectorStore: Send + Sync {
    /// Adds chunks and returns their identifiers, in input order.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] when a chunk is invalid or storage fails.
    fn add(&self, chunks: &[EmbeddedChunk]) -> Result<Vec<ChunkId>, VectorStoreError>;

    /// Returns up to `k` chunks with relevance `>= score_threshold`, most
    /// relevant first.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] when the query is invalid or storage fails.
    fn search(
        &self,
        query: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError>;

    /// Lists distinct sources.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] when storage fails.
    fn sources(&self, filter: SourceFilter) -> Result<SourceListing, VectorStoreError>;

    /// Returns occupancy counts.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] when storage fails.
    fn info(&self) -> Result<StoreInfo, VectorStoreError>;

    /// Returns every chunk whose source equals `source`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] when storage fails.
    fn find_source(&self, source: &str) -> Result<SourceDocuments, VectorStoreError>;

    /// Deletes every chunk whose source is one of `sources`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] when storage fails.
    fn delete_source(&self, sources: &[&str]) -> Result<Vec<ChunkId>, VectorStoreError>;

    /// Deletes a single chunk; deleting an unknown id is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] when storage fails.
    fn delete_id(&self, id: &ChunkId) -> Result<ChunkId, VectorStoreError>;

    /// Removes every chunk.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] when storage fails.
    fn reset(&self) -> Result<(), VectorStoreError>;

    /// Flushes pending state to durable storage.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] when storage fails.
    fn persist(&self) -> Result<(), VectorStoreError>;

    /// Drops all data, including on-disk files.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] when files cannot be removed.
    fn destroy(&self) -> Result<(), VectorStoreError>;
}

/// Opens the vector store bound to a project.
pub trait VectorStoreFactory: Send + Sync {
    /// Opens (or creates) the store for `project` rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] when the store cannot be opened.
    fn open(&self, project: &ProjectModel, dir: &Path)
    -> Result<Arc<dyn VectorStore>, VectorStoreError>;

    /// Returns the supported backend labels.
    fn kinds(&self) -> Vec<String>;
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Catalog errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Record already exists.
    #[error("already exists: {0}")]
    Conflict(String),
    /// Stored or supplied data is invalid.
    #[error("invalid catalog data: {0}")]
    Invalid(String),
    /// Backend error.
    #[error("catalog error: {0}")]
    Store(String),
}

/// Persistent registry of users, projects, and grants.
pub trait Catalog: Send + Sync {
    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Conflict`] when the username is taken.
    fn create_user(&self, user: NewUser) -> Result<UserRecord, CatalogError>;

    /// Loads a user with its grants.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when storage fails.
    fn get_user(&self, username: &Username) -> Result<Option<UserRecord>, CatalogError>;

    /// Lists users sorted by username.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when storage fails.
    fn list_users(&self) -> Result<Vec<UserRecord>, CatalogError>;

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when the user does not exist.
    fn update_user(&self, username: &Username, update: UserUpdate)
    -> Result<UserRecord, CatalogError>;

    /// Deletes a user and its grants.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when the user does not exist.
    fn delete_user(&self, username: &Username) -> Result<(), CatalogError>;

    /// Creates a project.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Conflict`] when the name is taken.
    fn create_project(&self, project: &ProjectModel) -> Result<(), CatalogError>;

    /// Loads a project.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when storage fails.
    fn get_project(&self, name: &ProjectName) -> Result<Option<ProjectModel>, CatalogError>;

    /// Lists projects sorted by name.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError`] when storage fails.
    fn list_projects(&self) -> Result<Vec<ProjectModel>, CatalogError>;

    /// Replaces a stored project definition.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when the project does not exist.
    fn update_project(&self, project: &ProjectModel) -> Result<(), CatalogError>;

    /// Deletes a project and its grants.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when the project does not exist.
    fn delete_project(&self, name: &ProjectName) -> Result<(), CatalogError>;

    /// Grants a user access to a project; granting twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] when either side does not exist.
    fn grant_project(&self, username: &Username, project: &ProjectName)
    -> Result<(), CatalogError>;
}
