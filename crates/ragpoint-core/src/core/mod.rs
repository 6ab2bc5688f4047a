// crates/ragpoint-core/src/core/mod.rs
// ============================================================================
// Module: Ragpoint Core Types
// Description: Canonical identifiers, documents, and catalog models.
// Purpose: Provide stable, serializable types shared by every Ragpoint crate.
// Dependencies: serde, serde_jcs, sha2
// ============================================================================

//! ## Overview
//! Core types describe projects, users, documents, and query requests. They
//! are the single source of truth for the REST surface and the stores.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod credentials;
pub mod document;
pub mod hashing;
pub mod identifiers;
pub mod layout;
pub mod project;
pub mod requests;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use credentials::CredentialError;
pub use credentials::hash_password;
pub use credentials::verify_password;
pub use credentials::verify_password_for_unknown_user;
pub use document::Document;
pub use document::EmbeddedChunk;
pub use document::Metadata;
pub use document::ScoredChunk;
pub use document::SourceDocuments;
pub use document::SourceFilter;
pub use document::SourceKind;
pub use document::SourceListing;
pub use document::StoreInfo;
pub use document::sanitize_metadata;
pub use identifiers::ChatId;
pub use identifiers::ChunkId;
pub use identifiers::IdentifierError;
pub use identifiers::ModelName;
pub use identifiers::ProjectName;
pub use identifiers::Username;
pub use layout::EmbeddingsLayout;
pub use layout::UploadsLayout;
pub use project::NewUser;
pub use project::ProjectModel;
pub use project::ProjectUpdate;
pub use project::UserRecord;
pub use project::UserUpdate;
pub use project::VectorStoreKind;
pub use requests::ChatAnswer;
pub use requests::ChatRequest;
pub use requests::ContextAnswer;
pub use requests::IngestReport;
pub use requests::QuestionAnswer;
pub use requests::QuestionRequest;
pub use requests::RetrievalDefaults;
