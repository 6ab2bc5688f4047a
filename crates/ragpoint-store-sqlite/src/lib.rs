// crates/ragpoint-store-sqlite/src/lib.rs
// ============================================================================
// Module: Ragpoint SQLite Store
// Description: Durable catalog and vector store backends using SQLite.
// Purpose: Provide the default persistence for Ragpoint deployments.
// Dependencies: ragpoint-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`Catalog`](ragpoint_core::Catalog)
//! for users, projects, and grants, plus a per-project
//! [`VectorStore`](ragpoint_core::VectorStore) holding embedded chunks.
//! Database contents are treated as untrusted: schema versions, identifiers,
//! and embedding blobs are validated on read and fail closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod catalog;
pub mod database;
pub mod vectors;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use catalog::SqliteCatalog;
pub use database::SqliteStoreConfig;
pub use database::SqliteStoreError;
pub use database::SqliteStoreMode;
pub use database::SqliteSyncMode;
pub use database::SqliteTuning;
pub use vectors::ProjectVectorStores;
pub use vectors::SqliteVectorStore;
pub use vectors::VECTORS_FILE_NAME;
