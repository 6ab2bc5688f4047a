// crates/ragpoint-server/src/lib.rs
// ============================================================================
// Module: Ragpoint Server
// Description: REST API for the Ragpoint retrieval-augmented generation engine.
// Purpose: Expose project, user, ingestion, and question operations over HTTP.
// Dependencies: ragpoint-core, ragpoint-config, ragpoint-providers, axum, tokio
// ============================================================================

//! ## Overview
//! Ragpoint server exposes the [`ragpoint_core::Brain`] through an axum REST
//! API guarded by HTTP Basic authentication. All routes are thin wrappers
//! over brain and catalog operations; auth decisions are audited.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod error;
mod routes;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use auth::AuthAuditEvent;
pub use auth::AuthAuditSink;
pub use auth::AuthContext;
pub use auth::CatalogAuthz;
pub use auth::NoopAuditSink;
pub use auth::RequestAuthz;
pub use auth::RequestContext;
pub use auth::StderrAuditSink;
pub use error::ApiError;
pub use server::RagpointServer;
pub use server::ServerError;
pub use server::bootstrap_admin;
pub use server::build_catalog;
