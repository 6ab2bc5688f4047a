// crates/ragpoint-config/src/lib.rs
// ============================================================================
// Module: Ragpoint Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for ragpoint.toml semantics.
// Dependencies: ragpoint-core, ragpoint-providers, ragpoint-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `ragpoint-config` defines the configuration model for the Ragpoint
//! service: server limits, storage roots, catalog backend, logging, chunking,
//! retrieval defaults, outbound HTTP policy, and the model tables. Validation
//! is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
