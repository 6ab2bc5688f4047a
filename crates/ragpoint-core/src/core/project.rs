// crates/ragpoint-core/src/core/project.rs
// ============================================================================
// Module: Ragpoint Project and User Models
// Description: Persisted project definitions and user records.
// Purpose: Shared catalog shapes for the brain, stores, and REST surface.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A project binds an embedding model, an LLM, a vector store backend, and an
//! optional system prompt under a validated [`ProjectName`]. Users carry a
//! password hash, an admin flag, and the set of projects granted to them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ModelName;
use crate::core::identifiers::ProjectName;
use crate::core::identifiers::Username;

// ============================================================================
// SECTION: Vector Store Kind
// ============================================================================

/// Vector store backend bound to a project.
///
/// `chroma` and `faiss` are accepted as aliases of `sqlite` and `memory` so
/// existing clients keep working; responses always carry the canonical label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorStoreKind {
    /// SQLite-backed persistent store.
    #[default]
    #[serde(alias = "chroma")]
    Sqlite,
    /// In-memory store snapshotted to JSON on persist.
    #[serde(alias = "faiss")]
    Memory,
}

impl VectorStoreKind {
    /// All supported backends.
    pub const ALL: [Self; 2] = [Self::Sqlite, Self::Memory];

    /// Returns the stable label for this backend.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for VectorStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VectorStoreKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "sqlite" | "chroma" => Ok(Self::Sqlite),
            "memory" | "faiss" => Ok(Self::Memory),
            other => Err(format!("unsupported vector store: {other}")),
        }
    }
}

// ============================================================================
// SECTION: Projects
// ============================================================================

/// Persisted project definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectModel {
    /// Project name.
    pub name: ProjectName,
    /// Embedding model registry name.
    pub embeddings: ModelName,
    /// LLM registry name.
    pub llm: ModelName,
    /// Optional system prompt.
    #[serde(default)]
    pub system: Option<String>,
    /// Vector store backend.
    #[serde(default)]
    pub vectorstore: VectorStoreKind,
}

/// Partial project update.
///
/// `llm` is only applied when present. `system` always replaces the stored
/// prompt, so an absent value clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectUpdate {
    /// New LLM registry name.
    #[serde(default)]
    pub llm: Option<ModelName>,
    /// New system prompt.
    #[serde(default)]
    pub system: Option<String>,
}

// ============================================================================
// SECTION: Users
// ============================================================================

/// Stored user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Username.
    pub username: Username,
    /// Encoded password hash.
    pub password_hash: String,
    /// Administrator flag.
    pub is_admin: bool,
    /// Projects granted to the user, sorted by name.
    pub projects: Vec<ProjectName>,
}

impl UserRecord {
    /// Returns true when the user may access `project`.
    #[must_use]
    pub fn can_access(&self, project: &ProjectName) -> bool {
        self.is_admin || self.projects.contains(project)
    }
}

/// User creation input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Username.
    pub username: Username,
    /// Encoded password hash.
    pub password_hash: String,
    /// Administrator flag.
    pub is_admin: bool,
}

/// Partial user update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    /// Replacement password hash.
    pub password_hash: Option<String>,
    /// Replacement admin flag.
    pub is_admin: Option<bool>,
}

impl UserUpdate {
    /// Returns true when the update carries no changes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.password_hash.is_none() && self.is_admin.is_none()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
