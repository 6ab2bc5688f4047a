// crates/ragpoint-core/src/core/identifiers.rs
// ============================================================================
// Module: Ragpoint Identifiers
// Description: Canonical identifiers for projects, users, chats, and chunks.
// Purpose: Provide strongly typed, serializable IDs with validated string forms.
// Dependencies: serde, thiserror, uuid
// ============================================================================

//! ## Overview
//! Identifiers serialize as plain strings. Project and user names are
//! validated at construction because they are embedded into filesystem paths
//! and database keys; chat and chunk identifiers are opaque.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum length of a project name.
pub const MAX_PROJECT_NAME_LENGTH: usize = 64;
/// Maximum length of a username.
pub const MAX_USERNAME_LENGTH: usize = 64;
/// Maximum length of a model registry name.
pub const MAX_MODEL_NAME_LENGTH: usize = 128;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Identifier was empty.
    #[error("{0} must be non-empty")]
    Empty(&'static str),
    /// Identifier exceeded its maximum length.
    #[error("{kind} exceeds {max} characters")]
    TooLong {
        /// Identifier kind label.
        kind: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
    /// Identifier contained a disallowed character.
    #[error("{kind} contains invalid character {ch:?}")]
    InvalidChar {
        /// Identifier kind label.
        kind: &'static str,
        /// Offending character.
        ch: char,
    },
    /// Identifier must start with an alphanumeric character.
    #[error("{0} must start with an ascii letter or digit")]
    InvalidStart(&'static str),
}

// ============================================================================
// SECTION: Project Name
// ============================================================================

/// Project name used as catalog key and filesystem path segment.
///
/// # Invariants
/// - 1 to [`MAX_PROJECT_NAME_LENGTH`] characters.
/// - ASCII alphanumeric, `-` and `_` only; starts with an alphanumeric.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ProjectName(String);

impl ProjectName {
    /// Parses and validates a project name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the name violates the invariants.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        validate_charset(value, "project name", MAX_PROJECT_NAME_LENGTH, |ch| {
            ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'
        })?;
        Ok(Self(value.to_string()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for ProjectName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Username
// ============================================================================

/// Username used for HTTP Basic authentication.
///
/// # Invariants
/// - 1 to [`MAX_USERNAME_LENGTH`] characters.
/// - ASCII alphanumeric plus `-`, `_`, `.`, `@`; starts with an alphanumeric.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Parses and validates a username.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the username violates the invariants.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        validate_charset(value, "username", MAX_USERNAME_LENGTH, |ch| {
            ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '@')
        })?;
        Ok(Self(value.to_string()))
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Model Name
// ============================================================================

/// Registry key for an LLM or embedding model.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ModelName(String);

impl ModelName {
    /// Parses a model registry name.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the name is empty, too long, or
    /// contains whitespace/control characters.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        validate_charset(value, "model name", MAX_MODEL_NAME_LENGTH, |ch| {
            ch.is_ascii_graphic()
        })?;
        Ok(Self(value.to_string()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'de> Deserialize<'de> for ModelName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Opaque Identifiers
// ============================================================================

/// Chat session identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(String);

impl ChatId {
    /// Creates a chat identifier from an existing value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random chat identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Vector store chunk identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    /// Creates a chunk identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ChunkId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Validates length and character set of an identifier.
fn validate_charset(
    value: &str,
    kind: &'static str,
    max: usize,
    allowed: impl Fn(char) -> bool,
) -> Result<(), IdentifierError> {
    if value.is_empty() {
        return Err(IdentifierError::Empty(kind));
    }
    if value.chars().count() > max {
        return Err(IdentifierError::TooLong {
            kind,
            max,
        });
    }
    if let Some(ch) = value.chars().find(|ch| !allowed(*ch)) {
        return Err(IdentifierError::InvalidChar {
            kind,
            ch,
        });
    }
    if !value.starts_with(|ch: char| ch.is_ascii_alphanumeric()) {
        return Err(IdentifierError::InvalidStart(kind));
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only identifier assertions."
    )]

    use super::IdentifierError;
    use super::ModelName;
    use super::ProjectName;
    use super::Username;

    #[test]
    fn project_name_rejects_path_traversal() {
        assert!(ProjectName::parse("../etc").is_err());
        assert!(ProjectName::parse("a/b").is_err());
        assert!(ProjectName::parse("_hidden").is_err());
        assert_eq!(ProjectName::parse("").unwrap_err(), IdentifierError::Empty("project name"));
    }

    #[test]
    fn project_name_accepts_common_forms() {
        let name = ProjectName::parse("docs_v2-final").unwrap();
        assert_eq!(name.as_str(), "docs_v2-final");
        assert!(ProjectName::parse(&"a".repeat(64)).is_ok());
        assert!(ProjectName::parse(&"a".repeat(65)).is_err());
    }

    #[test]
    fn username_allows_email_like_values() {
        assert!(Username::parse("ana.lee@example.org").is_ok());
        assert!(Username::parse("ana lee").is_err());
    }

    #[test]
    fn model_name_rejects_whitespace() {
        assert!(ModelName::parse("gpt-4o-mini").is_ok());
        assert!(ModelName::parse("llama3:8b").is_ok());
        assert!(ModelName::parse("bad name").is_err());
    }

    #[test]
    fn project_name_deserialization_validates() {
        let parsed: Result<ProjectName, _> = serde_json::from_str("\"ok_name\"");
        assert!(parsed.is_ok());
        let rejected: Result<ProjectName, _> = serde_json::from_str("\"../x\"");
        assert!(rejected.is_err());
    }
}
