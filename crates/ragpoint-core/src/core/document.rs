// crates/ragpoint-core/src/core/document.rs
// ============================================================================
// Module: Ragpoint Documents
// Description: Documents, chunks, metadata, and source classification.
// Purpose: Shared data shapes flowing from loaders into vector stores.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Document`] is loader output: text plus free-form JSON metadata. The
//! splitter turns documents into chunks; once embedded, a chunk becomes an
//! [`EmbeddedChunk`] that vector stores persist. Every document should carry a
//! `source` metadata entry (file path or URL) which drives source listing and
//! deletion.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::ChunkId;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Metadata key holding a document's origin.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding extracted keywords.
pub const KEYWORDS_KEY: &str = "keywords";
/// Metadata key dropped before indexing.
const LANGUAGES_KEY: &str = "languages";

// ============================================================================
// SECTION: Documents
// ============================================================================

/// Free-form document metadata.
pub type Metadata = BTreeMap<String, Value>;

/// Loader output: text content with metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document text.
    pub content: String,
    /// Document metadata.
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Creates a document tagged with its source.
    #[must_use]
    pub fn with_source(content: impl Into<String>, source: impl Into<String>) -> Self {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.to_string(), Value::String(source.into()));
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Returns the `source` metadata string, when present.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        metadata_source(&self.metadata)
    }
}

/// Returns the `source` entry of a metadata map.
#[must_use]
pub fn metadata_source(metadata: &Metadata) -> Option<&str> {
    metadata.get(SOURCE_KEY).and_then(Value::as_str)
}

/// Removes metadata entries that must not be indexed.
///
/// Drops the `languages` key and every key whose value is `null`.
pub fn sanitize_metadata(metadata: &mut Metadata) {
    metadata.retain(|key, value| key != LANGUAGES_KEY && !value.is_null());
}

// ============================================================================
// SECTION: Chunks
// ============================================================================

/// Text chunk paired with its embedding, ready for storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedChunk {
    /// Chunk text.
    pub content: String,
    /// Chunk metadata.
    pub metadata: Metadata,
    /// L2-normalised embedding vector.
    pub embedding: Vec<f32>,
}

/// Hex characters kept from the digest when deriving chunk identifiers.
const CHUNK_ID_HEX_LEN: usize = 32;

/// Hash input for chunk identifiers.
#[derive(Serialize)]
struct ChunkIdInput<'a> {
    /// Chunk text.
    content: &'a str,
    /// Chunk metadata.
    metadata: &'a Metadata,
    /// Store insertion sequence.
    seq: u64,
}

/// Derives a chunk identifier from content, metadata, and insertion sequence.
///
/// The sequence keeps identical chunks ingested twice distinct.
///
/// # Errors
///
/// Returns [`HashError`] when the metadata cannot be canonicalized.
pub fn derive_chunk_id(chunk: &EmbeddedChunk, seq: u64) -> Result<ChunkId, HashError> {
    let digest = hash_canonical_json(&ChunkIdInput {
        content: &chunk.content,
        metadata: &chunk.metadata,
        seq,
    })?;
    Ok(ChunkId::new(&digest[.. CHUNK_ID_HEX_LEN]))
}

/// Chunk returned by a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    /// Chunk identifier.
    pub id: ChunkId,
    /// Chunk text.
    pub content: String,
    /// Chunk metadata.
    pub metadata: Metadata,
    /// Relevance score in `[0, 1]`, higher is more relevant.
    pub score: f32,
}

/// Chunks belonging to a single source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceDocuments {
    /// Chunk identifiers.
    pub ids: Vec<ChunkId>,
    /// Chunk metadata, parallel to `ids`.
    pub metadatas: Vec<Metadata>,
    /// Chunk text, parallel to `ids`.
    pub documents: Vec<String>,
}

/// Vector store occupancy counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreInfo {
    /// Number of stored chunk texts.
    pub documents: usize,
    /// Number of stored metadata entries.
    pub metadatas: usize,
}

// ============================================================================
// SECTION: Source Classification
// ============================================================================

/// Classification of a document source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Source fetched over HTTP(S).
    Url,
    /// Any other source (uploaded files, inline text).
    Other,
}

impl SourceKind {
    /// Classifies a source string.
    #[must_use]
    pub fn classify(source: &str) -> Self {
        if source.starts_with("http://") || source.starts_with("https://") {
            Self::Url
        } else {
            Self::Other
        }
    }
}

/// Filter applied when listing project sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFilter {
    /// List both URL and other sources.
    #[default]
    All,
    /// List URL sources only.
    Urls,
    /// List non-URL sources only.
    Other,
}

impl SourceFilter {
    /// Returns true when sources of `kind` pass the filter.
    #[must_use]
    pub const fn admits(self, kind: SourceKind) -> bool {
        matches!(
            (self, kind),
            (Self::All, _) | (Self::Urls, SourceKind::Url) | (Self::Other, SourceKind::Other)
        )
    }
}

impl FromStr for SourceFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "all" => Ok(Self::All),
            "url" | "urls" => Ok(Self::Urls),
            "other" | "others" => Ok(Self::Other),
            other => Err(format!("unknown source filter: {other}")),
        }
    }
}

/// Distinct project sources split by kind, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceListing {
    /// URL sources.
    pub urls: Vec<String>,
    /// Non-URL sources.
    pub other: Vec<String>,
}

impl SourceListing {
    /// Records a source if the filter admits it and it is not yet listed.
    pub fn record(&mut self, source: &str, filter: SourceFilter) {
        let kind = SourceKind::classify(source);
        if !filter.admits(kind) {
            return;
        }
        let bucket = match kind {
            SourceKind::Url => &mut self.urls,
            SourceKind::Other => &mut self.other,
        };
        if !bucket.iter().any(|existing| existing == source) {
            bucket.push(source.to_string());
        }
    }

    /// Builds a listing from an iterator of sources.
    #[must_use]
    pub fn collect<'a>(sources: impl IntoIterator<Item = &'a str>, filter: SourceFilter) -> Self {
        let mut listing = Self::default();
        for source in sources {
            listing.record(source, filter);
        }
        listing
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
