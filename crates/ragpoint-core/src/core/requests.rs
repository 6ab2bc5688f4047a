// crates/ragpoint-core/src/core/requests.rs
// ============================================================================
// Module: Ragpoint Requests
// Description: Question, chat, and ingestion request/response shapes.
// Purpose: Typed inputs and outputs of the brain's query operations.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Request types mirror the REST JSON bodies. Optional retrieval parameters
//! fall back to [`RetrievalDefaults`] when absent.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::document::ScoredChunk;
use crate::core::identifiers::ChatId;
use crate::core::identifiers::ChunkId;
use crate::core::identifiers::ModelName;

// ============================================================================
// SECTION: Retrieval Defaults
// ============================================================================

/// Default minimum relevance score.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.6;
/// Default number of retrieved chunks.
pub const DEFAULT_TOP_K: usize = 4;

/// Retrieval parameters applied when a request omits them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalDefaults {
    /// Minimum relevance score.
    pub score_threshold: f32,
    /// Number of chunks to retrieve.
    pub k: usize,
    /// Upper bound for caller-supplied `k`.
    pub max_k: usize,
}

impl Default for RetrievalDefaults {
    fn default() -> Self {
        Self {
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            k: DEFAULT_TOP_K,
            max_k: 64,
        }
    }
}

impl RetrievalDefaults {
    /// Resolves effective `(score_threshold, k)` for a request.
    ///
    /// Zero values count as absent.
    #[must_use]
    pub fn resolve(&self, score: Option<f32>, k: Option<usize>) -> (f32, usize) {
        let score = score.filter(|value| *value > 0.0).unwrap_or(self.score_threshold);
        let k = k.filter(|value| *value > 0).unwrap_or(self.k).min(self.max_k);
        (score.clamp(0.0, 1.0), k)
    }
}

// ============================================================================
// SECTION: Questions
// ============================================================================

/// One-shot question request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionRequest {
    /// Question text.
    pub question: String,
    /// LLM override.
    #[serde(default)]
    pub llm: Option<ModelName>,
    /// System prompt override (context questions only).
    #[serde(default)]
    pub system: Option<String>,
    /// Minimum relevance score override.
    #[serde(default)]
    pub score: Option<f32>,
    /// Retrieved chunk count override.
    #[serde(default)]
    pub k: Option<usize>,
}

/// Answer to a one-shot question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionAnswer {
    /// Original question.
    pub question: String,
    /// Trimmed LLM answer.
    pub answer: String,
    /// Chunks used as context.
    pub sources: Vec<ScoredChunk>,
}

/// Answer to a context-confined question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextAnswer {
    /// Original question.
    pub question: String,
    /// Trimmed LLM answer.
    pub answer: String,
    /// Number of retrieved documents.
    pub documents: usize,
}

// ============================================================================
// SECTION: Chat
// ============================================================================

/// Chat turn request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// User message.
    pub message: String,
    /// Existing chat session; a new one is created when absent or unknown.
    #[serde(default)]
    pub id: Option<ChatId>,
    /// Minimum relevance score override.
    #[serde(default)]
    pub score: Option<f32>,
    /// Retrieved chunk count override.
    #[serde(default)]
    pub k: Option<usize>,
}

/// Chat turn response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatAnswer {
    /// Chat session identifier.
    pub id: ChatId,
    /// User message.
    pub message: String,
    /// Trimmed LLM answer.
    pub answer: String,
}

// ============================================================================
// SECTION: Ingestion
// ============================================================================

/// Outcome of ingesting documents into a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Ingested source, when a single source was ingested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Number of loaded documents.
    pub documents: usize,
    /// Number of stored chunks.
    pub chunks: usize,
    /// Identifiers of the stored chunks.
    pub ids: Vec<ChunkId>,
}

// ============================================================================
// SECTION: Tests
// ============================================================================
