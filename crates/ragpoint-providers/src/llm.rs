// crates/ragpoint-providers/src/llm.rs
// ============================================================================
// Module: LLM Clients
// Description: OpenAI-compatible and Ollama completion clients.
// Purpose: Turn prompts into completions over bounded HTTP.
// Dependencies: ragpoint-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Two wire protocols cover the hosted and self-hosted cases: the
//! OpenAI-compatible `chat/completions` endpoint (also served by vLLM,
//! LocalAI, and most gateways) and Ollama's `api/generate`. Each configured
//! [`LlmEntry`] names one model on one backend.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ragpoint_core::LlmClient;
use ragpoint_core::LlmError;
use ragpoint_core::ModelName;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::http::HttpClient;
use crate::http::HttpError;
use crate::http::endpoint;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Wire protocol of an LLM backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmBackend {
    /// OpenAI-compatible `chat/completions`.
    #[serde(rename = "openai")]
    OpenAi,
    /// Ollama `api/generate`.
    Ollama,
}

/// One configured LLM.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LlmEntry {
    /// Name projects refer to.
    pub name: ModelName,
    /// Wire protocol.
    pub provider: LlmBackend,
    /// Backend model identifier.
    pub model: String,
    /// Backend base URL, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    /// Environment variable holding the bearer key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Sampling temperature.
    #[serde(default)]
    pub temperature: f32,
}

// ============================================================================
// SECTION: OpenAI-Compatible Client
// ============================================================================

/// Client for OpenAI-compatible chat completion endpoints.
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    /// Configured entry.
    entry: LlmEntry,
    /// Resolved bearer key.
    api_key: Option<String>,
    /// Bounded HTTP client.
    http: HttpClient,
}

impl OpenAiChatClient {
    /// Creates a client for `entry`.
    #[must_use]
    pub const fn new(entry: LlmEntry, api_key: Option<String>, http: HttpClient) -> Self {
        Self {
            entry,
            api_key,
            http,
        }
    }
}

impl LlmClient for OpenAiChatClient {
    fn name(&self) -> &str {
        self.entry.name.as_str()
    }

    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.entry.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": self.entry.temperature,
        });
        let response = self
            .http
            .post_json(&endpoint(&self.entry.base_url, "chat/completions"), &body, self.api_key.as_deref())
            .map_err(llm_error)?;
        response
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::Response("missing choices[0].message.content".to_string()))
    }
}

// ============================================================================
// SECTION: Ollama Client
// ============================================================================

/// Client for Ollama's generate endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    /// Configured entry.
    entry: LlmEntry,
    /// Bounded HTTP client.
    http: HttpClient,
}

impl OllamaClient {
    /// Creates a client for `entry`.
    #[must_use]
    pub const fn new(entry: LlmEntry, http: HttpClient) -> Self {
        Self {
            entry,
            http,
        }
    }
}

impl LlmClient for OllamaClient {
    fn name(&self) -> &str {
        self.entry.name.as_str()
    }

    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = json!({
            "model": self.entry.model,
            "prompt": prompt,
            "stream": false,
            "options": {"temperature": self.entry.temperature},
        });
        let response = self
            .http
            .post_json(&endpoint(&self.entry.base_url, "api/generate"), &body, None)
            .map_err(llm_error)?;
        response
            .get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| LlmError::Response("missing response field".to_string()))
    }
}

/// Maps transport failures onto LLM errors.
fn llm_error(err: HttpError) -> LlmError {
    match err {
        HttpError::Body(_) | HttpError::TooLarge => LlmError::Response(err.to_string()),
        other => LlmError::Request(other.to_string()),
    }
}
