// crates/ragpoint-providers/tests/model_clients_unit.rs
// ============================================================================
// Module: Model Client Unit Tests
// Description: Wire-level tests for LLM and embedding clients and the registry.
// Purpose: Validate request shapes, response parsing, and failure mapping.
// ============================================================================

//! ## Overview
//! Each test starts a local tiny_http fixture, points one client at it, and
//! checks both what was sent and how the reply was interpreted. Endpoints are
//! treated as untrusted: malformed, oversized, and error replies must surface
//! as typed errors rather than panics.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod common;

use std::sync::Arc;

use ragpoint_core::EmbeddingError;
use ragpoint_core::EmbeddingModel;
use ragpoint_core::LlmClient;
use ragpoint_core::LlmError;
use ragpoint_core::ModelError;
use ragpoint_core::ModelFactory;
use ragpoint_core::ModelName;
use ragpoint_providers::EmbeddingBackend;
use ragpoint_providers::EmbeddingEntry;
use ragpoint_providers::EnvLookup;
use ragpoint_providers::HttpClient;
use ragpoint_providers::HttpPolicy;
use ragpoint_providers::LlmBackend;
use ragpoint_providers::LlmEntry;
use ragpoint_providers::ModelRegistry;
use ragpoint_providers::OllamaClient;
use ragpoint_providers::OllamaEmbeddings;
use ragpoint_providers::OpenAiChatClient;
use ragpoint_providers::OpenAiEmbeddings;
use serde_json::json;

use crate::common::local_policy;
use crate::common::serve_json;
use crate::common::serve_once;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

fn llm_entry(name: &str, provider: LlmBackend, base_url: &str) -> LlmEntry {
    LlmEntry {
        name: ModelName::parse(name).unwrap(),
        provider,
        model: "test-model".to_string(),
        base_url: base_url.to_string(),
        api_key_env: None,
        temperature: 0.0,
    }
}

fn embedding_entry(name: &str, provider: EmbeddingBackend, base_url: Option<&str>) -> EmbeddingEntry {
    EmbeddingEntry {
        name: ModelName::parse(name).unwrap(),
        provider,
        model: "embed-model".to_string(),
        base_url: base_url.map(str::to_string),
        api_key_env: None,
        dimensions: 32,
    }
}

fn client() -> HttpClient {
    HttpClient::new(local_policy()).unwrap()
}

fn env_with_key() -> EnvLookup {
    Arc::new(|key: &str| (key == "TEST_API_KEY").then(|| "sk-test".to_string()))
}

// ============================================================================
// SECTION: LLM Clients
// ============================================================================

#[test]
fn openai_chat_sends_prompt_and_bearer() {
    let (base, handle) = serve_json(&json!({
        "choices": [{"message": {"role": "assistant", "content": "Paris"}}]
    }));
    let llm = OpenAiChatClient::new(
        llm_entry("gpt", LlmBackend::OpenAi, &format!("{base}/v1/")),
        Some("sk-test".to_string()),
        client(),
    );

    let answer = llm.complete("Capital of France?").unwrap();
    let recorded = handle.join().unwrap();

    assert_eq!(answer, "Paris");
    assert_eq!(recorded.path, "/v1/chat/completions");
    assert_eq!(recorded.authorization.as_deref(), Some("Bearer sk-test"));
    let body = recorded.json();
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["messages"][0]["content"], "Capital of France?");
}

#[test]
fn ollama_generate_reads_response_field() {
    let (base, handle) = serve_json(&json!({"response": "pong", "done": true}));
    let llm = OllamaClient::new(llm_entry("local", LlmBackend::Ollama, &base), client());

    assert_eq!(llm.complete("ping").unwrap(), "pong");
    let recorded = handle.join().unwrap();
    assert_eq!(recorded.path, "/api/generate");
    assert!(recorded.authorization.is_none());
    assert_eq!(recorded.json()["stream"], false);
}

#[test]
fn llm_error_status_is_a_request_failure() {
    let (base, handle) = serve_once(500, "text/plain", "overloaded");
    let llm = OllamaClient::new(llm_entry("local", LlmBackend::Ollama, &base), client());

    let err = llm.complete("ping").unwrap_err();
    handle.join().unwrap();
    match err {
        LlmError::Request(message) => assert!(message.contains("500"), "{message}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn llm_missing_content_is_a_response_failure() {
    let (base, handle) = serve_json(&json!({"choices": []}));
    let llm = OpenAiChatClient::new(llm_entry("gpt", LlmBackend::OpenAi, &base), None, client());

    let err = llm.complete("hi").unwrap_err();
    handle.join().unwrap();
    assert!(matches!(err, LlmError::Response(_)));
}

#[test]
fn oversized_reply_is_rejected() {
    let (base, handle) = serve_once(200, "application/json", "x".repeat(4096));
    let http = HttpClient::new(HttpPolicy {
        max_response_bytes: 1024,
        ..local_policy()
    })
    .unwrap();
    let llm = OllamaClient::new(llm_entry("local", LlmBackend::Ollama, &base), http);

    let err = llm.complete("ping").unwrap_err();
    handle.join().unwrap();
    assert!(matches!(err, LlmError::Response(_)));
}

// ============================================================================
// SECTION: Embedding Clients
// ============================================================================

#[test]
fn openai_embeddings_follow_reply_indices() {
    let (base, handle) = serve_json(&json!({
        "data": [
            {"index": 1, "embedding": [0.0, 2.0]},
            {"index": 0, "embedding": [3.0, 4.0]}
        ]
    }));
    let model = OpenAiEmbeddings::new(
        embedding_entry("ada", EmbeddingBackend::OpenAi, None),
        base,
        None,
        client(),
    );

    let vectors =
        model.embed_documents(&["first".to_string(), "second".to_string()]).unwrap();
    let recorded = handle.join().unwrap();

    assert_eq!(recorded.path, "/embeddings");
    assert_eq!(recorded.json()["input"], json!(["first", "second"]));
    assert_eq!(vectors, vec![vec![0.6, 0.8], vec![0.0, 1.0]]);
}

#[test]
fn ollama_embeddings_reject_count_mismatch() {
    let (base, handle) = serve_json(&json!({"embeddings": [[1.0, 0.0]]}));
    let model = OllamaEmbeddings::new(
        embedding_entry("nomic", EmbeddingBackend::Ollama, None),
        base,
        client(),
    );

    let err = model.embed_documents(&["a".to_string(), "b".to_string()]).unwrap_err();
    let recorded = handle.join().unwrap();
    assert_eq!(recorded.path, "/api/embed");
    assert!(matches!(err, EmbeddingError::Response(_)));
}

#[test]
fn non_numeric_embedding_is_rejected() {
    let (base, handle) = serve_json(&json!({"embeddings": [["a", "b"]]}));
    let model = OllamaEmbeddings::new(
        embedding_entry("nomic", EmbeddingBackend::Ollama, None),
        base,
        client(),
    );

    let err = model.embed_query("a").unwrap_err();
    handle.join().unwrap();
    assert!(matches!(err, EmbeddingError::Response(_)));
}

// ============================================================================
// SECTION: Registry
// ============================================================================

#[test]
fn registry_resolves_and_caches_by_name() {
    let registry = ModelRegistry::with_env_lookup(
        vec![llm_entry("local", LlmBackend::Ollama, "http://127.0.0.1:1")],
        vec![embedding_entry("hash", EmbeddingBackend::Hashing, None)],
        local_policy(),
        env_with_key(),
    )
    .unwrap();
    let name = ModelName::parse("hash").unwrap();

    let first = registry.embedding(&name).unwrap();
    let second = registry.embedding(&name).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.name(), "hash");
    assert_eq!(first.embed_query("hello world").unwrap().len(), 32);
    assert_eq!(registry.llm_names(), vec!["local".to_string()]);
    assert_eq!(registry.embedding_names(), vec!["hash".to_string()]);
}

#[test]
fn registry_reports_unknown_names() {
    let registry = ModelRegistry::with_env_lookup(Vec::new(), Vec::new(), local_policy(), env_with_key())
        .unwrap();
    let err = registry.llm(&ModelName::parse("missing").unwrap()).err().unwrap();
    assert!(matches!(err, ModelError::Unknown(name) if name == "missing"));
}

#[test]
fn registry_requires_configured_api_key() {
    let mut with_key = llm_entry("gpt", LlmBackend::OpenAi, "https://api.example.com/v1");
    with_key.api_key_env = Some("TEST_API_KEY".to_string());
    let mut without_key = llm_entry("gpt-other", LlmBackend::OpenAi, "https://api.example.com/v1");
    without_key.api_key_env = Some("UNSET_API_KEY".to_string());
    let registry = ModelRegistry::with_env_lookup(
        vec![with_key, without_key],
        Vec::new(),
        HttpPolicy::default(),
        env_with_key(),
    )
    .unwrap();

    assert!(registry.llm(&ModelName::parse("gpt").unwrap()).is_ok());
    let err = registry.llm(&ModelName::parse("gpt-other").unwrap()).err().unwrap();
    assert!(matches!(err, ModelError::Init(message) if message.contains("UNSET_API_KEY")));
}

#[test]
fn registry_rejects_duplicates_and_missing_base_url() {
    let duplicate = ModelRegistry::with_env_lookup(
        vec![
            llm_entry("same", LlmBackend::Ollama, "http://a"),
            llm_entry("same", LlmBackend::Ollama, "http://b"),
        ],
        Vec::new(),
        local_policy(),
        env_with_key(),
    );
    assert!(matches!(duplicate, Err(ModelError::Init(_))));

    let registry = ModelRegistry::with_env_lookup(
        Vec::new(),
        vec![embedding_entry("remote", EmbeddingBackend::Ollama, None)],
        local_policy(),
        env_with_key(),
    )
    .unwrap();
    let err = registry.embedding(&ModelName::parse("remote").unwrap()).err().unwrap();
    assert!(matches!(err, ModelError::Init(_)));
}
