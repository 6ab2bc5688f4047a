// crates/ragpoint-providers/src/registry.rs
// ============================================================================
// Module: Model Registry
// Description: Registry of configured LLMs and embedding models.
// Purpose: Resolve model names into cached clients for the brain.
// Dependencies: ragpoint-core, tracing
// ============================================================================

//! ## Overview
//! The model registry holds the configured [`LlmEntry`] and
//! [`EmbeddingEntry`] tables and implements the core
//! [`ragpoint_core::ModelFactory`] interface. Clients are constructed on first
//! use and cached by name, so every project that names the same model shares
//! one client. API keys are read from the environment variable named by each
//! entry, through an injectable lookup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;

use ragpoint_core::EmbeddingModel;
use ragpoint_core::LlmClient;
use ragpoint_core::ModelError;
use ragpoint_core::ModelFactory;
use ragpoint_core::ModelName;

use crate::embeddings::EmbeddingBackend;
use crate::embeddings::EmbeddingEntry;
use crate::embeddings::HashingEmbeddings;
use crate::embeddings::OllamaEmbeddings;
use crate::embeddings::OpenAiEmbeddings;
use crate::http::HttpClient;
use crate::http::HttpPolicy;
use crate::llm::LlmBackend;
use crate::llm::LlmEntry;
use crate::llm::OllamaClient;
use crate::llm::OpenAiChatClient;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Environment lookup used to resolve API keys.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Cached clients keyed by model name.
type Cache<T> = Mutex<BTreeMap<String, Arc<T>>>;

// ============================================================================
// SECTION: Model Registry
// ============================================================================

/// Registry of configured models with lazily constructed clients.
pub struct ModelRegistry {
    /// LLM entries keyed by name.
    llms: BTreeMap<String, LlmEntry>,
    /// Embedding entries keyed by name.
    embeddings: BTreeMap<String, EmbeddingEntry>,
    /// Shared bounded HTTP client.
    http: HttpClient,
    /// API key lookup.
    env: EnvLookup,
    /// Constructed LLM clients.
    llm_cache: Cache<dyn LlmClient>,
    /// Constructed embedding models.
    embedding_cache: Cache<dyn EmbeddingModel>,
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("llms", &self.llms.keys().collect::<Vec<_>>())
            .field("embeddings", &self.embeddings.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl ModelRegistry {
    /// Creates a registry reading API keys from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Init`] when names repeat or the HTTP client
    /// cannot be built.
    pub fn new(
        llms: Vec<LlmEntry>,
        embeddings: Vec<EmbeddingEntry>,
        policy: HttpPolicy,
    ) -> Result<Self, ModelError> {
        let env: EnvLookup = Arc::new(|key: &str| std::env::var(key).ok());
        Self::with_env_lookup(llms, embeddings, policy, env)
    }

    /// Creates a registry with a custom API key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Init`] when names repeat or the HTTP client
    /// cannot be built.
    pub fn with_env_lookup(
        llms: Vec<LlmEntry>,
        embeddings: Vec<EmbeddingEntry>,
        policy: HttpPolicy,
        env: EnvLookup,
    ) -> Result<Self, ModelError> {
        let http = HttpClient::new(policy).map_err(|err| ModelError::Init(err.to_string()))?;
        let llms = index_by_name(llms, |entry| &entry.name, "llm")?;
        let embeddings = index_by_name(embeddings, |entry| &entry.name, "embedding")?;
        Ok(Self {
            llms,
            embeddings,
            http,
            env,
            llm_cache: Mutex::new(BTreeMap::new()),
            embedding_cache: Mutex::new(BTreeMap::new()),
        })
    }

    /// Returns the shared HTTP client.
    #[must_use]
    pub const fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Resolves an optional API key environment variable.
    fn api_key(&self, variable: Option<&str>) -> Result<Option<String>, ModelError> {
        let Some(variable) = variable else {
            return Ok(None);
        };
        (self.env)(variable)
            .filter(|value| !value.is_empty())
            .map(Some)
            .ok_or_else(|| ModelError::Init(format!("environment variable {variable} is not set")))
    }

    /// Builds the LLM client for an entry.
    fn build_llm(&self, entry: &LlmEntry) -> Result<Arc<dyn LlmClient>, ModelError> {
        let client: Arc<dyn LlmClient> = match entry.provider {
            LlmBackend::OpenAi => {
                let key = self.api_key(entry.api_key_env.as_deref())?;
                Arc::new(OpenAiChatClient::new(entry.clone(), key, self.http.clone()))
            }
            LlmBackend::Ollama => Arc::new(OllamaClient::new(entry.clone(), self.http.clone())),
        };
        Ok(client)
    }

    /// Builds the embedding model for an entry.
    fn build_embedding(
        &self,
        entry: &EmbeddingEntry,
    ) -> Result<Arc<dyn EmbeddingModel>, ModelError> {
        let base_url = || {
            entry.base_url.clone().ok_or_else(|| {
                ModelError::Init(format!("embedding model {} requires base_url", entry.name))
            })
        };
        let model: Arc<dyn EmbeddingModel> = match entry.provider {
            EmbeddingBackend::OpenAi => {
                let key = self.api_key(entry.api_key_env.as_deref())?;
                Arc::new(OpenAiEmbeddings::new(entry.clone(), base_url()?, key, self.http.clone()))
            }
            EmbeddingBackend::Ollama => {
                Arc::new(OllamaEmbeddings::new(entry.clone(), base_url()?, self.http.clone()))
            }
            EmbeddingBackend::Hashing => Arc::new(
                HashingEmbeddings::new(entry.name.clone(), entry.dimensions)
                    .map_err(|err| ModelError::Init(err.to_string()))?,
            ),
        };
        Ok(model)
    }
}

impl ModelFactory for ModelRegistry {
    fn llm(&self, name: &ModelName) -> Result<Arc<dyn LlmClient>, ModelError> {
        let entry =
            self.llms.get(name.as_str()).ok_or_else(|| ModelError::Unknown(name.to_string()))?;
        cached(&self.llm_cache, name, || self.build_llm(entry))
    }

    fn embedding(&self, name: &ModelName) -> Result<Arc<dyn EmbeddingModel>, ModelError> {
        let entry = self
            .embeddings
            .get(name.as_str())
            .ok_or_else(|| ModelError::Unknown(name.to_string()))?;
        cached(&self.embedding_cache, name, || self.build_embedding(entry))
    }

    fn llm_names(&self) -> Vec<String> {
        self.llms.keys().cloned().collect()
    }

    fn embedding_names(&self) -> Vec<String> {
        self.embeddings.keys().cloned().collect()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Indexes entries by name, rejecting duplicates.
fn index_by_name<T>(
    entries: Vec<T>,
    name: impl Fn(&T) -> &ModelName,
    kind: &str,
) -> Result<BTreeMap<String, T>, ModelError> {
    let mut map = BTreeMap::new();
    for entry in entries {
        let key = name(&entry).to_string();
        if map.contains_key(&key) {
            return Err(ModelError::Init(format!("duplicate {kind} model: {key}")));
        }
        map.insert(key, entry);
    }
    Ok(map)
}

/// Returns the cached client for `name`, building it on first use.
fn cached<T: ?Sized>(
    cache: &Cache<T>,
    name: &ModelName,
    build: impl FnOnce() -> Result<Arc<T>, ModelError>,
) -> Result<Arc<T>, ModelError> {
    let mut guard =
        cache.lock().map_err(|_| ModelError::Init("model cache lock poisoned".to_string()))?;
    if let Some(existing) = guard.get(name.as_str()) {
        return Ok(Arc::clone(existing));
    }
    let built = build()?;
    tracing::debug!(model = name.as_str(), "model client constructed");
    guard.insert(name.to_string(), Arc::clone(&built));
    Ok(built)
}
