// crates/ragpoint-providers/src/embeddings.rs
// ============================================================================
// Module: Embedding Models
// Description: Remote and offline text embedding implementations.
// Purpose: Turn chunk texts and queries into normalised vectors.
// Dependencies: ragpoint-core, serde, serde_json
// ============================================================================

//! ## Overview
//! Remote embedders speak the OpenAI-compatible `embeddings` API or Ollama's
//! `api/embed`. [`HashingEmbeddings`] needs no network: it hashes word
//! unigrams and bigrams into a fixed number of signed buckets, which is
//! enough for keyword-level retrieval and for offline deployments.
//! Every vector returned here is L2-normalised.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ragpoint_core::EmbeddingError;
use ragpoint_core::EmbeddingModel;
use ragpoint_core::ModelName;
use ragpoint_core::runtime::similarity::l2_normalize;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::http::HttpClient;
use crate::http::HttpError;
use crate::http::endpoint;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default bucket count of the hashing embedder.
pub const DEFAULT_HASHING_DIMENSIONS: usize = 384;
/// Largest bucket count accepted for the hashing embedder.
pub const MAX_HASHING_DIMENSIONS: usize = 8192;

/// Backend of an embedding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `embeddings`.
    #[serde(rename = "openai")]
    OpenAi,
    /// Ollama `api/embed`.
    Ollama,
    /// Offline feature hashing.
    Hashing,
}

/// One configured embedding model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingEntry {
    /// Name projects refer to.
    pub name: ModelName,
    /// Backend.
    pub provider: EmbeddingBackend,
    /// Backend model identifier (unused by the hashing backend).
    #[serde(default)]
    pub model: String,
    /// Backend base URL (unused by the hashing backend).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the bearer key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Bucket count for the hashing backend.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

/// Returns the default hashing dimension.
const fn default_dimensions() -> usize {
    DEFAULT_HASHING_DIMENSIONS
}

// ============================================================================
// SECTION: OpenAI-Compatible Embeddings
// ============================================================================

/// Embeddings from an OpenAI-compatible endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    /// Configured entry.
    entry: EmbeddingEntry,
    /// Endpoint base URL.
    base_url: String,
    /// Resolved bearer key.
    api_key: Option<String>,
    /// Bounded HTTP client.
    http: HttpClient,
}

impl OpenAiEmbeddings {
    /// Creates an embedder for `entry` served at `base_url`.
    #[must_use]
    pub const fn new(
        entry: EmbeddingEntry,
        base_url: String,
        api_key: Option<String>,
        http: HttpClient,
    ) -> Self {
        Self {
            entry,
            base_url,
            api_key,
            http,
        }
    }
}

impl EmbeddingModel for OpenAiEmbeddings {
    fn name(&self) -> &str {
        self.entry.name.as_str()
    }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({"model": self.entry.model, "input": texts});
        let response = self
            .http
            .post_json(&endpoint(&self.base_url, "embeddings"), &body, self.api_key.as_deref())
            .map_err(embedding_error)?;
        let data = response
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| EmbeddingError::Response("missing data array".to_string()))?;
        let mut slots: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        for (position, item) in data.iter().enumerate() {
            let index = item
                .get("index")
                .and_then(Value::as_u64)
                .and_then(|index| usize::try_from(index).ok())
                .unwrap_or(position);
            let slot = slots.get_mut(index).ok_or_else(|| {
                EmbeddingError::Response(format!("embedding index {index} out of range"))
            })?;
            *slot = Some(parse_vector(item.get("embedding"))?);
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.ok_or_else(|| EmbeddingError::Response(format!("missing embedding {index}")))
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Ollama Embeddings
// ============================================================================

/// Embeddings from Ollama's embed endpoint.
#[derive(Debug, Clone)]
pub struct OllamaEmbeddings {
    /// Configured entry.
    entry: EmbeddingEntry,
    /// Endpoint base URL.
    base_url: String,
    /// Bounded HTTP client.
    http: HttpClient,
}

impl OllamaEmbeddings {
    /// Creates an embedder for `entry` served at `base_url`.
    #[must_use]
    pub const fn new(entry: EmbeddingEntry, base_url: String, http: HttpClient) -> Self {
        Self {
            entry,
            base_url,
            http,
        }
    }
}

impl EmbeddingModel for OllamaEmbeddings {
    fn name(&self) -> &str {
        self.entry.name.as_str()
    }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = json!({"model": self.entry.model, "input": texts});
        let response = self
            .http
            .post_json(&endpoint(&self.base_url, "api/embed"), &body, None)
            .map_err(embedding_error)?;
        let vectors = response
            .get("embeddings")
            .and_then(Value::as_array)
            .ok_or_else(|| EmbeddingError::Response("missing embeddings array".to_string()))?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::Response(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        vectors.iter().map(|vector| parse_vector(Some(vector))).collect()
    }
}

// ============================================================================
// SECTION: Hashing Embeddings
// ============================================================================

/// Offline feature-hashing embedder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashingEmbeddings {
    /// Model name.
    name: ModelName,
    /// Bucket count.
    dimensions: usize,
}

impl HashingEmbeddings {
    /// Creates a hashing embedder with `dimensions` buckets.
    ///
    /// # Errors
    ///
    /// Returns [`EmbeddingError::Request`] when `dimensions` is zero or above
    /// [`MAX_HASHING_DIMENSIONS`].
    pub fn new(name: ModelName, dimensions: usize) -> Result<Self, EmbeddingError> {
        if dimensions == 0 || dimensions > MAX_HASHING_DIMENSIONS {
            return Err(EmbeddingError::Request(format!(
                "hashing dimensions must be within 1..={MAX_HASHING_DIMENSIONS}"
            )));
        }
        Ok(Self {
            name,
            dimensions,
        })
    }

    /// Returns the bucket count.
    #[must_use]
    pub const fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embeds a single text.
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let words: Vec<String> = text
            .split(|ch: char| !ch.is_alphanumeric())
            .filter(|word| !word.is_empty())
            .map(str::to_lowercase)
            .collect();
        for word in &words {
            self.add_feature(&mut vector, word.as_bytes(), 1.0);
        }
        for pair in words.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.add_feature(&mut vector, bigram.as_bytes(), 0.5);
        }
        l2_normalize(&mut vector);
        vector
    }

    /// Adds one signed feature to its bucket.
    fn add_feature(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let dimensions = self.dimensions as u64;
        let Ok(bucket) = usize::try_from(hash % dimensions) else {
            return;
        };
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        if let Some(slot) = vector.get_mut(bucket) {
            *slot += sign * weight;
        }
    }
}

impl EmbeddingModel for HashingEmbeddings {
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// 64-bit FNV-1a hash.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Parses a JSON number array into a normalised vector.
#[allow(clippy::cast_possible_truncation, reason = "Embedding components are stored as f32.")]
fn parse_vector(value: Option<&Value>) -> Result<Vec<f32>, EmbeddingError> {
    let values = value
        .and_then(Value::as_array)
        .ok_or_else(|| EmbeddingError::Response("embedding must be an array".to_string()))?;
    let mut vector = values
        .iter()
        .map(|value| {
            value
                .as_f64()
                .map(|number| number as f32)
                .ok_or_else(|| EmbeddingError::Response("embedding must be numeric".to_string()))
        })
        .collect::<Result<Vec<f32>, _>>()?;
    if vector.is_empty() {
        return Err(EmbeddingError::Response("embedding must be non-empty".to_string()));
    }
    l2_normalize(&mut vector);
    Ok(vector)
}

/// Maps transport failures onto embedding errors.
fn embedding_error(err: HttpError) -> EmbeddingError {
    match err {
        HttpError::Body(_) | HttpError::TooLarge => EmbeddingError::Response(err.to_string()),
        other => EmbeddingError::Request(other.to_string()),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use ragpoint_core::EmbeddingModel;
    use ragpoint_core::ModelName;
    use ragpoint_core::runtime::similarity::relevance;

    use super::HashingEmbeddings;

    fn embedder() -> HashingEmbeddings {
        HashingEmbeddings::new(ModelName::parse("hashing").unwrap(), 256).unwrap()
    }

    #[test]
    fn hashing_is_deterministic_and_normalised() {
        let model = embedder();
        let first = model.embed_query("Vector search ranks chunks").unwrap();
        let second = model.embed_query("vector SEARCH ranks chunks").unwrap();
        assert_eq!(first, second);
        let norm: f32 = first.iter().map(|value| value * value).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn shared_words_score_higher_than_unrelated_text() {
        let model = embedder();
        let query = model.embed_query("rust ownership rules").unwrap();
        let related = model.embed_query("ownership rules in rust programs").unwrap();
        let unrelated = model.embed_query("baking sourdough bread at home").unwrap();
        assert!(relevance(&query, &related) > relevance(&query, &unrelated));
    }

    #[test]
    fn rejects_zero_dimensions() {
        assert!(HashingEmbeddings::new(ModelName::parse("h").unwrap(), 0).is_err());
    }
}
