// crates/ragpoint-core/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Scripted models and brain builders for core tests.
// Purpose: Provide deterministic, offline model doubles.
// Dependencies: ragpoint-core
// ============================================================================

//! ## Overview
//! [`RecordingLlm`] records every prompt and replies from a script.
//! [`WordEmbeddings`] hashes lowercase words into a fixed number of buckets,
//! so texts sharing words are close and identical texts score 1.0.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(clippy::unwrap_used, reason = "Test fixtures unwrap fixed inputs.")]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use ragpoint_core::Brain;
use ragpoint_core::BrainSettings;
use ragpoint_core::ChatLimits;
use ragpoint_core::EmbeddingError;
use ragpoint_core::EmbeddingModel;
use ragpoint_core::InMemoryCatalog;
use ragpoint_core::InMemoryVectorStores;
use ragpoint_core::LlmClient;
use ragpoint_core::LlmError;
use ragpoint_core::ModelError;
use ragpoint_core::ModelFactory;
use ragpoint_core::ModelName;
use ragpoint_core::ProjectModel;
use ragpoint_core::ProjectName;
use ragpoint_core::SplitterConfig;
use ragpoint_core::TextSplitter;
use ragpoint_core::VectorStoreKind;

// ============================================================================
// SECTION: Model Doubles
// ============================================================================

/// LLM double that records prompts and replies from a script.
#[derive(Default)]
pub struct RecordingLlm {
    /// Prompts received, in order.
    pub prompts: Mutex<Vec<String>>,
    /// Scripted replies; falls back to a fixed answer when exhausted.
    pub replies: Mutex<VecDeque<String>>,
}

impl RecordingLlm {
    /// Queues a reply.
    pub fn push_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(reply.to_string());
    }

    /// Returns the recorded prompts.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LlmClient for RecordingLlm {
    fn name(&self) -> &str {
        "echo"
    }

    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| "  scripted answer \n".to_string()))
    }
}

/// Bag-of-words embedding double.
pub struct WordEmbeddings {
    /// Number of buckets.
    pub dimensions: usize,
}

impl WordEmbeddings {
    /// Embeds one text.
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for word in text.split(|ch: char| !ch.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for byte in word.to_lowercase().bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            let bucket = usize::try_from(hash % self.dimensions as u64).unwrap();
            vector[bucket] += 1.0;
        }
        vector
    }
}

impl EmbeddingModel for WordEmbeddings {
    fn name(&self) -> &str {
        "words"
    }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|text| self.embed(text)).collect())
    }
}

/// Embedding double that always fails.
pub struct BrokenEmbeddings;

impl EmbeddingModel for BrokenEmbeddings {
    fn name(&self) -> &str {
        "broken"
    }

    fn embed_documents(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::Request("backend offline".to_string()))
    }
}

/// Model factory exposing `echo`/`other` LLMs and `words`/`broken` embeddings.
pub struct TestModels {
    /// Shared LLM double.
    pub llm: Arc<RecordingLlm>,
    /// Secondary LLM double.
    pub other: Arc<RecordingLlm>,
}

impl TestModels {
    /// Creates a factory with fresh doubles.
    pub fn new() -> Self {
        Self {
            llm: Arc::new(RecordingLlm::default()),
            other: Arc::new(RecordingLlm::default()),
        }
    }
}

impl ModelFactory for TestModels {
    fn llm(&self, name: &ModelName) -> Result<Arc<dyn LlmClient>, ModelError> {
        match name.as_str() {
            "echo" => Ok(self.llm.clone()),
            "other" => Ok(self.other.clone()),
            other => Err(ModelError::Unknown(other.to_string())),
        }
    }

    fn embedding(&self, name: &ModelName) -> Result<Arc<dyn EmbeddingModel>, ModelError> {
        match name.as_str() {
            "words" => Ok(Arc::new(WordEmbeddings {
                dimensions: 64,
            })),
            "broken" => Ok(Arc::new(BrokenEmbeddings)),
            other => Err(ModelError::Unknown(other.to_string())),
        }
    }

    fn llm_names(&self) -> Vec<String> {
        vec!["echo".to_string(), "other".to_string()]
    }

    fn embedding_names(&self) -> Vec<String> {
        vec!["broken".to_string(), "words".to_string()]
    }
}

// ============================================================================
// SECTION: Builders
// ============================================================================

/// Builds a brain over in-memory backends rooted at `root`.
pub fn brain_at(root: &Path, models: Arc<TestModels>, catalog: Arc<InMemoryCatalog>) -> Brain {
    brain_with_chat(root, models, catalog, ChatLimits::default())
}

/// Builds a brain like [`brain_at`] with custom chat memory bounds.
pub fn brain_with_chat(
    root: &Path,
    models: Arc<TestModels>,
    catalog: Arc<InMemoryCatalog>,
    chat: ChatLimits,
) -> Brain {
    let settings = BrainSettings {
        embeddings_root: root.join("embeddings"),
        uploads_root: root.join("uploads"),
        chat,
        ..BrainSettings::default()
    };
    let splitter = TextSplitter::new(SplitterConfig::default()).unwrap();
    Brain::new(settings, splitter, models, Arc::new(InMemoryVectorStores), catalog)
}

/// Returns a memory-backed project definition.
pub fn project(name: &str) -> ProjectModel {
    ProjectModel {
        name: ProjectName::parse(name).unwrap(),
        embeddings: ModelName::parse("words").unwrap(),
        llm: ModelName::parse("echo").unwrap(),
        system: None,
        vectorstore: VectorStoreKind::Memory,
    }
}
