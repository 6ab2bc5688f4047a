// crates/ragpoint-core/src/runtime/brain.rs
// ============================================================================
// Module: Ragpoint Brain
// Description: Project lifecycle, ingestion, retrieval, and answering.
// Purpose: Single entry point shared by every Ragpoint surface.
// Dependencies: crate::{core, interfaces, text}, tracing
// ============================================================================

//! ## Overview
//! The [`Brain`] owns the project cache and wires projects to their models
//! and vector stores. Projects are loaded lazily from the [`Catalog`] and
//! kept open for the lifetime of the process. Question answering retrieves
//! the most relevant chunks above a score threshold and asks the project's
//! LLM to answer from them; chat keeps per-session history in memory.
//!
//! Invariants:
//! - A project is opened at most once; the cache holds the only handle.
//! - Stored embeddings are L2-normalised before they reach a store.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::RwLock;

use thiserror::Error;
use tracing::info;
use tracing::warn;

use crate::core::document::Document;
use crate::core::document::EmbeddedChunk;
use crate::core::document::ScoredChunk;
use crate::core::document::SourceDocuments;
use crate::core::document::SourceFilter;
use crate::core::document::SourceListing;
use crate::core::document::StoreInfo;
use crate::core::document::sanitize_metadata;
use crate::core::identifiers::ChatId;
use crate::core::identifiers::ChunkId;
use crate::core::identifiers::ModelName;
use crate::core::identifiers::ProjectName;
use crate::core::identifiers::Username;
use crate::core::layout::EmbeddingsLayout;
use crate::core::layout::UploadsLayout;
use crate::core::project::ProjectModel;
use crate::core::project::ProjectUpdate;
use crate::core::requests::ChatAnswer;
use crate::core::requests::ChatRequest;
use crate::core::requests::ContextAnswer;
use crate::core::requests::IngestReport;
use crate::core::requests::QuestionAnswer;
use crate::core::requests::QuestionRequest;
use crate::core::requests::RetrievalDefaults;
use crate::interfaces::Catalog;
use crate::interfaces::CatalogError;
use crate::interfaces::EmbeddingModel;
use crate::interfaces::LlmClient;
use crate::interfaces::ModelError;
use crate::interfaces::ModelFactory;
use crate::interfaces::VectorStore;
use crate::interfaces::VectorStoreError;
use crate::interfaces::VectorStoreFactory;
use crate::runtime::prompts::ChatTurn;
use crate::runtime::prompts::DEFAULT_SYSTEM_PROMPT;
use crate::runtime::prompts::condense_prompt;
use crate::runtime::prompts::context_prompt;
use crate::runtime::prompts::stuff_context;
use crate::runtime::prompts::stuff_prompt;
use crate::runtime::sessions::ChatLimits;
use crate::runtime::sessions::ChatSessions;
use crate::runtime::similarity::l2_normalize;
use crate::text::keywords::KeywordExtractor;
use crate::text::keywords::extract_keywords_for_metadata;
use crate::text::splitter::TextSplitter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Number of chunk texts embedded per backend call.
pub const EMBEDDING_BATCH_SIZE: usize = 64;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Brain operation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum BrainError {
    /// Caller supplied invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Referenced record does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Record already exists.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Language model failure.
    #[error("llm failure: {0}")]
    Llm(String),
    /// Embedding model failure.
    #[error("embedding failure: {0}")]
    Embedding(String),
    /// Vector store failure.
    #[error("vector store failure: {0}")]
    Store(String),
    /// Catalog failure.
    #[error("catalog failure: {0}")]
    Catalog(String),
    /// Filesystem failure.
    #[error("io failure: {0}")]
    Io(String),
}

impl From<CatalogError> for BrainError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(msg) => Self::NotFound(msg),
            CatalogError::Conflict(msg) => Self::Conflict(msg),
            CatalogError::Invalid(msg) => Self::InvalidInput(msg),
            CatalogError::Store(msg) => Self::Catalog(msg),
        }
    }
}

impl From<VectorStoreError> for BrainError {
    fn from(err: VectorStoreError) -> Self {
        match err {
            VectorStoreError::Invalid(msg) => Self::InvalidInput(msg),
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<ModelError> for BrainError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Unknown(name) => Self::InvalidInput(format!("unknown model: {name}")),
            ModelError::Init(msg) => Self::Llm(msg),
        }
    }
}

impl From<io::Error> for BrainError {
    fn from(err: io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Brain settings.
#[derive(Debug, Clone)]
pub struct BrainSettings {
    /// Root directory of per-project embeddings directories.
    pub embeddings_root: PathBuf,
    /// Root directory of per-project uploads.
    pub uploads_root: PathBuf,
    /// Retrieval defaults.
    pub retrieval: RetrievalDefaults,
    /// Keyword extraction settings.
    pub keywords: KeywordExtractor,
    /// Chat memory bounds per project.
    pub chat: ChatLimits,
}

impl Default for BrainSettings {
    fn default() -> Self {
        Self {
            embeddings_root: PathBuf::from("./embeddings/"),
            uploads_root: PathBuf::from("./uploads/"),
            retrieval: RetrievalDefaults::default(),
            keywords: KeywordExtractor::default(),
            chat: ChatLimits::default(),
        }
    }
}

// ============================================================================
// SECTION: Project Handle
// ============================================================================

/// Open project: definition, vector store, and chat sessions.
pub struct Project {
    /// Current project definition.
    model: RwLock<ProjectModel>,
    /// Embeddings directory.
    dir: PathBuf,
    /// Open vector store; swapped on reset.
    store: RwLock<Arc<dyn VectorStore>>,
    /// Chat histories by session.
    chats: Mutex<ChatSessions>,
}

impl Project {
    /// Returns a snapshot of the project definition.
    #[must_use]
    pub fn model(&self) -> ProjectModel {
        self.model.read().map_or_else(|poisoned| poisoned.into_inner().clone(), |guard| guard.clone())
    }

    /// Returns the project name.
    #[must_use]
    pub fn name(&self) -> ProjectName {
        self.model().name
    }

    /// Returns the embeddings directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the open vector store.
    #[must_use]
    pub fn store(&self) -> Arc<dyn VectorStore> {
        self.store.read().map_or_else(|poisoned| Arc::clone(&poisoned.into_inner()), |guard| Arc::clone(&guard))
    }

    /// Replaces the project definition.
    fn set_model(&self, model: ProjectModel) {
        match self.model.write() {
            Ok(mut guard) => *guard = model,
            Err(poisoned) => *poisoned.into_inner() = model,
        }
    }

    /// Replaces the vector store handle.
    fn set_store(&self, store: Arc<dyn VectorStore>) {
        match self.store.write() {
            Ok(mut guard) => *guard = store,
            Err(poisoned) => *poisoned.into_inner() = store,
        }
    }

    /// Locks the chat sessions.
    fn chats(&self) -> Result<MutexGuard<'_, ChatSessions>, BrainError> {
        self.chats.lock().map_err(|_| BrainError::Store("chat session mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Brain
// ============================================================================

/// Retrieval-augmented generation engine.
pub struct Brain {
    /// Brain settings.
    settings: BrainSettings,
    /// Chunking strategy.
    splitter: TextSplitter,
    /// Model registry.
    models: Arc<dyn ModelFactory>,
    /// Vector store opener.
    stores: Arc<dyn VectorStoreFactory>,
    /// User/project catalog.
    catalog: Arc<dyn Catalog>,
    /// Open projects.
    projects: Mutex<BTreeMap<ProjectName, Arc<Project>>>,
}

impl Brain {
    /// Creates a brain over the supplied backends.
    #[must_use]
    pub fn new(
        settings: BrainSettings,
        splitter: TextSplitter,
        models: Arc<dyn ModelFactory>,
        stores: Arc<dyn VectorStoreFactory>,
        catalog: Arc<dyn Catalog>,
    ) -> Self {
        Self {
            settings,
            splitter,
            models,
            stores,
            catalog,
            projects: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the brain settings.
    #[must_use]
    pub const fn settings(&self) -> &BrainSettings {
        &self.settings
    }

    /// Returns the model registry.
    #[must_use]
    pub fn models(&self) -> &dyn ModelFactory {
        self.models.as_ref()
    }

    /// Returns the vector store opener.
    #[must_use]
    pub fn stores(&self) -> &dyn VectorStoreFactory {
        self.stores.as_ref()
    }

    /// Returns the catalog.
    #[must_use]
    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    /// Returns a shared handle to the catalog.
    #[must_use]
    pub fn shared_catalog(&self) -> Arc<dyn Catalog> {
        Arc::clone(&self.catalog)
    }

    /// Locks the project cache.
    fn cache(&self) -> Result<MutexGuard<'_, BTreeMap<ProjectName, Arc<Project>>>, BrainError> {
        self.projects.lock().map_err(|_| BrainError::Store("project cache mutex poisoned".to_string()))
    }

    // ------------------------------------------------------------------------
    // Project lifecycle
    // ------------------------------------------------------------------------

    /// Finds a project in the cache or the catalog, opening it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError`] when the catalog or vector store fails.
    pub fn find_project(&self, name: &ProjectName) -> Result<Option<Arc<Project>>, BrainError> {
        if let Some(project) = self.cache()?.get(name) {
            return Ok(Some(Arc::clone(project)));
        }
        let Some(model) = self.catalog.get_project(name)? else {
            return Ok(None);
        };
        let opened = Arc::new(self.open_project(model)?);
        // A concurrent lookup may have opened the project first; keep its handle.
        let project = Arc::clone(self.cache()?.entry(name.clone()).or_insert(opened));
        Ok(Some(project))
    }

    /// Finds a project or fails with [`BrainError::NotFound`].
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::NotFound`] when the project does not exist.
    pub fn require_project(&self, name: &ProjectName) -> Result<Arc<Project>, BrainError> {
        self.find_project(name)?.ok_or_else(|| BrainError::NotFound(format!("project {name}")))
    }

    /// Creates a project and grants `owner` access to it.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::InvalidInput`] for unknown models,
    /// [`BrainError::Conflict`] when the name is taken, and other variants
    /// when storage fails.
    pub fn create_project(
        &self,
        model: ProjectModel,
        owner: Option<&Username>,
    ) -> Result<Arc<Project>, BrainError> {
        self.models.embedding(&model.embeddings)?;
        self.models.llm(&model.llm)?;
        if !self.stores.kinds().iter().any(|kind| kind == model.vectorstore.as_str()) {
            return Err(BrainError::InvalidInput(format!(
                "unsupported vector store: {}",
                model.vectorstore
            )));
        }

        let mut cache = self.cache()?;
        if cache.contains_key(&model.name) || self.catalog.get_project(&model.name)?.is_some() {
            return Err(BrainError::Conflict(format!("project {}", model.name)));
        }
        self.catalog.create_project(&model)?;
        if let Some(owner) = owner
            && let Err(err) = self.catalog.grant_project(owner, &model.name)
        {
            self.rollback_project(&model.name);
            return Err(err.into());
        }
        let project = match self.open_project(model.clone()) {
            Ok(project) => Arc::new(project),
            Err(err) => {
                self.rollback_project(&model.name);
                return Err(err);
            }
        };
        cache.insert(model.name.clone(), Arc::clone(&project));
        drop(cache);
        info!(
            project = %model.name,
            embeddings = %model.embeddings,
            llm = %model.llm,
            vectorstore = %model.vectorstore,
            "project created"
        );
        Ok(project)
    }

    /// Applies a partial update to a project. Returns `None` when the project
    /// does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::InvalidInput`] for unknown models and other
    /// variants when storage fails.
    pub fn edit_project(
        &self,
        name: &ProjectName,
        update: ProjectUpdate,
    ) -> Result<Option<ProjectModel>, BrainError> {
        let Some(project) = self.find_project(name)? else {
            return Ok(None);
        };
        let mut model = project.model();
        let mut changed = false;
        if let Some(llm) = update.llm
            && llm != model.llm
        {
            self.models.llm(&llm)?;
            model.llm = llm;
            changed = true;
        }
        if update.system != model.system {
            model.system = update.system;
            changed = true;
        }
        if changed {
            self.catalog.update_project(&model)?;
            project.set_model(model.clone());
            info!(project = %name, "project updated");
        }
        Ok(Some(model))
    }

    /// Deletes a project, its vector store files, and its uploads.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::NotFound`] when the project does not exist.
    pub fn delete_project(&self, name: &ProjectName) -> Result<(), BrainError> {
        let project = self.require_project(name)?;
        self.catalog.delete_project(name)?;
        self.cache()?.remove(name);
        project.chats()?.clear();
        project.store().destroy()?;
        EmbeddingsLayout::remove(&self.settings.embeddings_root, name)?;
        let uploads = UploadsLayout::project_dir(&self.settings.uploads_root, name);
        match fs::remove_dir_all(&uploads) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }
        info!(project = %name, "project deleted");
        Ok(())
    }

    /// Removes a half-created project and its grants from the catalog.
    fn rollback_project(&self, name: &ProjectName) {
        if let Err(err) = self.catalog.delete_project(name) {
            warn!(project = %name, error = %err, "project rollback failed");
        }
    }

    /// Opens the vector store of a project definition.
    fn open_project(&self, model: ProjectModel) -> Result<Project, BrainError> {
        let dir = EmbeddingsLayout::create(&self.settings.embeddings_root, &model.name)?;
        let store = self.stores.open(&model, &dir)?;
        Ok(Project {
            model: RwLock::new(model),
            dir,
            store: RwLock::new(store),
            chats: Mutex::new(ChatSessions::new(self.settings.chat)),
        })
    }

    // ------------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------------

    /// Enriches, splits, embeds, and stores documents.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Embedding`] when embedding fails and
    /// [`BrainError::Store`] when the store rejects the chunks.
    pub fn ingest_documents(
        &self,
        project: &Project,
        mut documents: Vec<Document>,
    ) -> Result<IngestReport, BrainError> {
        let model = project.model();
        extract_keywords_for_metadata(&mut documents, &self.settings.keywords);
        let mut chunks = self.splitter.split_documents(&documents);
        for chunk in &mut chunks {
            sanitize_metadata(&mut chunk.metadata);
        }

        let embedder = self.models.embedding(&model.embeddings)?;
        let embedded = embed_chunks(embedder.as_ref(), chunks)?;
        let store = project.store();
        let ids = store.add(&embedded)?;
        store.persist()?;

        let source = match documents.as_slice() {
            [single] => single.source().map(str::to_string),
            _ => None,
        };
        info!(
            project = %model.name,
            documents = documents.len(),
            chunks = ids.len(),
            "documents ingested"
        );
        Ok(IngestReport {
            source,
            documents: documents.len(),
            chunks: ids.len(),
            ids,
        })
    }

    // ------------------------------------------------------------------------
    // Question answering
    // ------------------------------------------------------------------------

    /// Answers a question from the most relevant chunks.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError`] when retrieval or the LLM fails.
    pub fn question(
        &self,
        project: &Project,
        request: QuestionRequest,
    ) -> Result<QuestionAnswer, BrainError> {
        check_text("question", &request.question)?;
        let model = project.model();
        let llm = self.models.llm(request.llm.as_ref().unwrap_or(&model.llm))?;
        let (score, k) = self.settings.retrieval.resolve(request.score, request.k);
        let sources = self.retrieve(project, &model.embeddings, &request.question, score, k)?;
        let prompt = stuff_prompt(&stuff_context(&sources), &request.question);
        let answer = complete(llm.as_ref(), &prompt)?;
        Ok(QuestionAnswer {
            question: request.question,
            answer,
            sources,
        })
    }

    /// Answers a question confined to retrieved context under a system prompt.
    ///
    /// Retrieval failures count as no documents. The answer is produced from
    /// the first retrieved document (or an empty context).
    ///
    /// # Errors
    ///
    /// Returns [`BrainError`] when the LLM fails.
    pub fn question_context(
        &self,
        project: &Project,
        request: QuestionRequest,
    ) -> Result<ContextAnswer, BrainError> {
        check_text("question", &request.question)?;
        let model = project.model();
        let llm = self.models.llm(request.llm.as_ref().unwrap_or(&model.llm))?;
        let system = request
            .system
            .as_deref()
            .filter(|system| !system.is_empty())
            .or_else(|| model.system.as_deref().filter(|system| !system.is_empty()))
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let (score, k) = self.settings.retrieval.resolve(request.score, request.k);
        let documents =
            match self.retrieve(project, &model.embeddings, &request.question, score, k) {
                Ok(documents) => documents,
                Err(err) => {
                    warn!(project = %model.name, error = %err, "context retrieval failed");
                    Vec::new()
                }
            };
        let context = documents.first().map_or("", |doc| doc.content.as_str());
        let answer = complete(llm.as_ref(), &context_prompt(system, context, &request.question))?;
        Ok(ContextAnswer {
            question: request.question,
            answer,
            documents: documents.len(),
        })
    }

    /// Runs one chat turn, condensing history into a standalone question.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError`] when retrieval or the LLM fails.
    pub fn chat(&self, project: &Project, request: ChatRequest) -> Result<ChatAnswer, BrainError> {
        check_text("message", &request.message)?;
        let model = project.model();
        let llm = self.models.llm(&model.llm)?;
        let id = request.id.unwrap_or_else(ChatId::generate);
        let history = project.chats()?.history(&id);

        let question = if history.is_empty() {
            request.message.clone()
        } else {
            complete(llm.as_ref(), &condense_prompt(&history, &request.message))?
        };
        let (score, k) = self.settings.retrieval.resolve(request.score, request.k);
        let documents = self.retrieve(project, &model.embeddings, &question, score, k)?;
        let answer = complete(llm.as_ref(), &stuff_prompt(&stuff_context(&documents), &question))?;

        project.chats()?.record(&id, ChatTurn {
            message: request.message.clone(),
            answer: answer.clone(),
        });
        Ok(ChatAnswer {
            id,
            message: request.message,
            answer,
        })
    }

    /// Embeds a query and searches the project store.
    fn retrieve(
        &self,
        project: &Project,
        embeddings: &ModelName,
        query: &str,
        score: f32,
        k: usize,
    ) -> Result<Vec<ScoredChunk>, BrainError> {
        let embedder = self.models.embedding(embeddings)?;
        let mut vector =
            embedder.embed_query(query).map_err(|err| BrainError::Embedding(err.to_string()))?;
        l2_normalize(&mut vector);
        Ok(project.store().search(&vector, k, score)?)
    }

    // ------------------------------------------------------------------------
    // Store maintenance
    // ------------------------------------------------------------------------

    /// Lists the distinct sources of a project.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Store`] when the store fails.
    pub fn list_sources(
        &self,
        project: &Project,
        filter: SourceFilter,
    ) -> Result<SourceListing, BrainError> {
        Ok(project.store().sources(filter)?)
    }

    /// Returns the project's store occupancy.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Store`] when the store fails.
    pub fn store_info(&self, project: &Project) -> Result<StoreInfo, BrainError> {
        Ok(project.store().info()?)
    }

    /// Returns every chunk stored for a source.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Store`] when the store fails.
    pub fn find_source(
        &self,
        project: &Project,
        source: &str,
    ) -> Result<SourceDocuments, BrainError> {
        Ok(project.store().find_source(source)?)
    }

    /// Deletes the chunks of a source, matching both the bare source and its
    /// uploads path.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Store`] when the store fails.
    pub fn delete_source(&self, project: &Project, source: &str) -> Result<Vec<ChunkId>, BrainError> {
        let name = project.name();
        let upload = UploadsLayout::project_dir(&self.settings.uploads_root, &name).join(source);
        let upload = upload.to_string_lossy();
        let store = project.store();
        let ids = store.delete_source(&[source, &*upload])?;
        store.persist()?;
        info!(project = %name, source, deleted = ids.len(), "source deleted");
        Ok(ids)
    }

    /// Deletes a single chunk.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Store`] when the store fails.
    pub fn delete_id(&self, project: &Project, id: &ChunkId) -> Result<ChunkId, BrainError> {
        let store = project.store();
        let id = store.delete_id(id)?;
        store.persist()?;
        Ok(id)
    }

    /// Clears the project store and reopens it.
    ///
    /// # Errors
    ///
    /// Returns [`BrainError::Store`] when the store cannot be cleared or reopened.
    pub fn reset(&self, project: &Project) -> Result<(), BrainError> {
        let store = project.store();
        store.reset()?;
        store.persist()?;
        let reopened = self.stores.open(&project.model(), project.dir())?;
        project.set_store(reopened);
        info!(project = %project.name(), "vector store reset");
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects empty or whitespace-only request text.
fn check_text(field: &str, value: &str) -> Result<(), BrainError> {
    if value.trim().is_empty() {
        return Err(BrainError::InvalidInput(format!("{field} must be non-empty")));
    }
    Ok(())
}

/// Runs a completion and trims the answer.
fn complete(llm: &dyn LlmClient, prompt: &str) -> Result<String, BrainError> {
    llm.complete(prompt)
        .map(|answer| answer.trim().to_string())
        .map_err(|err| BrainError::Llm(err.to_string()))
}

/// Embeds chunk texts in batches and pairs them with their metadata.
fn embed_chunks(
    embedder: &dyn EmbeddingModel,
    chunks: Vec<Document>,
) -> Result<Vec<EmbeddedChunk>, BrainError> {
    let mut embedded = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(EMBEDDING_BATCH_SIZE) {
        let texts: Vec<String> = batch.iter().map(|chunk| chunk.content.clone()).collect();
        let vectors = embedder
            .embed_documents(&texts)
            .map_err(|err| BrainError::Embedding(err.to_string()))?;
        if vectors.len() != batch.len() {
            return Err(BrainError::Embedding(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                vectors.len()
            )));
        }
        for (chunk, mut vector) in batch.iter().zip(vectors) {
            l2_normalize(&mut vector);
            embedded.push(EmbeddedChunk {
                content: chunk.content.clone(),
                metadata: chunk.metadata.clone(),
                embedding: vector,
            });
        }
    }
    Ok(embedded)
}
