// crates/ragpoint-core/src/runtime/memory.rs
// ============================================================================
// Module: Ragpoint In-Memory Backends
// Description: In-memory catalog and vector store implementations.
// Purpose: Provide dependency-free backends for tests and small deployments.
// Dependencies: crate::core, crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! [`InMemoryCatalog`] keeps users, projects, and grants in maps guarded by a
//! mutex. [`InMemoryVectorStore`] keeps chunks in insertion order and scans
//! them linearly on search. When opened with a directory it snapshots itself
//! to `index.json` on [`VectorStore::persist`] and reloads that snapshot on
//! open.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use serde::Deserialize;
use serde::Serialize;

use crate::core::document::EmbeddedChunk;
use crate::core::document::Metadata;
use crate::core::document::ScoredChunk;
use crate::core::document::SourceDocuments;
use crate::core::document::SourceFilter;
use crate::core::document::SourceListing;
use crate::core::document::StoreInfo;
use crate::core::document::derive_chunk_id;
use crate::core::document::metadata_source;
use crate::core::identifiers::ChunkId;
use crate::core::identifiers::ProjectName;
use crate::core::identifiers::Username;
use crate::core::project::NewUser;
use crate::core::project::ProjectModel;
use crate::core::project::UserRecord;
use crate::core::project::UserUpdate;
use crate::core::project::VectorStoreKind;
use crate::interfaces::Catalog;
use crate::interfaces::CatalogError;
use crate::interfaces::VectorStore;
use crate::interfaces::VectorStoreError;
use crate::interfaces::VectorStoreFactory;
use crate::runtime::similarity::check_vector;
use crate::runtime::similarity::rank;
use crate::runtime::similarity::relevance;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Snapshot file name inside a project's embeddings directory.
pub const SNAPSHOT_FILE_NAME: &str = "index.json";
/// Snapshot format version.
const SNAPSHOT_VERSION: u32 = 1;
/// Maximum snapshot size accepted on load (bytes).
const MAX_SNAPSHOT_BYTES: u64 = 512 * 1024 * 1024;

// ============================================================================
// SECTION: In-Memory Catalog
// ============================================================================

/// Stored user fields.
#[derive(Debug, Clone)]
struct UserEntry {
    /// Encoded password hash.
    password_hash: String,
    /// Administrator flag.
    is_admin: bool,
}

/// Catalog maps guarded together.
#[derive(Debug, Default)]
struct CatalogState {
    /// Users by name.
    users: BTreeMap<Username, UserEntry>,
    /// Projects by name.
    projects: BTreeMap<ProjectName, ProjectModel>,
    /// User/project grants.
    grants: BTreeSet<(Username, ProjectName)>,
}

impl CatalogState {
    /// Builds the public record of a stored user.
    fn record(&self, username: &Username, entry: &UserEntry) -> UserRecord {
        UserRecord {
            username: username.clone(),
            password_hash: entry.password_hash.clone(),
            is_admin: entry.is_admin,
            projects: self
                .grants
                .iter()
                .filter(|(user, _)| user == username)
                .map(|(_, project)| project.clone())
                .collect(),
        }
    }
}

/// In-memory catalog for tests and ephemeral deployments.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    /// Catalog state protected by a mutex.
    state: Arc<Mutex<CatalogState>>,
}

impl InMemoryCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the catalog state.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, CatalogState>, CatalogError> {
        self.state.lock().map_err(|_| CatalogError::Store("catalog mutex poisoned".to_string()))
    }
}

impl Catalog for InMemoryCatalog {
    fn create_user(&self, user: NewUser) -> Result<UserRecord, CatalogError> {
        let mut state = self.lock()?;
        if state.users.contains_key(&user.username) {
            return Err(CatalogError::Conflict(format!("user {}", user.username)));
        }
        let entry = UserEntry {
            password_hash: user.password_hash,
            is_admin: user.is_admin,
        };
        let record = state.record(&user.username, &entry);
        state.users.insert(user.username, entry);
        drop(state);
        Ok(record)
    }

    fn get_user(&self, username: &Username) -> Result<Option<UserRecord>, CatalogError> {
        let state = self.lock()?;
        Ok(state.users.get(username).map(|entry| state.record(username, entry)))
    }

    fn list_users(&self) -> Result<Vec<UserRecord>, CatalogError> {
        let state = self.lock()?;
        Ok(state.users.iter().map(|(name, entry)| state.record(name, entry)).collect())
    }

    fn update_user(
        &self,
        username: &Username,
        update: UserUpdate,
    ) -> Result<UserRecord, CatalogError> {
        let mut state = self.lock()?;
        let entry = state
            .users
            .get_mut(username)
            .ok_or_else(|| CatalogError::NotFound(format!("user {username}")))?;
        if let Some(hash) = update.password_hash {
            entry.password_hash = hash;
        }
        if let Some(is_admin) = update.is_admin {
            entry.is_admin = is_admin;
        }
        let entry = entry.clone();
        Ok(state.record(username, &entry))
    }

    fn delete_user(&self, username: &Username) -> Result<(), CatalogError> {
        let mut state = self.lock()?;
        if state.users.remove(username).is_none() {
            return Err(CatalogError::NotFound(format!("user {username}")));
        }
        state.grants.retain(|(user, _)| user != username);
        drop(state);
        Ok(())
    }

    fn create_project(&self, project: &ProjectModel) -> Result<(), CatalogError> {
        let mut state = self.lock()?;
        if state.projects.contains_key(&project.name) {
            return Err(CatalogError::Conflict(format!("project {}", project.name)));
        }
        state.projects.insert(project.name.clone(), project.clone());
        drop(state);
        Ok(())
    }

    fn get_project(&self, name: &ProjectName) -> Result<Option<ProjectModel>, CatalogError> {
        Ok(self.lock()?.projects.get(name).cloned())
    }

    fn list_projects(&self) -> Result<Vec<ProjectModel>, CatalogError> {
        Ok(self.lock()?.projects.values().cloned().collect())
    }

    fn update_project(&self, project: &ProjectModel) -> Result<(), CatalogError> {
        let mut state = self.lock()?;
        let slot = state
            .projects
            .get_mut(&project.name)
            .ok_or_else(|| CatalogError::NotFound(format!("project {}", project.name)))?;
        *slot = project.clone();
        drop(state);
        Ok(())
    }

    fn delete_project(&self, name: &ProjectName) -> Result<(), CatalogError> {
        let mut state = self.lock()?;
        if state.projects.remove(name).is_none() {
            return Err(CatalogError::NotFound(format!("project {name}")));
        }
        state.grants.retain(|(_, project)| project != name);
        drop(state);
        Ok(())
    }

    fn grant_project(&self, username: &Username, project: &ProjectName) -> Result<(), CatalogError> {
        let mut state = self.lock()?;
        if !state.users.contains_key(username) {
            return Err(CatalogError::NotFound(format!("user {username}")));
        }
        if !state.projects.contains_key(project) {
            return Err(CatalogError::NotFound(format!("project {project}")));
        }
        state.grants.insert((username.clone(), project.clone()));
        drop(state);
        Ok(())
    }
}

// ============================================================================
// SECTION: In-Memory Vector Store
// ============================================================================

/// Chunk held by the in-memory store.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChunk {
    /// Chunk identifier.
    id: ChunkId,
    /// Chunk text.
    content: String,
    /// Chunk metadata.
    metadata: Metadata,
    /// Normalised embedding.
    embedding: Vec<f32>,
}

/// Store contents, also the snapshot file format.
#[derive(Debug, Default, Serialize, Deserialize)]
struct MemoryState {
    /// Snapshot format version.
    version: u32,
    /// Next insertion sequence.
    next_seq: u64,
    /// Chunks in insertion order.
    chunks: Vec<StoredChunk>,
}

impl MemoryState {
    /// Embedding dimension fixed by the first stored chunk.
    fn dimensions(&self) -> Option<usize> {
        self.chunks.first().map(|chunk| chunk.embedding.len())
    }
}

/// In-memory vector store with optional JSON snapshots.
#[derive(Debug)]
pub struct InMemoryVectorStore {
    /// Store contents.
    state: Mutex<MemoryState>,
    /// Snapshot directory; `None` keeps the store purely in memory.
    dir: Option<PathBuf>,
}

impl Default for InMemoryVectorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryVectorStore {
    /// Creates an empty, non-persistent store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(fresh_state()),
            dir: None,
        }
    }

    /// Opens a store snapshotted under `dir`, loading an existing snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`VectorStoreError`] when the snapshot is unreadable or corrupt.
    pub fn open(dir: &Path) -> Result<Self, VectorStoreError> {
        let path = dir.join(SNAPSHOT_FILE_NAME);
        let state = match fs::metadata(&path) {
            Ok(meta) => {
                if meta.len() > MAX_SNAPSHOT_BYTES {
                    return Err(VectorStoreError::Corrupt("snapshot exceeds size limit".to_string()));
                }
                let bytes = fs::read(&path).map_err(|err| VectorStoreError::Io(err.to_string()))?;
                load_snapshot(&bytes)?
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => fresh_state(),
            Err(err) => return Err(VectorStoreError::Io(err.to_string())),
        };
        Ok(Self {
            state: Mutex::new(state),
            dir: Some(dir.to_path_buf()),
        })
    }

    /// Locks the store contents.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, MemoryState>, VectorStoreError> {
        self.state
            .lock()
            .map_err(|_| VectorStoreError::Store("vector store mutex poisoned".to_string()))
    }
}

impl VectorStore for InMemoryVectorStore {
    fn add(&self, chunks: &[EmbeddedChunk]) -> Result<Vec<ChunkId>, VectorStoreError> {
        let mut state = self.lock()?;
        let mut dimensions = state.dimensions();
        let mut seq = state.next_seq;
        let mut staged = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            check_vector(&chunk.embedding, dimensions)?;
            dimensions = Some(chunk.embedding.len());
            let id = derive_chunk_id(chunk, seq)
                .map_err(|err| VectorStoreError::Invalid(err.to_string()))?;
            seq += 1;
            staged.push(StoredChunk {
                id,
                content: chunk.content.clone(),
                metadata: chunk.metadata.clone(),
                embedding: chunk.embedding.clone(),
            });
        }
        let ids = staged.iter().map(|chunk| chunk.id.clone()).collect();
        state.chunks.extend(staged);
        state.next_seq = seq;
        drop(state);
        Ok(ids)
    }

    fn search(
        &self,
        query: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        let state = self.lock()?;
        if state.chunks.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        check_vector(query, state.dimensions())?;
        let scored = state
            .chunks
            .iter()
            .map(|chunk| ScoredChunk {
                id: chunk.id.clone(),
                content: chunk.content.clone(),
                metadata: chunk.metadata.clone(),
                score: relevance(query, &chunk.embedding),
            })
            .collect();
        drop(state);
        Ok(rank(scored, k, score_threshold))
    }

    fn sources(&self, filter: SourceFilter) -> Result<SourceListing, VectorStoreError> {
        let state = self.lock()?;
        Ok(SourceListing::collect(
            state.chunks.iter().filter_map(|chunk| metadata_source(&chunk.metadata)),
            filter,
        ))
    }

    fn info(&self) -> Result<StoreInfo, VectorStoreError> {
        let count = self.lock()?.chunks.len();
        Ok(StoreInfo {
            documents: count,
            metadatas: count,
        })
    }

    fn find_source(&self, source: &str) -> Result<SourceDocuments, VectorStoreError> {
        let state = self.lock()?;
        let mut found = SourceDocuments::default();
        for chunk in &state.chunks {
            if metadata_source(&chunk.metadata) == Some(source) {
                found.ids.push(chunk.id.clone());
                found.metadatas.push(chunk.metadata.clone());
                found.documents.push(chunk.content.clone());
            }
        }
        drop(state);
        Ok(found)
    }

    fn delete_source(&self, sources: &[&str]) -> Result<Vec<ChunkId>, VectorStoreError> {
        let mut state = self.lock()?;
        let mut deleted = Vec::new();
        state.chunks.retain(|chunk| {
            let matches = metadata_source(&chunk.metadata)
                .is_some_and(|source| sources.contains(&source));
            if matches {
                deleted.push(chunk.id.clone());
            }
            !matches
        });
        drop(state);
        Ok(deleted)
    }

    fn delete_id(&self, id: &ChunkId) -> Result<ChunkId, VectorStoreError> {
        self.lock()?.chunks.retain(|chunk| &chunk.id != id);
        Ok(id.clone())
    }

    fn reset(&self) -> Result<(), VectorStoreError> {
        *self.lock()? = fresh_state();
        Ok(())
    }

    fn persist(&self) -> Result<(), VectorStoreError> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let bytes = {
            let state = self.lock()?;
            serde_json::to_vec(&*state).map_err(|err| VectorStoreError::Store(err.to_string()))?
        };
        fs::create_dir_all(dir).map_err(|err| VectorStoreError::Io(err.to_string()))?;
        let tmp = dir.join(format!("{SNAPSHOT_FILE_NAME}.tmp"));
        fs::write(&tmp, bytes).map_err(|err| VectorStoreError::Io(err.to_string()))?;
        fs::rename(&tmp, dir.join(SNAPSHOT_FILE_NAME))
            .map_err(|err| VectorStoreError::Io(err.to_string()))
    }

    fn destroy(&self) -> Result<(), VectorStoreError> {
        self.reset()?;
        if let Some(dir) = &self.dir {
            match fs::remove_dir_all(dir) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(VectorStoreError::Io(err.to_string())),
            }
        }
        Ok(())
    }
}

/// Returns an empty store state.
fn fresh_state() -> MemoryState {
    MemoryState {
        version: SNAPSHOT_VERSION,
        ..MemoryState::default()
    }
}

/// Parses and validates a snapshot.
fn load_snapshot(bytes: &[u8]) -> Result<MemoryState, VectorStoreError> {
    let state: MemoryState =
        serde_json::from_slice(bytes).map_err(|err| VectorStoreError::Corrupt(err.to_string()))?;
    if state.version != SNAPSHOT_VERSION {
        return Err(VectorStoreError::Corrupt(format!(
            "unsupported snapshot version: {}",
            state.version
        )));
    }
    let dimensions = state.dimensions();
    for chunk in &state.chunks {
        check_vector(&chunk.embedding, dimensions)
            .map_err(|err| VectorStoreError::Corrupt(err.to_string()))?;
    }
    Ok(state)
}

// ============================================================================
// SECTION: Factory
// ============================================================================

/// Opens [`InMemoryVectorStore`] instances snapshotted in project directories.
#[derive(Debug, Default, Clone, Copy)]
pub struct InMemoryVectorStores;

impl VectorStoreFactory for InMemoryVectorStores {
    fn open(
        &self,
        project: &ProjectModel,
        dir: &Path,
    ) -> Result<Arc<dyn VectorStore>, VectorStoreError> {
        if project.vectorstore != VectorStoreKind::Memory {
            return Err(VectorStoreError::Invalid(format!(
                "unsupported vector store: {}",
                project.vectorstore
            )));
        }
        Ok(Arc::new(InMemoryVectorStore::open(dir)?))
    }

    fn kinds(&self) -> Vec<String> {
        vec![VectorStoreKind::Memory.to_string()]
    }
}
