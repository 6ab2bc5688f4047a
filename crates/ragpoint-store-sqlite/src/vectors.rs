// crates/ragpoint-store-sqlite/src/vectors.rs
// ============================================================================
// Module: SQLite Vector Store
// Description: Per-project chunk storage with brute-force similarity search.
// Purpose: Default durable vector store for Ragpoint projects.
// Dependencies: ragpoint-core, rusqlite, serde_json
// ============================================================================

//! ## Overview
//! Each project keeps its chunks in `<embeddings dir>/vectors.sqlite`.
//! Embeddings are stored as little-endian `f32` blobs; the first stored
//! chunk fixes the dimension and every later insert or query must match it.
//! Search scans every row, scores it with the shared relevance function,
//! then filters by threshold and truncates to `k`.
//!
//! Invariants:
//! - Insertion sequence numbers never repeat, even across resets, so chunk
//!   ids derived from them stay unique.
//! - Writes are committed before a call returns; `persist` only checkpoints
//!   the write-ahead log.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use ragpoint_core::ChunkId;
use ragpoint_core::EmbeddedChunk;
use ragpoint_core::InMemoryVectorStore;
use ragpoint_core::Metadata;
use ragpoint_core::ProjectModel;
use ragpoint_core::ScoredChunk;
use ragpoint_core::SourceDocuments;
use ragpoint_core::SourceFilter;
use ragpoint_core::SourceListing;
use ragpoint_core::StoreInfo;
use ragpoint_core::VectorStore;
use ragpoint_core::VectorStoreError;
use ragpoint_core::VectorStoreFactory;
use ragpoint_core::VectorStoreKind;
use ragpoint_core::core::document::derive_chunk_id;
use ragpoint_core::core::document::metadata_source;
use ragpoint_core::runtime::similarity::check_vector;
use ragpoint_core::runtime::similarity::rank;
use ragpoint_core::runtime::similarity::relevance;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::database::SqliteStoreConfig;
use crate::database::SqliteStoreError;
use crate::database::SqliteTuning;
use crate::database::open_database;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Vector database file name inside a project's embeddings directory.
pub const VECTORS_FILE_NAME: &str = "vectors.sqlite";
/// Vector store schema version.
const VECTORS_SCHEMA_VERSION: i64 = 1;
/// Size of one stored embedding component.
const F32_BYTES: usize = 4;

/// Vector store tables.
const VECTORS_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS chunks (
        id TEXT PRIMARY KEY,
        seq INTEGER NOT NULL UNIQUE,
        source TEXT,
        content TEXT NOT NULL,
        metadata_json TEXT NOT NULL,
        embedding BLOB NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks (source);
    CREATE TABLE IF NOT EXISTS sequence (next_seq INTEGER NOT NULL);
    INSERT INTO sequence (next_seq) VALUES (0);
";

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed vector store for one project.
#[derive(Clone)]
pub struct SqliteVectorStore {
    /// Database file path.
    path: PathBuf,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteVectorStore {
    /// Opens (or creates) a vector database and validates stored embeddings.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Corrupt`] when stored embeddings have
    /// inconsistent dimensions, and other variants when the file cannot be
    /// opened.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let connection = open_database(config, VECTORS_SCHEMA_VERSION, VECTORS_SCHEMA)?;
        validate_dimensions(&connection)?;
        Ok(Self {
            path: config.path.clone(),
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the database file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Inserts chunks in one transaction.
    fn insert(&self, chunks: &[EmbeddedChunk]) -> Result<Vec<ChunkId>, VectorStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(SqliteStoreError::from)?;
        let mut dimensions = stored_dimensions(&tx)?;
        let mut seq: i64 = tx
            .query_row("SELECT next_seq FROM sequence LIMIT 1", params![], |row| row.get(0))
            .map_err(SqliteStoreError::from)?;
        let mut ids = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            check_vector(&chunk.embedding, dimensions)?;
            dimensions = Some(chunk.embedding.len());
            let sequence = u64::try_from(seq)
                .map_err(|_| SqliteStoreError::Corrupt("negative chunk sequence".to_string()))?;
            let id = derive_chunk_id(chunk, sequence)
                .map_err(|err| VectorStoreError::Invalid(err.to_string()))?;
            let metadata = serde_json::to_string(&chunk.metadata)
                .map_err(|err| VectorStoreError::Invalid(err.to_string()))?;
            tx.execute(
                "INSERT INTO chunks (id, seq, source, content, metadata_json, embedding) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id.as_str(),
                    seq,
                    metadata_source(&chunk.metadata),
                    chunk.content,
                    metadata,
                    encode_embedding(&chunk.embedding)
                ],
            )
            .map_err(SqliteStoreError::from)?;
            seq = seq
                .checked_add(1)
                .ok_or_else(|| SqliteStoreError::Corrupt("chunk sequence overflow".to_string()))?;
            ids.push(id);
        }
        tx.execute("UPDATE sequence SET next_seq = ?1", params![seq])
            .map_err(SqliteStoreError::from)?;
        tx.commit().map_err(SqliteStoreError::from)?;
        drop(guard);
        Ok(ids)
    }

    /// Scores every stored chunk against the query.
    fn scan(
        &self,
        query: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let guard = self.lock()?;
        let Some(dimensions) = stored_dimensions(&guard)? else {
            return Ok(Vec::new());
        };
        check_vector(query, Some(dimensions))?;
        let mut stmt = guard
            .prepare("SELECT id, content, metadata_json, embedding FROM chunks ORDER BY seq")
            .map_err(SqliteStoreError::from)?;
        let rows = stmt
            .query_map(params![], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Vec<u8>>(3)?,
                ))
            })
            .map_err(SqliteStoreError::from)?;
        let mut scored = Vec::new();
        for row in rows {
            let (id, content, metadata, embedding) = row.map_err(SqliteStoreError::from)?;
            let embedding = decode_embedding(&embedding)?;
            scored.push(ScoredChunk {
                id: ChunkId::new(id),
                content,
                metadata: parse_metadata(&metadata)?,
                score: relevance(query, &embedding),
            });
        }
        Ok(rank(scored, k, score_threshold))
    }

    /// Reads every stored source in insertion order.
    fn stored_sources(&self) -> Result<Vec<String>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut stmt =
            guard.prepare("SELECT source FROM chunks WHERE source IS NOT NULL ORDER BY seq")?;
        let sources = stmt
            .query_map(params![], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sources)
    }

    /// Reads every chunk of a source.
    fn select_source(&self, source: &str) -> Result<SourceDocuments, SqliteStoreError> {
        let guard = self.lock()?;
        let mut stmt = guard.prepare(
            "SELECT id, content, metadata_json FROM chunks WHERE source = ?1 ORDER BY seq",
        )?;
        let rows = stmt
            .query_map(params![source], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let mut found = SourceDocuments::default();
        for (id, content, metadata) in rows {
            found.ids.push(ChunkId::new(id));
            found.metadatas.push(parse_metadata(&metadata)?);
            found.documents.push(content);
        }
        Ok(found)
    }

    /// Deletes the chunks of any of `sources`.
    fn remove_sources(&self, sources: &[&str]) -> Result<Vec<ChunkId>, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction()?;
        let mut deleted = Vec::new();
        for source in sources {
            let ids = {
                let mut stmt = tx.prepare("SELECT id FROM chunks WHERE source = ?1 ORDER BY seq")?;
                stmt.query_map(params![source], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?
            };
            tx.execute("DELETE FROM chunks WHERE source = ?1", params![source])?;
            deleted.extend(ids.into_iter().map(ChunkId::new));
        }
        tx.commit()?;
        drop(guard);
        Ok(deleted)
    }

    /// Removes the database file and its journal companions.
    fn remove_files(&self) -> Result<(), SqliteStoreError> {
        let mut names = vec![self.path.clone()];
        for suffix in ["-wal", "-shm", "-journal"] {
            let mut name = self.path.clone().into_os_string();
            name.push(suffix);
            names.push(PathBuf::from(name));
        }
        for path in names {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(SqliteStoreError::Io(err.to_string())),
            }
        }
        Ok(())
    }
}

impl VectorStore for SqliteVectorStore {
    fn add(&self, chunks: &[EmbeddedChunk]) -> Result<Vec<ChunkId>, VectorStoreError> {
        self.insert(chunks)
    }

    fn search(
        &self,
        query: &[f32],
        k: usize,
        score_threshold: f32,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        self.scan(query, k, score_threshold)
    }

    fn sources(&self, filter: SourceFilter) -> Result<SourceListing, VectorStoreError> {
        let sources = self.stored_sources()?;
        Ok(SourceListing::collect(sources.iter().map(String::as_str), filter))
    }

    fn info(&self) -> Result<StoreInfo, VectorStoreError> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM chunks", params![], |row| row.get(0))
            .map_err(SqliteStoreError::from)?;
        let count = usize::try_from(count)
            .map_err(|_| SqliteStoreError::Corrupt("negative chunk count".to_string()))?;
        Ok(StoreInfo {
            documents: count,
            metadatas: count,
        })
    }

    fn find_source(&self, source: &str) -> Result<SourceDocuments, VectorStoreError> {
        Ok(self.select_source(source)?)
    }

    fn delete_source(&self, sources: &[&str]) -> Result<Vec<ChunkId>, VectorStoreError> {
        Ok(self.remove_sources(sources)?)
    }

    fn delete_id(&self, id: &ChunkId) -> Result<ChunkId, VectorStoreError> {
        self.lock()?
            .execute("DELETE FROM chunks WHERE id = ?1", params![id.as_str()])
            .map_err(SqliteStoreError::from)?;
        Ok(id.clone())
    }

    fn reset(&self) -> Result<(), VectorStoreError> {
        self.lock()?.execute("DELETE FROM chunks", params![]).map_err(SqliteStoreError::from)?;
        Ok(())
    }

    fn persist(&self) -> Result<(), VectorStoreError> {
        self.lock()?
            .execute_batch("PRAGMA wal_checkpoint(PASSIVE);")
            .map_err(SqliteStoreError::from)?;
        Ok(())
    }

    fn destroy(&self) -> Result<(), VectorStoreError> {
        self.reset()?;
        Ok(self.remove_files()?)
    }
}

// ============================================================================
// SECTION: Factory
// ============================================================================

/// Opens project vector stores by kind: `sqlite` files or in-memory snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectVectorStores {
    /// Tuning applied to every project database.
    tuning: SqliteTuning,
}

impl ProjectVectorStores {
    /// Creates a factory applying `tuning` to project databases.
    #[must_use]
    pub const fn new(tuning: SqliteTuning) -> Self {
        Self {
            tuning,
        }
    }
}

impl VectorStoreFactory for ProjectVectorStores {
    fn open(
        &self,
        project: &ProjectModel,
        dir: &Path,
    ) -> Result<Arc<dyn VectorStore>, VectorStoreError> {
        match project.vectorstore {
            VectorStoreKind::Sqlite => {
                let config = SqliteStoreConfig {
                    path: dir.join(VECTORS_FILE_NAME),
                    tuning: self.tuning,
                };
                Ok(Arc::new(SqliteVectorStore::open(&config)?))
            }
            VectorStoreKind::Memory => Ok(Arc::new(InMemoryVectorStore::open(dir)?)),
        }
    }

    fn kinds(&self) -> Vec<String> {
        VectorStoreKind::ALL.iter().map(ToString::to_string).collect()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Encodes an embedding as little-endian `f32` bytes.
fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|value| value.to_le_bytes()).collect()
}

/// Decodes a little-endian `f32` blob.
fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, SqliteStoreError> {
    if bytes.is_empty() || bytes.len() % F32_BYTES != 0 {
        return Err(SqliteStoreError::Corrupt(format!(
            "embedding blob of {} bytes is not a float vector",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(F32_BYTES)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Parses stored metadata JSON.
fn parse_metadata(raw: &str) -> Result<Metadata, SqliteStoreError> {
    serde_json::from_str(raw).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))
}

/// Returns the dimension of stored embeddings, if any chunk exists.
fn stored_dimensions(connection: &Connection) -> Result<Option<usize>, SqliteStoreError> {
    let length: Option<i64> = connection
        .query_row("SELECT length(embedding) FROM chunks ORDER BY seq LIMIT 1", params![], |row| {
            row.get(0)
        })
        .optional()?;
    length
        .map(|length| {
            let bytes = usize::try_from(length)
                .map_err(|_| SqliteStoreError::Corrupt("negative embedding length".to_string()))?;
            if bytes == 0 || bytes % F32_BYTES != 0 {
                return Err(SqliteStoreError::Corrupt(format!(
                    "embedding blob of {bytes} bytes is not a float vector"
                )));
            }
            Ok(bytes / F32_BYTES)
        })
        .transpose()
}

/// Fails when stored embeddings disagree on their dimension.
fn validate_dimensions(connection: &Connection) -> Result<(), SqliteStoreError> {
    let distinct: i64 = connection.query_row(
        "SELECT COUNT(DISTINCT length(embedding)) FROM chunks",
        params![],
        |row| row.get(0),
    )?;
    if distinct > 1 {
        return Err(SqliteStoreError::Corrupt(
            "stored embeddings have inconsistent dimensions".to_string(),
        ));
    }
    stored_dimensions(connection)?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
