// crates/ragpoint-store-sqlite/src/catalog.rs
// ============================================================================
// Module: SQLite Catalog
// Description: Durable users, projects, and access grants.
// Purpose: Implement the Ragpoint catalog on a single SQLite file.
// Dependencies: ragpoint-core, rusqlite
// ============================================================================

//! ## Overview
//! [`SqliteCatalog`] stores users, project definitions, and the grants that
//! link them. Grants cascade when either side is deleted. Every read
//! re-validates identifiers so a tampered row surfaces as corruption instead
//! of leaking an invalid name into the runtime.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use ragpoint_core::Catalog;
use ragpoint_core::CatalogError;
use ragpoint_core::ModelName;
use ragpoint_core::NewUser;
use ragpoint_core::ProjectModel;
use ragpoint_core::ProjectName;
use ragpoint_core::UserRecord;
use ragpoint_core::UserUpdate;
use ragpoint_core::Username;
use ragpoint_core::VectorStoreKind;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;

use crate::database::SqliteStoreConfig;
use crate::database::SqliteStoreError;
use crate::database::open_database;
use crate::database::unix_millis;

// ============================================================================
// SECTION: Schema
// ============================================================================

/// Catalog schema version.
const CATALOG_SCHEMA_VERSION: i64 = 1;

/// Catalog tables.
const CATALOG_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        username TEXT PRIMARY KEY,
        password_hash TEXT NOT NULL,
        is_admin INTEGER NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS projects (
        name TEXT PRIMARY KEY,
        embeddings TEXT NOT NULL,
        llm TEXT NOT NULL,
        system TEXT,
        vectorstore TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS user_projects (
        username TEXT NOT NULL,
        project TEXT NOT NULL,
        PRIMARY KEY (username, project),
        FOREIGN KEY (username) REFERENCES users(username) ON DELETE CASCADE,
        FOREIGN KEY (project) REFERENCES projects(name) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_user_projects_project ON user_projects (project);
";

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// `SQLite`-backed user and project catalog.
#[derive(Clone)]
pub struct SqliteCatalog {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteCatalog {
    /// Opens (or creates) the catalog database.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// carries an unsupported schema version.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let connection = open_database(config, CATALOG_SCHEMA_VERSION, CATALOG_SCHEMA)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Inserts a user.
    fn insert_user(&self, user: NewUser) -> Result<UserRecord, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction()?;
        if user_exists(&tx, &user.username)? {
            return Err(SqliteStoreError::Conflict(format!("user {}", user.username)));
        }
        tx.execute(
            "INSERT INTO users (username, password_hash, is_admin, created_at) VALUES (?1, ?2, \
             ?3, ?4)",
            params![user.username.as_str(), user.password_hash, user.is_admin, unix_millis()],
        )?;
        let record = read_user(&tx, &user.username)?
            .ok_or_else(|| SqliteStoreError::Corrupt(format!("user {} vanished", user.username)))?;
        tx.commit()?;
        drop(guard);
        Ok(record)
    }

    /// Applies a partial user update.
    fn patch_user(
        &self,
        username: &Username,
        update: UserUpdate,
    ) -> Result<UserRecord, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction()?;
        if !user_exists(&tx, username)? {
            return Err(SqliteStoreError::NotFound(format!("user {username}")));
        }
        if let Some(hash) = update.password_hash {
            tx.execute(
                "UPDATE users SET password_hash = ?1 WHERE username = ?2",
                params![hash, username.as_str()],
            )?;
        }
        if let Some(is_admin) = update.is_admin {
            tx.execute(
                "UPDATE users SET is_admin = ?1 WHERE username = ?2",
                params![is_admin, username.as_str()],
            )?;
        }
        let record = read_user(&tx, username)?
            .ok_or_else(|| SqliteStoreError::Corrupt(format!("user {username} vanished")))?;
        tx.commit()?;
        drop(guard);
        Ok(record)
    }

    /// Deletes a user and its grants.
    fn remove_user(&self, username: &Username) -> Result<(), SqliteStoreError> {
        let deleted = self
            .lock()?
            .execute("DELETE FROM users WHERE username = ?1", params![username.as_str()])?;
        if deleted == 0 {
            return Err(SqliteStoreError::NotFound(format!("user {username}")));
        }
        Ok(())
    }

    /// Lists every user ordered by name.
    fn all_users(&self) -> Result<Vec<UserRecord>, SqliteStoreError> {
        let guard = self.lock()?;
        let names = {
            let mut stmt = guard.prepare("SELECT username FROM users ORDER BY username")?;
            let rows = stmt.query_map(params![], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        let mut users = Vec::with_capacity(names.len());
        for name in names {
            let username = parse_username(&name)?;
            if let Some(record) = read_user(&guard, &username)? {
                users.push(record);
            }
        }
        drop(guard);
        Ok(users)
    }

    /// Inserts a project definition.
    fn insert_project(&self, project: &ProjectModel) -> Result<(), SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction()?;
        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM projects WHERE name = ?1",
                params![project.name.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(SqliteStoreError::Conflict(format!("project {}", project.name)));
        }
        tx.execute(
            "INSERT INTO projects (name, embeddings, llm, system, vectorstore, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.name.as_str(),
                project.embeddings.as_str(),
                project.llm.as_str(),
                project.system,
                project.vectorstore.as_str(),
                unix_millis()
            ],
        )?;
        tx.commit()?;
        drop(guard);
        Ok(())
    }

    /// Replaces a project definition.
    fn replace_project(&self, project: &ProjectModel) -> Result<(), SqliteStoreError> {
        let updated = self.lock()?.execute(
            "UPDATE projects SET embeddings = ?1, llm = ?2, system = ?3, vectorstore = ?4 WHERE \
             name = ?5",
            params![
                project.embeddings.as_str(),
                project.llm.as_str(),
                project.system,
                project.vectorstore.as_str(),
                project.name.as_str()
            ],
        )?;
        if updated == 0 {
            return Err(SqliteStoreError::NotFound(format!("project {}", project.name)));
        }
        Ok(())
    }

    /// Loads one project definition.
    fn load_project(&self, name: &ProjectName) -> Result<Option<ProjectModel>, SqliteStoreError> {
        let guard = self.lock()?;
        let row = guard
            .query_row(
                "SELECT name, embeddings, llm, system, vectorstore FROM projects WHERE name = ?1",
                params![name.as_str()],
                project_row,
            )
            .optional()?;
        drop(guard);
        row.map(ProjectRow::into_model).transpose()
    }

    /// Loads every project definition ordered by name.
    fn all_projects(&self) -> Result<Vec<ProjectModel>, SqliteStoreError> {
        let guard = self.lock()?;
        let rows = {
            let mut stmt = guard.prepare(
                "SELECT name, embeddings, llm, system, vectorstore FROM projects ORDER BY name",
            )?;
            let rows = stmt.query_map(params![], project_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };
        drop(guard);
        rows.into_iter().map(ProjectRow::into_model).collect()
    }

    /// Deletes a project and its grants.
    fn remove_project(&self, name: &ProjectName) -> Result<(), SqliteStoreError> {
        let deleted =
            self.lock()?.execute("DELETE FROM projects WHERE name = ?1", params![name.as_str()])?;
        if deleted == 0 {
            return Err(SqliteStoreError::NotFound(format!("project {name}")));
        }
        Ok(())
    }

    /// Grants a user access to a project; granting twice is a no-op.
    fn insert_grant(
        &self,
        username: &Username,
        project: &ProjectName,
    ) -> Result<(), SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction()?;
        if !user_exists(&tx, username)? {
            return Err(SqliteStoreError::NotFound(format!("user {username}")));
        }
        let exists: Option<i64> = tx
            .query_row("SELECT 1 FROM projects WHERE name = ?1", params![project.as_str()], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Err(SqliteStoreError::NotFound(format!("project {project}")));
        }
        tx.execute(
            "INSERT OR IGNORE INTO user_projects (username, project) VALUES (?1, ?2)",
            params![username.as_str(), project.as_str()],
        )?;
        tx.commit()?;
        drop(guard);
        Ok(())
    }
}

impl Catalog for SqliteCatalog {
    fn create_user(&self, user: NewUser) -> Result<UserRecord, CatalogError> {
        Ok(self.insert_user(user)?)
    }

    fn get_user(&self, username: &Username) -> Result<Option<UserRecord>, CatalogError> {
        let guard = self.lock()?;
        Ok(read_user(&guard, username)?)
    }

    fn list_users(&self) -> Result<Vec<UserRecord>, CatalogError> {
        Ok(self.all_users()?)
    }

    fn update_user(
        &self,
        username: &Username,
        update: UserUpdate,
    ) -> Result<UserRecord, CatalogError> {
        Ok(self.patch_user(username, update)?)
    }

    fn delete_user(&self, username: &Username) -> Result<(), CatalogError> {
        Ok(self.remove_user(username)?)
    }

    fn create_project(&self, project: &ProjectModel) -> Result<(), CatalogError> {
        Ok(self.insert_project(project)?)
    }

    fn get_project(&self, name: &ProjectName) -> Result<Option<ProjectModel>, CatalogError> {
        Ok(self.load_project(name)?)
    }

    fn list_projects(&self) -> Result<Vec<ProjectModel>, CatalogError> {
        Ok(self.all_projects()?)
    }

    fn update_project(&self, project: &ProjectModel) -> Result<(), CatalogError> {
        Ok(self.replace_project(project)?)
    }

    fn delete_project(&self, name: &ProjectName) -> Result<(), CatalogError> {
        Ok(self.remove_project(name)?)
    }

    fn grant_project(&self, username: &Username, project: &ProjectName) -> Result<(), CatalogError> {
        Ok(self.insert_grant(username, project)?)
    }
}

// ============================================================================
// SECTION: Row Mapping
// ============================================================================

/// Raw project row.
struct ProjectRow {
    /// Project name.
    name: String,
    /// Embedding model name.
    embeddings: String,
    /// LLM name.
    llm: String,
    /// Optional system prompt.
    system: Option<String>,
    /// Vector store kind.
    vectorstore: String,
}

impl ProjectRow {
    /// Validates the row into a project definition.
    fn into_model(self) -> Result<ProjectModel, SqliteStoreError> {
        let corrupt = |err: String| SqliteStoreError::Corrupt(format!("project row: {err}"));
        Ok(ProjectModel {
            name: ProjectName::parse(&self.name).map_err(|err| corrupt(err.to_string()))?,
            embeddings: ModelName::parse(&self.embeddings).map_err(|err| corrupt(err.to_string()))?,
            llm: ModelName::parse(&self.llm).map_err(|err| corrupt(err.to_string()))?,
            system: self.system,
            vectorstore: self.vectorstore.parse::<VectorStoreKind>().map_err(corrupt)?,
        })
    }
}

/// Reads a project row.
fn project_row(row: &Row<'_>) -> rusqlite::Result<ProjectRow> {
    Ok(ProjectRow {
        name: row.get(0)?,
        embeddings: row.get(1)?,
        llm: row.get(2)?,
        system: row.get(3)?,
        vectorstore: row.get(4)?,
    })
}

/// Returns whether a user row exists.
fn user_exists(connection: &Connection, username: &Username) -> Result<bool, SqliteStoreError> {
    let exists: Option<i64> = connection
        .query_row("SELECT 1 FROM users WHERE username = ?1", params![username.as_str()], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(exists.is_some())
}

/// Reads a user with its granted projects.
fn read_user(
    connection: &Connection,
    username: &Username,
) -> Result<Option<UserRecord>, SqliteStoreError> {
    let row: Option<(String, bool)> = connection
        .query_row(
            "SELECT password_hash, is_admin FROM users WHERE username = ?1",
            params![username.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((password_hash, is_admin)) = row else {
        return Ok(None);
    };
    let mut stmt = connection
        .prepare("SELECT project FROM user_projects WHERE username = ?1 ORDER BY project")?;
    let names = stmt
        .query_map(params![username.as_str()], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    let projects = names
        .iter()
        .map(|name| {
            ProjectName::parse(name)
                .map_err(|err| SqliteStoreError::Corrupt(format!("grant row: {err}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(UserRecord {
        username: username.clone(),
        password_hash,
        is_admin,
        projects,
    }))
}

/// Validates a stored username.
fn parse_username(name: &str) -> Result<Username, SqliteStoreError> {
    Username::parse(name).map_err(|err| SqliteStoreError::Corrupt(format!("user row: {err}")))
}
