// crates/ragpoint-server/src/routes.rs
// ============================================================================
// Module: REST Handlers
// Description: Request handlers and payloads for users, projects, and RAG.
// Purpose: Translate REST requests into authorized brain operations.
// Dependencies: axum, base64, ragpoint-core, ragpoint-providers, serde
// ============================================================================

//! ## Overview
//! Handlers authorize first, then run engine work on the blocking pool.
//! JSON bodies are parsed from raw bytes so that size and syntax failures map
//! onto [`ApiError`] with a `{"detail"}` body. Source path segments are
//! base64url encoded because sources are usually URLs or filesystem paths.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io;
use std::path::Path as FsPath;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::Multipart;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::BytesRejection;
use axum::extract::rejection::QueryRejection;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ragpoint_core::CatalogError;
use ragpoint_core::ChatAnswer;
use ragpoint_core::ChatRequest;
use ragpoint_core::ChunkId;
use ragpoint_core::ContextAnswer;
use ragpoint_core::IngestReport;
use ragpoint_core::NewUser;
use ragpoint_core::ProjectModel;
use ragpoint_core::ProjectName;
use ragpoint_core::ProjectUpdate;
use ragpoint_core::QuestionAnswer;
use ragpoint_core::QuestionRequest;
use ragpoint_core::SourceDocuments;
use ragpoint_core::SourceFilter;
use ragpoint_core::SourceListing;
use ragpoint_core::UploadsLayout;
use ragpoint_core::UserRecord;
use ragpoint_core::UserUpdate;
use ragpoint_core::Username;
use ragpoint_core::hash_password;
use ragpoint_providers::FileKind;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::auth::AuthAction;
use crate::auth::RequestContext;
use crate::error::ApiError;
use crate::server::ServerState;
use crate::server::run_blocking;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Multipart field carrying the uploaded file.
const UPLOAD_FIELD: &str = "file";

/// Service version reported by `/` and `/info`.
const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// SECTION: Payloads
// ============================================================================

/// Shared handler state.
type AppState = State<Arc<ServerState>>;

/// Liveness banner.
#[derive(Debug, Serialize)]
pub struct Banner {
    /// Service name.
    pub message: &'static str,
    /// Service version.
    pub version: &'static str,
}

/// Service capabilities.
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    /// Service version.
    pub version: &'static str,
    /// Configured LLM names.
    pub llms: Vec<String>,
    /// Configured embedding model names.
    pub embeddings: Vec<String>,
    /// Supported upload extensions.
    pub loaders: Vec<String>,
    /// Supported vector store backends.
    pub vectorstores: Vec<String>,
}

/// User view without credentials.
#[derive(Debug, Serialize)]
pub struct UserView {
    /// Username.
    pub username: Username,
    /// Administrator flag.
    pub is_admin: bool,
    /// Granted projects.
    pub projects: Vec<ProjectName>,
}

impl From<UserRecord> for UserView {
    fn from(user: UserRecord) -> Self {
        Self {
            username: user.username,
            is_admin: user.is_admin,
            projects: user.projects,
        }
    }
}

/// User creation body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateUserBody {
    /// New username.
    username: Username,
    /// Plaintext password, hashed before storage.
    password: String,
    /// Administrator flag.
    #[serde(default)]
    is_admin: bool,
}

/// User update body.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateUserBody {
    /// Replacement password.
    #[serde(default)]
    password: Option<String>,
    /// Replacement admin flag (administrators only).
    #[serde(default)]
    is_admin: Option<bool>,
}

/// Project grant body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GrantBody {
    /// Project to grant.
    project: ProjectName,
}

/// Project view with store occupancy.
#[derive(Debug, Serialize)]
pub struct ProjectView {
    /// Project definition.
    #[serde(flatten)]
    pub project: ProjectModel,
    /// Stored chunk count.
    pub documents: usize,
    /// Stored metadata count.
    pub metadatas: usize,
}

/// URL ingestion body.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IngestUrlBody {
    /// URL to fetch.
    url: String,
}

/// Source listing query.
#[derive(Debug, Default, Deserialize)]
pub struct SourcesQuery {
    /// Filter label: `all`, `urls`, or `other`.
    #[serde(rename = "type", default)]
    kind: Option<String>,
}

/// Deleted source outcome.
#[derive(Debug, Serialize)]
pub struct DeletedSource {
    /// Decoded source.
    pub source: String,
    /// Removed chunk identifiers.
    pub deleted: Vec<ChunkId>,
}

/// Deleted chunk outcome.
#[derive(Debug, Serialize)]
pub struct DeletedId {
    /// Removed chunk identifier.
    pub id: ChunkId,
}

/// Generic project outcome.
#[derive(Debug, Serialize)]
pub struct ProjectOutcome {
    /// Project name.
    pub project: ProjectName,
    /// Outcome label.
    pub status: &'static str,
}

// ============================================================================
// SECTION: Service
// ============================================================================

/// `GET /`
pub async fn root() -> Json<Banner> {
    Json(Banner {
        message: "Ragpoint REST API",
        version: VERSION,
    })
}

/// `GET /info`
pub async fn service_info(
    State(state): AppState,
    ctx: RequestContext,
) -> Result<Json<InfoResponse>, ApiError> {
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Authenticate)?;
        let models = state.brain.models();
        Ok(Json(InfoResponse {
            version: VERSION,
            llms: models.llm_names(),
            embeddings: models.embedding_names(),
            loaders: state.loaders.extensions(),
            vectorstores: state.brain.stores().kinds(),
        }))
    })
    .await
}

// ============================================================================
// SECTION: Users
// ============================================================================

/// `GET /users`
pub async fn list_users(
    State(state): AppState,
    ctx: RequestContext,
) -> Result<Json<Vec<UserView>>, ApiError> {
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Admin)?;
        let users = state.brain.catalog().list_users().map_err(catalog_error)?;
        Ok(Json(users.into_iter().map(UserView::from).collect()))
    })
    .await
}

/// `POST /users`
pub async fn create_user(
    State(state): AppState,
    ctx: RequestContext,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<UserView>, ApiError> {
    let body: CreateUserBody = parse_json(&body?)?;
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Admin)?;
        let password_hash =
            hash_password(&body.password).map_err(|err| ApiError::BadRequest(err.to_string()))?;
        let user = state
            .brain
            .catalog()
            .create_user(NewUser {
                username: body.username,
                password_hash,
                is_admin: body.is_admin,
            })
            .map_err(catalog_error)?;
        info!(username = %user.username, is_admin = user.is_admin, "user created");
        Ok(Json(UserView::from(user)))
    })
    .await
}

/// `GET /users/{username}`
pub async fn get_user(
    State(state): AppState,
    ctx: RequestContext,
    Path(username): Path<String>,
) -> Result<Json<UserView>, ApiError> {
    let username = parse_username(&username)?;
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::User(&username))?;
        let user = state
            .brain
            .catalog()
            .get_user(&username)
            .map_err(catalog_error)?
            .ok_or_else(|| ApiError::NotFound(format!("user {username}")))?;
        Ok(Json(UserView::from(user)))
    })
    .await
}

/// `PATCH /users/{username}`
pub async fn update_user(
    State(state): AppState,
    ctx: RequestContext,
    Path(username): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<UserView>, ApiError> {
    let username = parse_username(&username)?;
    let body: UpdateUserBody = parse_json(&body?)?;
    run_blocking(&state, move |state| {
        let action = if body.is_admin.is_some() {
            AuthAction::Admin
        } else {
            AuthAction::User(&username)
        };
        state.authorize(&ctx, action)?;
        let password_hash = body
            .password
            .as_deref()
            .map(hash_password)
            .transpose()
            .map_err(|err| ApiError::BadRequest(err.to_string()))?;
        let update = UserUpdate {
            password_hash,
            is_admin: body.is_admin,
        };
        if update.is_empty() {
            return Err(ApiError::BadRequest("update must change password or is_admin".to_string()));
        }
        let user = state.brain.catalog().update_user(&username, update).map_err(catalog_error)?;
        info!(username = %user.username, "user updated");
        Ok(Json(UserView::from(user)))
    })
    .await
}

/// `DELETE /users/{username}`
pub async fn delete_user(
    State(state): AppState,
    ctx: RequestContext,
    Path(username): Path<String>,
) -> Result<Json<UserView>, ApiError> {
    let username = parse_username(&username)?;
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Admin)?;
        let catalog = state.brain.catalog();
        let user = catalog
            .get_user(&username)
            .map_err(catalog_error)?
            .ok_or_else(|| ApiError::NotFound(format!("user {username}")))?;
        catalog.delete_user(&username).map_err(catalog_error)?;
        info!(%username, "user deleted");
        Ok(Json(UserView::from(user)))
    })
    .await
}

/// `POST /users/{username}/projects`
pub async fn grant_project(
    State(state): AppState,
    ctx: RequestContext,
    Path(username): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<UserView>, ApiError> {
    let username = parse_username(&username)?;
    let body: GrantBody = parse_json(&body?)?;
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Admin)?;
        let catalog = state.brain.catalog();
        catalog.grant_project(&username, &body.project).map_err(catalog_error)?;
        let user = catalog
            .get_user(&username)
            .map_err(catalog_error)?
            .ok_or_else(|| ApiError::NotFound(format!("user {username}")))?;
        info!(%username, project = %body.project, "project granted");
        Ok(Json(UserView::from(user)))
    })
    .await
}

// ============================================================================
// SECTION: Projects
// ============================================================================

/// `GET /projects`
pub async fn list_projects(
    State(state): AppState,
    ctx: RequestContext,
) -> Result<Json<Vec<ProjectModel>>, ApiError> {
    run_blocking(&state, move |state| {
        let auth = state.authorize(&ctx, AuthAction::Authenticate)?;
        let projects = state.brain.catalog().list_projects().map_err(catalog_error)?;
        Ok(Json(projects.into_iter().filter(|project| auth.user.can_access(&project.name)).collect()))
    })
    .await
}

/// `POST /projects`
pub async fn create_project(
    State(state): AppState,
    ctx: RequestContext,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ProjectModel>, ApiError> {
    let model: ProjectModel = parse_json(&body?)?;
    run_blocking(&state, move |state| {
        let auth = state.authorize(&ctx, AuthAction::Authenticate)?;
        let project = state.brain.create_project(model, Some(auth.username()))?;
        Ok(Json(project.model()))
    })
    .await
}

/// `GET /projects/{name}`
pub async fn get_project(
    State(state): AppState,
    ctx: RequestContext,
    Path(name): Path<String>,
) -> Result<Json<ProjectView>, ApiError> {
    let name = parse_project(&name)?;
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Project(&name))?;
        let project = state.brain.require_project(&name)?;
        let info = state.brain.store_info(&project)?;
        Ok(Json(ProjectView {
            project: project.model(),
            documents: info.documents,
            metadatas: info.metadatas,
        }))
    })
    .await
}

/// `PATCH /projects/{name}`
pub async fn edit_project(
    State(state): AppState,
    ctx: RequestContext,
    Path(name): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ProjectModel>, ApiError> {
    let name = parse_project(&name)?;
    let update: ProjectUpdate = parse_json(&body?)?;
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Project(&name))?;
        let model = state
            .brain
            .edit_project(&name, update)?
            .ok_or_else(|| ApiError::NotFound(format!("project {name}")))?;
        Ok(Json(model))
    })
    .await
}

/// `DELETE /projects/{name}`
pub async fn delete_project(
    State(state): AppState,
    ctx: RequestContext,
    Path(name): Path<String>,
) -> Result<Json<ProjectOutcome>, ApiError> {
    let name = parse_project(&name)?;
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Project(&name))?;
        state.brain.delete_project(&name)?;
        Ok(Json(ProjectOutcome {
            project: name,
            status: "deleted",
        }))
    })
    .await
}

// ============================================================================
// SECTION: Embeddings
// ============================================================================

/// `POST /projects/{name}/embeddings/ingest/url`
pub async fn ingest_url(
    State(state): AppState,
    ctx: RequestContext,
    Path(name): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<IngestReport>, ApiError> {
    let name = parse_project(&name)?;
    let body: IngestUrlBody = parse_json(&body?)?;
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Project(&name))?;
        let project = state.brain.require_project(&name)?;
        let documents = state.loaders.load_url(&body.url)?;
        Ok(Json(state.brain.ingest_documents(&project, documents)?))
    })
    .await
}

/// `POST /projects/{name}/embeddings/ingest/upload`
///
/// The file is stored under the project's uploads directory and its path is
/// recorded as the document source.
pub async fn ingest_upload(
    State(state): AppState,
    ctx: RequestContext,
    Path(name): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<IngestReport>, ApiError> {
    let name = parse_project(&name)?;
    let mut multipart = multipart?;
    let auth_name = name.clone();
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Project(&auth_name))?;
        state.brain.require_project(&auth_name).map(|_| ()).map_err(ApiError::from)
    })
    .await?;

    let (file_name, bytes) = loop {
        let field = multipart
            .next_field()
            .await?
            .ok_or_else(|| ApiError::BadRequest(format!("missing multipart field {UPLOAD_FIELD}")))?;
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("uploaded file requires a file name".to_string()))?;
        break (file_name, field.bytes().await?);
    };
    FileKind::from_path(FsPath::new(&file_name))?;

    run_blocking(&state, move |state| {
        let project = state.brain.require_project(&name)?;
        let path = UploadsLayout::upload_path(&state.brain.settings().uploads_root, &name, &file_name)
            .map_err(upload_error)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(upload_error)?;
        }
        fs::write(&path, &bytes).map_err(upload_error)?;
        let source = path.to_string_lossy().to_string();
        let documents = state.loaders.load_file(&path, &source)?;
        Ok(Json(state.brain.ingest_documents(&project, documents)?))
    })
    .await
}

/// `GET /projects/{name}/embeddings?type=all|urls|other`
pub async fn list_sources(
    State(state): AppState,
    ctx: RequestContext,
    Path(name): Path<String>,
    query: Result<Query<SourcesQuery>, QueryRejection>,
) -> Result<Json<SourceListing>, ApiError> {
    let name = parse_project(&name)?;
    let Query(query) = query.map_err(|err| ApiError::BadRequest(err.body_text()))?;
    let filter = match query.kind.as_deref() {
        None => SourceFilter::All,
        Some(kind) => kind.parse::<SourceFilter>().map_err(ApiError::BadRequest)?,
    };
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Project(&name))?;
        let project = state.brain.require_project(&name)?;
        Ok(Json(state.brain.list_sources(&project, filter)?))
    })
    .await
}

/// `GET /projects/{name}/embeddings/source/{source}`
pub async fn find_source(
    State(state): AppState,
    ctx: RequestContext,
    Path((name, source)): Path<(String, String)>,
) -> Result<Json<SourceDocuments>, ApiError> {
    let name = parse_project(&name)?;
    let source = decode_source(&source)?;
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Project(&name))?;
        let project = state.brain.require_project(&name)?;
        Ok(Json(state.brain.find_source(&project, &source)?))
    })
    .await
}

/// `DELETE /projects/{name}/embeddings/source/{source}`
pub async fn delete_source(
    State(state): AppState,
    ctx: RequestContext,
    Path((name, source)): Path<(String, String)>,
) -> Result<Json<DeletedSource>, ApiError> {
    let name = parse_project(&name)?;
    let source = decode_source(&source)?;
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Project(&name))?;
        let project = state.brain.require_project(&name)?;
        let deleted = state.brain.delete_source(&project, &source)?;
        Ok(Json(DeletedSource {
            source,
            deleted,
        }))
    })
    .await
}

/// `DELETE /projects/{name}/embeddings/id/{id}`
pub async fn delete_id(
    State(state): AppState,
    ctx: RequestContext,
    Path((name, id)): Path<(String, String)>,
) -> Result<Json<DeletedId>, ApiError> {
    let name = parse_project(&name)?;
    if id.trim().is_empty() {
        return Err(ApiError::BadRequest("chunk id must be non-empty".to_string()));
    }
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Project(&name))?;
        let project = state.brain.require_project(&name)?;
        let id = state.brain.delete_id(&project, &ChunkId::new(id))?;
        Ok(Json(DeletedId {
            id,
        }))
    })
    .await
}

/// `POST /projects/{name}/embeddings/reset`
pub async fn reset(
    State(state): AppState,
    ctx: RequestContext,
    Path(name): Path<String>,
) -> Result<Json<ProjectOutcome>, ApiError> {
    let name = parse_project(&name)?;
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Project(&name))?;
        let project = state.brain.require_project(&name)?;
        state.brain.reset(&project)?;
        Ok(Json(ProjectOutcome {
            project: name,
            status: "reset",
        }))
    })
    .await
}

// ============================================================================
// SECTION: Questions
// ============================================================================

/// `POST /projects/{name}/question`
pub async fn question(
    State(state): AppState,
    ctx: RequestContext,
    Path(name): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<QuestionAnswer>, ApiError> {
    let name = parse_project(&name)?;
    let request: QuestionRequest = parse_json(&body?)?;
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Project(&name))?;
        let project = state.brain.require_project(&name)?;
        Ok(Json(state.brain.question(&project, request)?))
    })
    .await
}

/// `POST /projects/{name}/question/context`
pub async fn question_context(
    State(state): AppState,
    ctx: RequestContext,
    Path(name): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ContextAnswer>, ApiError> {
    let name = parse_project(&name)?;
    let request: QuestionRequest = parse_json(&body?)?;
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Project(&name))?;
        let project = state.brain.require_project(&name)?;
        Ok(Json(state.brain.question_context(&project, request)?))
    })
    .await
}

/// `POST /projects/{name}/chat`
pub async fn chat(
    State(state): AppState,
    ctx: RequestContext,
    Path(name): Path<String>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ChatAnswer>, ApiError> {
    let name = parse_project(&name)?;
    let request: ChatRequest = parse_json(&body?)?;
    run_blocking(&state, move |state| {
        state.authorize(&ctx, AuthAction::Project(&name))?;
        let project = state.brain.require_project(&name)?;
        Ok(Json(state.brain.chat(&project, request)?))
    })
    .await
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a JSON request body.
fn parse_json<T: DeserializeOwned>(bytes: &Bytes) -> Result<T, ApiError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Parses a project name path segment.
fn parse_project(value: &str) -> Result<ProjectName, ApiError> {
    ProjectName::parse(value).map_err(|err| ApiError::BadRequest(err.to_string()))
}

/// Parses a username path segment.
fn parse_username(value: &str) -> Result<Username, ApiError> {
    Username::parse(value).map_err(|err| ApiError::BadRequest(err.to_string()))
}

/// Decodes a base64url source path segment; padding is optional.
fn decode_source(segment: &str) -> Result<String, ApiError> {
    let invalid = || ApiError::BadRequest("source must be base64url encoded utf-8".to_string());
    let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('=')).map_err(|_| invalid())?;
    let source = String::from_utf8(bytes).map_err(|_| invalid())?;
    if source.is_empty() {
        return Err(invalid());
    }
    Ok(source)
}

/// Maps catalog failures.
fn catalog_error(err: CatalogError) -> ApiError {
    match err {
        CatalogError::NotFound(message) => ApiError::NotFound(message),
        CatalogError::Conflict(message) => ApiError::Conflict(message),
        CatalogError::Invalid(message) => ApiError::BadRequest(message),
        CatalogError::Store(message) => ApiError::Internal(message),
    }
}

/// Maps upload filesystem failures; invalid names are client errors.
fn upload_error(err: io::Error) -> ApiError {
    if err.kind() == io::ErrorKind::InvalidInput {
        ApiError::BadRequest(err.to_string())
    } else {
        ApiError::Internal(format!("upload failed: {err}"))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    use super::decode_source;

    #[test]
    fn sources_decode_with_or_without_padding() {
        let source = "https://example.com/a?b=c";
        assert_eq!(decode_source(&URL_SAFE_NO_PAD.encode(source)).unwrap(), source);
        assert_eq!(decode_source(&URL_SAFE.encode("ab")).unwrap(), "ab");
        assert!(decode_source("not+base64/").is_err());
        assert!(decode_source("").is_err());
    }
}
