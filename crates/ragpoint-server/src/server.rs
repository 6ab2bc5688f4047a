// crates/ragpoint-server/src/server.rs
// ============================================================================
// Module: REST Server
// Description: Server assembly, shared state, routing, and the HTTP listener.
// Purpose: Wire configuration into the brain and expose it over axum.
// Dependencies: axum, ragpoint-config, ragpoint-core, ragpoint-providers,
//               ragpoint-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! [`RagpointServer`] owns the validated configuration and the shared state
//! every handler sees: the [`Brain`], the document loaders, the auth policy,
//! and the audit sink. Engine calls block on SQLite and outbound HTTP, so
//! handlers run them on the blocking pool. Security posture: request bodies,
//! path segments, and credentials are untrusted and validated before use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::ConnectInfo;
use axum::extract::DefaultBodyLimit;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use ragpoint_config::BootstrapConfig;
use ragpoint_config::CatalogConfig;
use ragpoint_config::CatalogKind;
use ragpoint_config::RagpointConfig;
use ragpoint_core::Brain;
use ragpoint_core::Catalog;
use ragpoint_core::InMemoryCatalog;
use ragpoint_core::NewUser;
use ragpoint_core::TextSplitter;
use ragpoint_core::hash_password;
use ragpoint_providers::DocumentLoaders;
use ragpoint_providers::ModelRegistry;
use ragpoint_store_sqlite::ProjectVectorStores;
use ragpoint_store_sqlite::SqliteCatalog;
use thiserror::Error;
use tracing::info;

use crate::auth::AuthAction;
use crate::auth::AuthAuditEvent;
use crate::auth::AuthAuditSink;
use crate::auth::AuthContext;
use crate::auth::CatalogAuthz;
use crate::auth::NoopAuditSink;
use crate::auth::RequestAuthz;
use crate::auth::RequestContext;
use crate::auth::StderrAuditSink;
use crate::error::ApiError;
use crate::routes;

// ============================================================================
// SECTION: Server
// ============================================================================

/// Ragpoint REST server instance.
pub struct RagpointServer {
    /// Validated configuration.
    config: RagpointConfig,
    /// State shared with every handler.
    state: Arc<ServerState>,
}

impl RagpointServer {
    /// Builds a server from configuration: catalog, model registry, vector
    /// store opener, splitter, brain, and loaders.
    ///
    /// Builds blocking HTTP clients, so call it outside async contexts.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when validation or initialization fails.
    pub fn from_config(config: RagpointConfig) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        let catalog = build_catalog(&config.catalog)?;
        let registry =
            ModelRegistry::new(config.llms.clone(), config.embeddings.clone(), config.http.clone())
                .map_err(|err| ServerError::Init(err.to_string()))?;
        let loaders = DocumentLoaders::new(registry.http().clone())
            .map_err(|err| ServerError::Init(err.to_string()))?;
        let splitter = TextSplitter::new(config.splitter.clone())
            .map_err(|err| ServerError::Config(err.to_string()))?;
        let stores = ProjectVectorStores::new(config.catalog.tuning);
        let brain =
            Brain::new(config.brain_settings(), splitter, Arc::new(registry), Arc::new(stores), catalog);
        let audit: Arc<dyn AuthAuditSink> = if config.server.audit.enabled {
            Arc::new(StderrAuditSink)
        } else {
            Arc::new(NoopAuditSink)
        };
        Ok(Self::with_components(config, Arc::new(brain), loaders, audit))
    }

    /// Builds a server over pre-assembled components.
    #[must_use]
    pub fn with_components(
        config: RagpointConfig,
        brain: Arc<Brain>,
        loaders: DocumentLoaders,
        audit: Arc<dyn AuthAuditSink>,
    ) -> Self {
        let authz = Arc::new(CatalogAuthz::new(brain.shared_catalog()));
        let state = Arc::new(ServerState {
            brain,
            loaders,
            authz,
            audit,
            realm: config.server.auth.realm.clone(),
        });
        Self {
            config,
            state,
        }
    }

    /// Returns the server configuration.
    #[must_use]
    pub const fn config(&self) -> &RagpointConfig {
        &self.config
    }

    /// Returns the brain served by this instance.
    #[must_use]
    pub fn brain(&self) -> &Brain {
        &self.state.brain
    }

    /// Creates the configured bootstrap administrator when it does not exist.
    ///
    /// Returns true when a user was created.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the password variable is unset or the
    /// catalog rejects the user.
    pub fn bootstrap_admin(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<bool, ServerError> {
        match &self.config.bootstrap {
            Some(bootstrap) => bootstrap_admin(self.state.brain.catalog(), bootstrap, env),
            None => Ok(false),
        }
    }

    /// Builds the axum router.
    #[must_use]
    pub fn router(&self) -> Router {
        let uploads = Router::new()
            .route("/projects/{name}/embeddings/ingest/upload", post(routes::ingest_upload))
            .layer(DefaultBodyLimit::max(self.config.server.max_upload_bytes));
        Router::new()
            .route("/", get(routes::root))
            .route("/info", get(routes::service_info))
            .route("/users", get(routes::list_users).post(routes::create_user))
            .route(
                "/users/{username}",
                get(routes::get_user).patch(routes::update_user).delete(routes::delete_user),
            )
            .route("/users/{username}/projects", post(routes::grant_project))
            .route("/projects", get(routes::list_projects).post(routes::create_project))
            .route(
                "/projects/{name}",
                get(routes::get_project).patch(routes::edit_project).delete(routes::delete_project),
            )
            .route("/projects/{name}/embeddings", get(routes::list_sources))
            .route("/projects/{name}/embeddings/ingest/url", post(routes::ingest_url))
            .route(
                "/projects/{name}/embeddings/source/{source}",
                get(routes::find_source).delete(routes::delete_source),
            )
            .route("/projects/{name}/embeddings/id/{id}", delete(routes::delete_id))
            .route("/projects/{name}/embeddings/reset", post(routes::reset))
            .route("/projects/{name}/question", post(routes::question))
            .route("/projects/{name}/question/context", post(routes::question_context))
            .route("/projects/{name}/chat", post(routes::chat))
            .layer(DefaultBodyLimit::max(self.config.server.max_body_bytes))
            .merge(uploads)
            .with_state(Arc::clone(&self.state))
    }

    /// Serves requests on the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when binding or serving fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let addr = self
            .config
            .server
            .bind_addr()
            .map_err(|err| ServerError::Config(err.to_string()))?;
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        info!(
            %addr,
            anonymized_telemetry = self.config.telemetry.anonymized,
            "ragpoint listening"
        );
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))
    }
}

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// Shared server state for handlers.
pub(crate) struct ServerState {
    /// RAG engine.
    pub(crate) brain: Arc<Brain>,
    /// File and URL loaders.
    pub(crate) loaders: DocumentLoaders,
    /// Auth policy.
    authz: Arc<dyn RequestAuthz>,
    /// Auth decision sink.
    audit: Arc<dyn AuthAuditSink>,
    /// Basic auth realm.
    realm: String,
}

impl ServerState {
    /// Authorizes a request and records the decision.
    pub(crate) fn authorize(
        &self,
        ctx: &RequestContext,
        action: AuthAction<'_>,
    ) -> Result<AuthContext, ApiError> {
        match self.authz.authorize(ctx, action) {
            Ok(auth) => {
                self.audit.record(&AuthAuditEvent::allowed(ctx, action, &auth));
                Ok(auth)
            }
            Err(err) => {
                self.audit.record(&AuthAuditEvent::denied(ctx, action, &err));
                Err(ApiError::from_auth(&err, &self.realm))
            }
        }
    }
}

/// Runs engine work on the blocking pool.
pub(crate) async fn run_blocking<T, F>(state: &Arc<ServerState>, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ServerState) -> Result<T, ApiError> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || work(&state))
        .await
        .map_err(|err| ApiError::Internal(format!("blocking task failed: {err}")))?
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let peer_ip = parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
        Ok(Self::http(peer_ip, auth_header))
    }
}

// ============================================================================
// SECTION: Assembly Helpers
// ============================================================================

/// Builds the user/project catalog from configuration.
///
/// # Errors
///
/// Returns [`ServerError::Init`] when the SQLite catalog cannot be opened.
pub fn build_catalog(config: &CatalogConfig) -> Result<Arc<dyn Catalog>, ServerError> {
    let catalog: Arc<dyn Catalog> = match config.kind {
        CatalogKind::Memory => Arc::new(InMemoryCatalog::new()),
        CatalogKind::Sqlite => Arc::new(
            SqliteCatalog::new(&config.sqlite_config())
                .map_err(|err| ServerError::Init(err.to_string()))?,
        ),
    };
    Ok(catalog)
}

/// Creates the bootstrap administrator when it does not exist.
///
/// # Errors
///
/// Returns [`ServerError`] when the password variable is unset or invalid,
/// or the catalog fails.
pub fn bootstrap_admin(
    catalog: &dyn Catalog,
    bootstrap: &BootstrapConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<bool, ServerError> {
    let existing = catalog
        .get_user(&bootstrap.admin_username)
        .map_err(|err| ServerError::Init(err.to_string()))?;
    if existing.is_some() {
        return Ok(false);
    }
    let password = env(&bootstrap.admin_password_env).ok_or_else(|| {
        ServerError::Config(format!(
            "bootstrap password variable {} is not set",
            bootstrap.admin_password_env
        ))
    })?;
    let password_hash =
        hash_password(&password).map_err(|err| ServerError::Config(err.to_string()))?;
    catalog
        .create_user(NewUser {
            username: bootstrap.admin_username.clone(),
            password_hash,
            is_admin: true,
        })
        .map_err(|err| ServerError::Init(err.to_string()))?;
    info!(username = %bootstrap.admin_username, "bootstrap admin created");
    Ok(true)
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}
