// crates/ragpoint-server/tests/common/mod.rs
// ============================================================================
// Module: Server Test Harness
// Description: In-process router harness with stub models and seeded users.
// Purpose: Drive the REST API through tower without opening sockets.
// ============================================================================

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::sync::Arc;
use std::sync::Mutex;
use std::thread;
use std::thread::JoinHandle;

use axum::Router;
use axum::body::Body;
use axum::http::HeaderMap;
use axum::http::Method;
use axum::http::Request;
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::http::header::CONTENT_TYPE;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http_body_util::BodyExt;
use ragpoint_config::RagpointConfig;
use ragpoint_core::Brain;
use ragpoint_core::Catalog;
use ragpoint_core::EmbeddingModel;
use ragpoint_core::InMemoryCatalog;
use ragpoint_core::LlmClient;
use ragpoint_core::LlmError;
use ragpoint_core::ModelError;
use ragpoint_core::ModelFactory;
use ragpoint_core::ModelName;
use ragpoint_core::NewUser;
use ragpoint_core::TextSplitter;
use ragpoint_core::Username;
use ragpoint_core::credentials::hash_password_with;
use ragpoint_providers::DocumentLoaders;
use ragpoint_providers::HashingEmbeddings;
use ragpoint_providers::HttpClient;
use ragpoint_providers::HttpPolicy;
use ragpoint_server::AuthAuditEvent;
use ragpoint_server::AuthAuditSink;
use ragpoint_server::RagpointServer;
use ragpoint_store_sqlite::ProjectVectorStores;
use ragpoint_store_sqlite::SqliteTuning;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Answer returned by the stub LLM, padded to exercise trimming.
pub const STUB_ANSWER: &str = "  stub answer \n";

/// Password shared by seeded users.
pub const PASSWORD: &str = "secret";

// ============================================================================
// SECTION: Stub Models
// ============================================================================

/// LLM that records prompts and returns a fixed answer.
#[derive(Default)]
pub struct StubLlm {
    /// Prompts received, in order.
    pub prompts: Mutex<Vec<String>>,
}

impl LlmClient for StubLlm {
    fn name(&self) -> &str {
        "stub"
    }

    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(STUB_ANSWER.to_string())
    }
}

/// Model factory serving the stub LLM and an offline hashing embedder.
pub struct StubModels {
    /// Shared stub LLM.
    pub llm: Arc<StubLlm>,
    /// Offline embedder.
    pub embeddings: Arc<HashingEmbeddings>,
}

impl ModelFactory for StubModels {
    fn llm(&self, name: &ModelName) -> Result<Arc<dyn LlmClient>, ModelError> {
        if name.as_str() == "stub" {
            Ok(self.llm.clone())
        } else {
            Err(ModelError::Unknown(name.to_string()))
        }
    }

    fn embedding(&self, name: &ModelName) -> Result<Arc<dyn EmbeddingModel>, ModelError> {
        if name.as_str() == "hashing" {
            Ok(self.embeddings.clone())
        } else {
            Err(ModelError::Unknown(name.to_string()))
        }
    }

    fn llm_names(&self) -> Vec<String> {
        vec!["stub".to_string()]
    }

    fn embedding_names(&self) -> Vec<String> {
        vec!["hashing".to_string()]
    }
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Audit sink that keeps `(decision, action)` pairs.
#[derive(Default)]
pub struct RecordingSink {
    /// Recorded decisions.
    pub events: Mutex<Vec<(String, String)>>,
}

impl AuthAuditSink for RecordingSink {
    fn record(&self, event: &AuthAuditEvent) {
        self.events
            .lock()
            .unwrap()
            .push((event.decision().to_string(), event.action().to_string()));
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Router plus handles to its backing state.
pub struct TestApp {
    /// Router under test.
    pub router: Router,
    /// Stub LLM shared with the brain.
    pub llm: Arc<StubLlm>,
    /// Catalog shared with the brain.
    pub catalog: Arc<dyn Catalog>,
    /// Audit recorder.
    pub audit: Arc<RecordingSink>,
    /// Storage roots; removed on drop.
    pub dir: TempDir,
}

impl TestApp {
    /// Builds an app with admin `root` and user `alice`.
    ///
    /// Constructs blocking HTTP clients, so call it from the blocking pool.
    pub fn new(extra_toml: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let toml = format!(
            "[paths]\nembeddings = {:?}\nuploads = {:?}\n[catalog]\ntype = \"memory\"\n{extra_toml}",
            dir.path().join("embeddings"),
            dir.path().join("uploads"),
        );
        let config = RagpointConfig::from_toml(&toml).unwrap();

        let catalog: Arc<dyn Catalog> = Arc::new(InMemoryCatalog::new());
        for (name, admin) in [("root", true), ("alice", false)] {
            catalog
                .create_user(NewUser {
                    username: Username::parse(name).unwrap(),
                    password_hash: hash_password_with(PASSWORD, 1).unwrap(),
                    is_admin: admin,
                })
                .unwrap();
        }
        let llm = Arc::new(StubLlm::default());
        let models = StubModels {
            llm: Arc::clone(&llm),
            embeddings: Arc::new(
                HashingEmbeddings::new(ModelName::parse("hashing").unwrap(), 64).unwrap(),
            ),
        };
        let brain = Brain::new(
            config.brain_settings(),
            TextSplitter::new(config.splitter.clone()).unwrap(),
            Arc::new(models),
            Arc::new(ProjectVectorStores::new(SqliteTuning::default())),
            Arc::clone(&catalog),
        );
        let loaders = DocumentLoaders::new(HttpClient::new(local_policy()).unwrap()).unwrap();
        let audit = Arc::new(RecordingSink::default());
        let server =
            RagpointServer::with_components(config, Arc::new(brain), loaders, audit.clone());
        Self {
            router: server.router(),
            llm,
            catalog,
            audit,
            dir,
        }
    }

    /// Builds an app on the blocking pool.
    pub async fn spawn(extra_toml: &'static str) -> Self {
        tokio::task::spawn_blocking(move || Self::new(extra_toml)).await.unwrap()
    }

    /// Sends a request with optional Basic credentials and JSON body.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        user: Option<(&str, &str)>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((username, password)) = user {
            builder = builder.header(AUTHORIZATION, basic(username, password));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.dispatch(request).await
    }

    /// Sends a request as `user` with the shared password.
    pub async fn as_user(
        &self,
        user: &str,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> TestResponse {
        self.send(method, uri, Some((user, PASSWORD)), body).await
    }

    /// Uploads one file through the multipart route.
    pub async fn upload(&self, user: &str, project: &str, file_name: &str, contents: &str) -> TestResponse {
        let boundary = "ragpoint-test-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n\
             {contents}\r\n--{boundary}--\r\n"
        );
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("/projects/{project}/embeddings/ingest/upload"))
            .header(AUTHORIZATION, basic(user, PASSWORD))
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();
        self.dispatch(request).await
    }

    /// Creates a project owned by `user`.
    pub async fn create_project(&self, user: &str, name: &str) -> TestResponse {
        self.as_user(
            user,
            Method::POST,
            "/projects",
            Some(serde_json::json!({"name": name, "embeddings": "hashing", "llm": "stub"})),
        )
        .await
    }

    /// Runs a request through the router.
    async fn dispatch(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// Captured response.
#[derive(Debug)]
pub struct TestResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// JSON body, or null when the body is not JSON.
    pub body: Value,
}

impl TestResponse {
    /// Returns the `detail` field of an error body.
    pub fn detail(&self) -> &str {
        self.body["detail"].as_str().unwrap_or_default()
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Encodes Basic credentials.
pub fn basic(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
}

/// HTTP policy allowing cleartext calls to local fixtures.
pub fn local_policy() -> HttpPolicy {
    HttpPolicy {
        allow_http: true,
        timeout_ms: 5_000,
        ..HttpPolicy::default()
    }
}

/// Serves one HTML page and returns its URL.
pub fn serve_page(body: &'static str) -> (String, JoinHandle<()>) {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let handle = thread::spawn(move || {
        let request = server.recv().unwrap();
        let header =
            tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"text/html"[..]).unwrap();
        let _ = request.respond(tiny_http::Response::from_string(body).with_header(header));
    });
    (format!("http://{addr}/page"), handle)
}
