// crates/ragpoint-providers/tests/common/mod.rs
// ============================================================================
// Module: Provider Test Helpers
// Description: Local HTTP fixtures shared by provider tests.
// Purpose: Serve canned responses and record what clients sent.
// ============================================================================

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::io::Read;
use std::thread;
use std::thread::JoinHandle;

use ragpoint_providers::HttpPolicy;
use tiny_http::Header;
use tiny_http::Response;
use tiny_http::Server;

/// Request captured by a fixture server.
#[derive(Debug, Clone)]
pub struct Recorded {
    /// Request path.
    pub path: String,
    /// Request body.
    pub body: String,
    /// Authorization header, when sent.
    pub authorization: Option<String>,
}

impl Recorded {
    /// Parses the recorded body as JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Serves a single response and returns the base URL plus the recorder.
pub fn serve_once(
    status: u16,
    content_type: &str,
    body: impl Into<String>,
) -> (String, JoinHandle<Recorded>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let body = body.into();
    let header = Header::from_bytes(&b"Content-Type"[..], content_type.as_bytes()).unwrap();
    let handle = thread::spawn(move || {
        let mut request = server.recv().unwrap();
        let mut received = String::new();
        request.as_reader().read_to_string(&mut received).unwrap();
        let authorization = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Authorization"))
            .map(|header| header.value.as_str().to_string());
        let recorded = Recorded {
            path: request.url().to_string(),
            body: received,
            authorization,
        };
        let response = Response::from_string(body).with_status_code(status).with_header(header);
        let _ = request.respond(response);
        recorded
    });
    (format!("http://{addr}"), handle)
}

/// Serves a single JSON response.
pub fn serve_json(body: &serde_json::Value) -> (String, JoinHandle<Recorded>) {
    serve_once(200, "application/json", body.to_string())
}

/// HTTP policy allowing cleartext calls to local fixtures.
pub fn local_policy() -> HttpPolicy {
    HttpPolicy {
        allow_http: true,
        timeout_ms: 5_000,
        ..HttpPolicy::default()
    }
}
