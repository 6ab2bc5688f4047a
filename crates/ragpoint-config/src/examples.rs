// crates/ragpoint-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and `config validate` smoke tests.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Provides the annotated `ragpoint.toml` printed by `ragpoint config example`.
//! The payload parses and validates as-is, so it doubles as a smoke fixture.

/// Returns a canonical example `ragpoint.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[server]
bind = "0.0.0.0:9000"
max_body_bytes = 1048576
max_upload_bytes = 67108864

[server.auth]
realm = "ragpoint"

[paths]
embeddings = "./embeddings/"
uploads = "./uploads/"

[catalog]
type = "sqlite"
path = "./ragpoint.sqlite"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000

[logging]
level = "INFO"

[telemetry]
anonymized = false

[splitter]
chunk_size = 1024
chunk_overlap = 30

[retrieval]
score_threshold = 0.6
k = 4
max_k = 64

[chat]
max_sessions = 256
max_turns = 32

[http]
allow_http = true
timeout_ms = 120000
max_response_bytes = 16777216

[[llms]]
name = "gpt-4o-mini"
provider = "openai"
model = "gpt-4o-mini"
base_url = "https://api.openai.com/v1"
api_key_env = "OPENAI_API_KEY"

[[llms]]
name = "llama3"
provider = "ollama"
model = "llama3"
base_url = "http://127.0.0.1:11434"
temperature = 0.1

[[embeddings]]
name = "hashing"
provider = "hashing"
dimensions = 384

[[embeddings]]
name = "nomic-embed-text"
provider = "ollama"
model = "nomic-embed-text"
base_url = "http://127.0.0.1:11434"

[bootstrap]
admin_username = "admin"
admin_password_env = "RAGPOINT_ADMIN_PASSWORD"
"#,
    )
}
