//! Config load and validation tests for ragpoint-config.
// crates/ragpoint-config/tests/config_validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Validate config loading guards, defaults, and env overrides.
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use ragpoint_config::CatalogKind;
use ragpoint_config::ConfigError;
use ragpoint_config::RagpointConfig;
use ragpoint_config::config_toml_example;
use tempfile::NamedTempFile;

type TestResult = Result<(), String>;

fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let map: BTreeMap<String, String> =
        pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
    move |key: &str| map.get(key).cloned()
}

fn write_config(content: &str) -> Result<NamedTempFile, String> {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(content.as_bytes()).map_err(|err| err.to_string())?;
    Ok(file)
}

// ============================================================================
// SECTION: Loading
// ============================================================================

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(
        RagpointConfig::load_with_env(Some(path), env_from(&[])),
        "config path component too long",
    )
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let file = write_config(&"#".repeat(1_048_577))?;
    assert_invalid(
        RagpointConfig::load_with_env(Some(file.path()), env_from(&[])),
        "config file exceeds size limit",
    )
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(
        RagpointConfig::load_with_env(Some(file.path()), env_from(&[])),
        "config file must be utf-8",
    )
}

#[test]
fn explicit_missing_file_is_an_io_error() -> TestResult {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let missing = dir.path().join("absent.toml");
    assert_invalid(RagpointConfig::load_with_env(Some(&missing), env_from(&[])), "config io error")?;
    let missing_text = missing.to_string_lossy().to_string();
    assert_invalid(
        RagpointConfig::load_with_env(None, env_from(&[("RAGPOINT_CONFIG", missing_text.as_str())])),
        "config io error",
    )
}

#[test]
fn env_var_selects_config_file() -> TestResult {
    let file = write_config("[server]\nbind = \"127.0.0.1:9100\"\n")?;
    let path = file.path().to_string_lossy().to_string();
    let config = RagpointConfig::load_with_env(None, env_from(&[("RAGPOINT_CONFIG", path.as_str())]))
        .map_err(|err| err.to_string())?;
    if config.server.bind != "127.0.0.1:9100" {
        return Err(format!("unexpected bind {}", config.server.bind));
    }
    Ok(())
}

#[test]
fn unknown_fields_are_parse_errors() -> TestResult {
    assert_invalid(RagpointConfig::from_toml("[server]\nport = 1\n"), "config parse error")?;
    assert_invalid(RagpointConfig::from_toml("[mystery]\n"), "config parse error")
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

#[test]
fn empty_config_uses_service_defaults() -> TestResult {
    let config = RagpointConfig::from_toml("").map_err(|err| err.to_string())?;
    let addr = config.server.bind_addr().map_err(|err| err.to_string())?;
    if addr.port() != 9000 || !addr.ip().is_unspecified() {
        return Err(format!("unexpected bind {addr}"));
    }
    if config.paths.embeddings != PathBuf::from("./embeddings/")
        || config.paths.uploads != PathBuf::from("./uploads/")
    {
        return Err("unexpected storage roots".to_string());
    }
    if config.catalog.kind != CatalogKind::Sqlite || config.telemetry.anonymized {
        return Err("unexpected catalog or telemetry defaults".to_string());
    }
    if config.logging.directive() != "info" {
        return Err(format!("unexpected log level {}", config.logging.level));
    }
    let settings = config.brain_settings();
    if settings.retrieval.k != 4 || (settings.retrieval.score_threshold - 0.6).abs() > f32::EPSILON {
        return Err("unexpected retrieval defaults".to_string());
    }
    if config.splitter.chunk_size != 1024 || config.splitter.chunk_overlap != 30 {
        return Err("unexpected splitter defaults".to_string());
    }
    if config.embeddings.len() != 1 || config.embeddings[0].name.as_str() != "hashing" {
        return Err("expected the offline hashing embedder by default".to_string());
    }
    Ok(())
}

#[test]
fn example_config_is_valid() -> TestResult {
    let config = RagpointConfig::from_toml(&config_toml_example()).map_err(|err| err.to_string())?;
    if config.llms.len() != 2 || config.embeddings.len() != 2 {
        return Err("example should configure two llms and two embedders".to_string());
    }
    let bootstrap = config.bootstrap.ok_or("example bootstrap missing")?;
    if bootstrap.admin_username.as_str() != "admin" {
        return Err("unexpected bootstrap admin".to_string());
    }
    if config.catalog.sqlite_config().tuning.busy_timeout_ms != 5000 {
        return Err("catalog tuning not flattened".to_string());
    }
    Ok(())
}

// ============================================================================
// SECTION: Environment Overrides
// ============================================================================

#[test]
fn env_overrides_apply_after_file() -> TestResult {
    let file = write_config("[paths]\nembeddings = \"/data/e\"\n[logging]\nlevel = \"warn\"\n")?;
    let env = env_from(&[
        ("EMBEDDINGS_PATH", "/srv/embeddings"),
        ("UPLOADS_PATH", "/srv/uploads"),
        ("LOG_LEVEL", "DEBUG"),
        ("ANONYMIZED_TELEMETRY", "False"),
    ]);
    let config =
        RagpointConfig::load_with_env(Some(file.path()), env).map_err(|err| err.to_string())?;
    if config.paths.embeddings != PathBuf::from("/srv/embeddings")
        || config.paths.uploads != PathBuf::from("/srv/uploads")
    {
        return Err("path overrides not applied".to_string());
    }
    if config.logging.directive() != "debug" || config.telemetry.anonymized {
        return Err("logging or telemetry override not applied".to_string());
    }
    Ok(())
}

#[test]
fn env_overrides_are_validated() -> TestResult {
    let file = write_config("")?;
    assert_invalid(
        RagpointConfig::load_with_env(
            Some(file.path()),
            env_from(&[("ANONYMIZED_TELEMETRY", "maybe")]),
        ),
        "ANONYMIZED_TELEMETRY must be a boolean",
    )?;
    assert_invalid(
        RagpointConfig::load_with_env(Some(file.path()), env_from(&[("LOG_LEVEL", "loud")])),
        "unsupported logging.level",
    )
}

#[test]
fn long_log_level_names_are_accepted() -> TestResult {
    let file = write_config("")?;
    for (level, expected) in
        [("WARNING", "warn"), ("CRITICAL", "error"), ("fatal", "error"), ("INFO", "info")]
    {
        let config = RagpointConfig::load_with_env(Some(file.path()), env_from(&[("LOG_LEVEL", level)]))
            .map_err(|err| format!("{level}: {err}"))?;
        if config.logging.directive() != expected {
            return Err(format!("{level} mapped to {}", config.logging.directive()));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Section Validation
// ============================================================================

#[test]
fn server_limits_are_validated() -> TestResult {
    assert_invalid(RagpointConfig::from_toml("[server]\nbind = \"nowhere\"\n"), "invalid bind address")?;
    assert_invalid(
        RagpointConfig::from_toml("[server]\nmax_body_bytes = 0\n"),
        "max_body_bytes must be greater than zero",
    )?;
    assert_invalid(
        RagpointConfig::from_toml("[server.auth]\nrealm = \"bad\\\"realm\"\n"),
        "realm contains invalid characters",
    )
}

#[test]
fn splitter_and_retrieval_are_validated() -> TestResult {
    assert_invalid(
        RagpointConfig::from_toml("[splitter]\nchunk_size = 10\nchunk_overlap = 10\n"),
        "splitter",
    )?;
    assert_invalid(
        RagpointConfig::from_toml("[retrieval]\nscore_threshold = 1.5\n"),
        "score_threshold must be within [0, 1]",
    )?;
    assert_invalid(
        RagpointConfig::from_toml("[retrieval]\nk = 10\nmax_k = 5\n"),
        "retrieval.k must not exceed max_k",
    )
}

#[test]
fn chat_limits_flow_into_brain_settings() -> TestResult {
    let config = RagpointConfig::from_toml("[chat]\nmax_sessions = 8\n").map_err(|err| err.to_string())?;
    let chat = config.brain_settings().chat;
    if chat.max_sessions != 8 || chat.max_turns != 32 {
        return Err(format!("unexpected chat limits {}/{}", chat.max_sessions, chat.max_turns));
    }
    assert_invalid(
        RagpointConfig::from_toml("[chat]\nmax_turns = 0\n"),
        "chat.max_sessions and chat.max_turns must be greater than zero",
    )
}

#[test]
fn model_tables_are_validated() -> TestResult {
    let duplicate = r#"
[[llms]]
name = "a"
provider = "ollama"
model = "m"
base_url = "http://h"

[[llms]]
name = "a"
provider = "ollama"
model = "m"
base_url = "http://h"
"#;
    assert_invalid(RagpointConfig::from_toml(duplicate), "duplicate llms name: a")?;

    let missing_url = "[[embeddings]]\nname = \"e\"\nprovider = \"openai\"\nmodel = \"m\"\n";
    assert_invalid(RagpointConfig::from_toml(missing_url), "embedding e requires base_url")?;

    let zero_dims = "[[embeddings]]\nname = \"e\"\nprovider = \"hashing\"\ndimensions = 0\n";
    assert_invalid(RagpointConfig::from_toml(zero_dims), "dimensions must be within")?;

    let bad_env = r#"
[[llms]]
name = "a"
provider = "openai"
model = "m"
base_url = "https://h"
api_key_env = "NOT-A-VAR"
"#;
    assert_invalid(RagpointConfig::from_toml(bad_env), "llms.api_key_env")
}

#[test]
fn memory_catalog_ignores_path() -> TestResult {
    let config = RagpointConfig::from_toml("[catalog]\ntype = \"memory\"\npath = \"\"\n")
        .map_err(|err| err.to_string())?;
    if config.catalog.kind != CatalogKind::Memory {
        return Err("catalog kind not parsed".to_string());
    }
    assert_invalid(
        RagpointConfig::from_toml("[catalog]\ntype = \"sqlite\"\npath = \"  \"\n"),
        "catalog.path must be non-empty",
    )
}
