// crates/ragpoint-config/src/config.rs
// ============================================================================
// Module: Ragpoint Configuration
// Description: Configuration loading and validation for Ragpoint.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: ragpoint-core, ragpoint-providers, ragpoint-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits,
//! then a small set of environment variables is layered on top. When no
//! path is given and neither `RAGPOINT_CONFIG` nor the default file exists,
//! built-in defaults apply so that the service starts with no parameters.
//! Every section validates itself; the first failure aborts loading.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use ragpoint_core::BrainSettings;
use ragpoint_core::ChatLimits;
use ragpoint_core::KeywordExtractor;
use ragpoint_core::RetrievalDefaults;
use ragpoint_core::SplitterConfig;
use ragpoint_core::runtime::sessions::DEFAULT_MAX_CHAT_SESSIONS;
use ragpoint_core::runtime::sessions::DEFAULT_MAX_CHAT_TURNS;
use ragpoint_core::Username;
use ragpoint_core::text::keywords::DEFAULT_DEDUP_THRESHOLD;
use ragpoint_core::text::keywords::DEFAULT_MAX_NGRAM;
use ragpoint_core::text::keywords::DEFAULT_TOP;
use ragpoint_providers::EmbeddingBackend;
use ragpoint_providers::EmbeddingEntry;
use ragpoint_providers::HttpPolicy;
use ragpoint_providers::LlmEntry;
use ragpoint_providers::embeddings::DEFAULT_HASHING_DIMENSIONS;
use ragpoint_providers::embeddings::MAX_HASHING_DIMENSIONS;
use ragpoint_store_sqlite::SqliteStoreConfig;
use ragpoint_store_sqlite::SqliteTuning;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "ragpoint.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "RAGPOINT_CONFIG";
/// Environment variable overriding `paths.embeddings`.
pub const EMBEDDINGS_PATH_ENV_VAR: &str = "EMBEDDINGS_PATH";
/// Environment variable overriding `paths.uploads`.
pub const UPLOADS_PATH_ENV_VAR: &str = "UPLOADS_PATH";
/// Environment variable overriding `logging.level`.
pub const LOG_LEVEL_ENV_VAR: &str = "LOG_LEVEL";
/// Environment variable overriding `telemetry.anonymized`.
pub const ANONYMIZED_TELEMETRY_ENV_VAR: &str = "ANONYMIZED_TELEMETRY";
/// Default bind address; the container declares port 9000.
pub const DEFAULT_BIND: &str = "0.0.0.0:9000";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the Basic auth realm.
pub(crate) const MAX_REALM_LENGTH: usize = 128;
/// Maximum number of configured models per kind.
pub(crate) const MAX_MODEL_ENTRIES: usize = 64;
/// Log levels accepted by `logging.level`.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Ragpoint service configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RagpointConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage roots.
    #[serde(default)]
    pub paths: PathsConfig,
    /// User/project catalog backend.
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Telemetry settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Chunking settings.
    #[serde(default)]
    pub splitter: SplitterConfig,
    /// Retrieval defaults.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Keyword enrichment settings.
    #[serde(default)]
    pub keywords: KeywordsConfig,
    /// Chat memory bounds.
    #[serde(default)]
    pub chat: ChatConfig,
    /// Outbound HTTP policy for models and URL ingestion.
    #[serde(default)]
    pub http: HttpPolicy,
    /// Configured LLMs.
    #[serde(default)]
    pub llms: Vec<LlmEntry>,
    /// Configured embedding models.
    #[serde(default = "default_embeddings")]
    pub embeddings: Vec<EmbeddingEntry>,
    /// Optional admin bootstrap.
    #[serde(default)]
    pub bootstrap: Option<BootstrapConfig>,
}

impl Default for RagpointConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            paths: PathsConfig::default(),
            catalog: CatalogConfig::default(),
            logging: LoggingConfig::default(),
            telemetry: TelemetryConfig::default(),
            splitter: SplitterConfig::default(),
            retrieval: RetrievalConfig::default(),
            keywords: KeywordsConfig::default(),
            chat: ChatConfig::default(),
            http: HttpPolicy::default(),
            llms: Vec::new(),
            embeddings: default_embeddings(),
            bootstrap: None,
        }
    }
}

impl RagpointConfig {
    /// Loads configuration using the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Loads configuration, resolving environment variables through `env`.
    ///
    /// An explicit path or `RAGPOINT_CONFIG` must name an existing file. The
    /// default file name falls back to built-in defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load_with_env(
        path: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path, &env)?;
        validate_path(&resolved)?;
        let mut config = if !explicit && !resolved.exists() {
            Self::default()
        } else {
            Self::from_file(&resolved)?
        };
        config.apply_env_overrides(&env)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML string without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        if content.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a config file.
    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Applies `EMBEDDINGS_PATH`, `UPLOADS_PATH`, `LOG_LEVEL`, and
    /// `ANONYMIZED_TELEMETRY` overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `ANONYMIZED_TELEMETRY` is not a
    /// boolean.
    pub fn apply_env_overrides(
        &mut self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = env(EMBEDDINGS_PATH_ENV_VAR) {
            self.paths.embeddings = PathBuf::from(path);
        }
        if let Some(path) = env(UPLOADS_PATH_ENV_VAR) {
            self.paths.uploads = PathBuf::from(path);
        }
        if let Some(level) = env(LOG_LEVEL_ENV_VAR) {
            self.logging.level = level;
        }
        if let Some(flag) = env(ANONYMIZED_TELEMETRY_ENV_VAR) {
            self.telemetry.anonymized = parse_bool(ANONYMIZED_TELEMETRY_ENV_VAR, &flag)?;
        }
        Ok(())
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.paths.validate()?;
        self.catalog.validate()?;
        self.logging.validate()?;
        self.splitter
            .validate()
            .map_err(|err| ConfigError::Invalid(format!("splitter: {err}")))?;
        self.retrieval.validate()?;
        self.keywords.validate()?;
        self.chat.validate()?;
        validate_http(&self.http)?;
        validate_llms(&self.llms)?;
        validate_embeddings(&self.embeddings)?;
        if let Some(bootstrap) = &self.bootstrap {
            bootstrap.validate()?;
        }
        Ok(())
    }

    /// Returns the brain settings derived from this configuration.
    #[must_use]
    pub fn brain_settings(&self) -> BrainSettings {
        BrainSettings {
            embeddings_root: self.paths.embeddings.clone(),
            uploads_root: self.paths.uploads.clone(),
            retrieval: self.retrieval.defaults(),
            keywords: self.keywords.extractor(),
            chat: self.chat.limits(),
        }
    }
}

// ============================================================================
// SECTION: Server
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum JSON request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Maximum multipart upload size in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// Authentication settings.
    #[serde(default)]
    pub auth: ServerAuthConfig,
    /// Audit logging settings.
    #[serde(default)]
    pub audit: ServerAuditConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            max_upload_bytes: default_max_upload_bytes(),
            auth: ServerAuthConfig::default(),
            audit: ServerAuditConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Validates server settings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_bytes must be greater than zero".to_string(),
            ));
        }
        self.auth.validate()
    }
}

/// HTTP Basic authentication settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAuthConfig {
    /// Realm advertised in `WWW-Authenticate`.
    #[serde(default = "default_realm")]
    pub realm: String,
}

impl Default for ServerAuthConfig {
    fn default() -> Self {
        Self {
            realm: default_realm(),
        }
    }
}

impl ServerAuthConfig {
    /// Validates the realm string.
    fn validate(&self) -> Result<(), ConfigError> {
        let realm = self.realm.trim();
        if realm.is_empty() {
            return Err(ConfigError::Invalid("server.auth.realm must be non-empty".to_string()));
        }
        if realm.len() > MAX_REALM_LENGTH {
            return Err(ConfigError::Invalid("server.auth.realm exceeds max length".to_string()));
        }
        if realm.chars().any(|ch| ch == '"' || ch == '\\' || ch.is_control()) {
            return Err(ConfigError::Invalid(
                "server.auth.realm contains invalid characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Audit logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerAuditConfig {
    /// Emit JSON-line auth audit events on stderr.
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,
}

impl Default for ServerAuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
        }
    }
}

// ============================================================================
// SECTION: Paths and Catalog
// ============================================================================

/// Storage roots.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Root of per-project embeddings directories.
    #[serde(default = "default_embeddings_path")]
    pub embeddings: PathBuf,
    /// Root of per-project uploads.
    #[serde(default = "default_uploads_path")]
    pub uploads: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            embeddings: default_embeddings_path(),
            uploads: default_uploads_path(),
        }
    }
}

impl PathsConfig {
    /// Validates both roots.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("paths.embeddings", &self.embeddings.to_string_lossy())?;
        validate_path_string("paths.uploads", &self.uploads.to_string_lossy())
    }
}

/// Catalog backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogKind {
    /// Process-local catalog; users and projects are lost on restart.
    Memory,
    /// `SQLite` catalog file.
    #[default]
    Sqlite,
}

/// Catalog backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// Backend selector.
    #[serde(rename = "type", default)]
    pub kind: CatalogKind,
    /// `SQLite` catalog path.
    #[serde(default = "default_catalog_path")]
    pub path: PathBuf,
    /// `SQLite` tuning.
    #[serde(flatten)]
    pub tuning: SqliteTuning,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            kind: CatalogKind::default(),
            path: default_catalog_path(),
            tuning: SqliteTuning::default(),
        }
    }
}

impl CatalogConfig {
    /// Returns the `SQLite` store configuration for the catalog.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            tuning: self.tuning,
        }
    }

    /// Validates catalog settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.kind == CatalogKind::Sqlite {
            validate_path_string("catalog.path", &self.path.to_string_lossy())?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Logging and Telemetry
// ============================================================================

/// Logging settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Minimum level: trace, debug, info, warn (warning), or error (critical).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Returns the level as a lowercase filter directive.
    ///
    /// Long level names are folded onto tracing levels: `warning`
    /// becomes `warn`, and `critical` or `fatal` become `error`.
    #[must_use]
    pub fn directive(&self) -> String {
        let level = self.level.trim().to_ascii_lowercase();
        match level.as_str() {
            "warning" => "warn".to_string(),
            "critical" | "fatal" => "error".to_string(),
            _ => level,
        }
    }

    /// Validates the level name.
    fn validate(&self) -> Result<(), ConfigError> {
        let directive = self.directive();
        if LOG_LEVELS.contains(&directive.as_str()) {
            return Ok(());
        }
        Err(ConfigError::Invalid(format!("unsupported logging.level: {}", self.level)))
    }
}

/// Telemetry settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Anonymise telemetry. Ragpoint sends none; the flag is logged at startup.
    #[serde(default)]
    pub anonymized: bool,
}

// ============================================================================
// SECTION: Retrieval and Keywords
// ============================================================================

/// Retrieval defaults applied when requests omit them.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// Minimum relevance score in `[0, 1]`.
    #[serde(default = "default_score_threshold")]
    pub score_threshold: f32,
    /// Number of chunks retrieved.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Upper bound for caller-supplied `k`.
    #[serde(default = "default_max_k")]
    pub max_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            score_threshold: default_score_threshold(),
            k: default_k(),
            max_k: default_max_k(),
        }
    }
}

impl RetrievalConfig {
    /// Returns the core retrieval defaults.
    #[must_use]
    pub const fn defaults(&self) -> RetrievalDefaults {
        RetrievalDefaults {
            score_threshold: self.score_threshold,
            k: self.k,
            max_k: self.max_k,
        }
    }

    /// Validates retrieval bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(ConfigError::Invalid(
                "retrieval.score_threshold must be within [0, 1]".to_string(),
            ));
        }
        if self.k == 0 || self.max_k == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.k and retrieval.max_k must be greater than zero".to_string(),
            ));
        }
        if self.k > self.max_k {
            return Err(ConfigError::Invalid("retrieval.k must not exceed max_k".to_string()));
        }
        Ok(())
    }
}

/// Chat memory bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Sessions kept per project; the least recently used is evicted.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
    /// Turns kept per session.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            max_turns: default_max_turns(),
        }
    }
}

impl ChatConfig {
    /// Returns the core chat limits.
    #[must_use]
    pub const fn limits(&self) -> ChatLimits {
        ChatLimits {
            max_sessions: self.max_sessions,
            max_turns: self.max_turns,
        }
    }

    /// Validates chat bounds.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sessions == 0 || self.max_turns == 0 {
            return Err(ConfigError::Invalid(
                "chat.max_sessions and chat.max_turns must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Keyword enrichment settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeywordsConfig {
    /// Maximum n-gram size.
    #[serde(default = "default_max_ngram")]
    pub max_ngram: usize,
    /// Keywords kept per document.
    #[serde(default = "default_top")]
    pub top: usize,
    /// Similarity above which near-duplicate keywords are dropped.
    #[serde(default = "default_dedup_threshold")]
    pub dedup_threshold: f64,
}

impl Default for KeywordsConfig {
    fn default() -> Self {
        Self {
            max_ngram: default_max_ngram(),
            top: default_top(),
            dedup_threshold: default_dedup_threshold(),
        }
    }
}

impl KeywordsConfig {
    /// Returns the core keyword extractor.
    #[must_use]
    pub const fn extractor(&self) -> KeywordExtractor {
        KeywordExtractor {
            max_ngram: self.max_ngram,
            top: self.top,
            dedup_threshold: self.dedup_threshold,
        }
    }

    /// Validates keyword settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_ngram == 0 || self.top == 0 {
            return Err(ConfigError::Invalid(
                "keywords.max_ngram and keywords.top must be greater than zero".to_string(),
            ));
        }
        if !(self.dedup_threshold > 0.0 && self.dedup_threshold <= 1.0) {
            return Err(ConfigError::Invalid(
                "keywords.dedup_threshold must be within (0, 1]".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Bootstrap
// ============================================================================

/// Admin account created at startup when absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootstrapConfig {
    /// Admin username.
    pub admin_username: Username,
    /// Environment variable holding the admin password.
    pub admin_password_env: String,
}

impl BootstrapConfig {
    /// Validates the bootstrap settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_env_var_name("bootstrap.admin_password_env", &self.admin_password_env)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path; the flag is true when the path was requested.
fn resolve_path(
    path: Option<&Path>,
    env: &impl Fn(&str) -> Option<String>,
) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Some(env_path) = env(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an environment variable name.
fn validate_env_var_name(field: &str, value: &str) -> Result<(), ConfigError> {
    let valid = !value.is_empty()
        && !value.starts_with(|ch: char| ch.is_ascii_digit())
        && value.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid {
        return Ok(());
    }
    Err(ConfigError::Invalid(format!("{field} must be an environment variable name")))
}

/// Parses a boolean environment value.
fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::Invalid(format!("{field} must be a boolean"))),
    }
}

/// Validates the outbound HTTP policy.
fn validate_http(policy: &HttpPolicy) -> Result<(), ConfigError> {
    if policy.timeout_ms == 0 {
        return Err(ConfigError::Invalid("http.timeout_ms must be greater than zero".to_string()));
    }
    if policy.max_response_bytes == 0 {
        return Err(ConfigError::Invalid(
            "http.max_response_bytes must be greater than zero".to_string(),
        ));
    }
    if policy.user_agent.trim().is_empty() {
        return Err(ConfigError::Invalid("http.user_agent must be non-empty".to_string()));
    }
    Ok(())
}

/// Validates LLM entries.
fn validate_llms(entries: &[LlmEntry]) -> Result<(), ConfigError> {
    check_unique("llms", entries.iter().map(|entry| entry.name.as_str()))?;
    for entry in entries {
        if entry.model.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("llm {} requires model", entry.name)));
        }
        if entry.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid(format!("llm {} requires base_url", entry.name)));
        }
        if !(0.0..=2.0).contains(&entry.temperature) {
            return Err(ConfigError::Invalid(format!(
                "llm {} temperature must be within [0, 2]",
                entry.name
            )));
        }
        if let Some(variable) = &entry.api_key_env {
            validate_env_var_name("llms.api_key_env", variable)?;
        }
    }
    Ok(())
}

/// Validates embedding entries.
fn validate_embeddings(entries: &[EmbeddingEntry]) -> Result<(), ConfigError> {
    check_unique("embeddings", entries.iter().map(|entry| entry.name.as_str()))?;
    for entry in entries {
        match entry.provider {
            EmbeddingBackend::Hashing => {
                if entry.dimensions == 0 || entry.dimensions > MAX_HASHING_DIMENSIONS {
                    return Err(ConfigError::Invalid(format!(
                        "embedding {} dimensions must be within 1..={MAX_HASHING_DIMENSIONS}",
                        entry.name
                    )));
                }
            }
            EmbeddingBackend::OpenAi | EmbeddingBackend::Ollama => {
                if entry.model.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "embedding {} requires model",
                        entry.name
                    )));
                }
                if entry.base_url.as_deref().is_none_or(|url| url.trim().is_empty()) {
                    return Err(ConfigError::Invalid(format!(
                        "embedding {} requires base_url",
                        entry.name
                    )));
                }
            }
        }
        if let Some(variable) = &entry.api_key_env {
            validate_env_var_name("embeddings.api_key_env", variable)?;
        }
    }
    Ok(())
}

/// Rejects duplicate or excessive model names.
fn check_unique<'a>(
    field: &str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(ConfigError::Invalid(format!("duplicate {field} name: {name}")));
        }
    }
    if seen.len() > MAX_MODEL_ENTRIES {
        return Err(ConfigError::Invalid(format!("too many {field} entries")));
    }
    Ok(())
}

/// Default bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size in bytes.
pub(crate) const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default maximum upload size in bytes.
pub(crate) const fn default_max_upload_bytes() -> usize {
    64 * 1024 * 1024
}

/// Default Basic auth realm.
fn default_realm() -> String {
    "ragpoint".to_string()
}

/// Audit events are on by default.
const fn default_audit_enabled() -> bool {
    true
}

/// Default embeddings root.
fn default_embeddings_path() -> PathBuf {
    PathBuf::from("./embeddings/")
}

/// Default uploads root.
fn default_uploads_path() -> PathBuf {
    PathBuf::from("./uploads/")
}

/// Default catalog file.
fn default_catalog_path() -> PathBuf {
    PathBuf::from("./ragpoint.sqlite")
}

/// Default log level.
fn default_log_level() -> String {
    "INFO".to_string()
}

/// Default relevance threshold.
const fn default_score_threshold() -> f32 {
    ragpoint_core::core::requests::DEFAULT_SCORE_THRESHOLD
}

/// Default retrieved chunk count.
const fn default_k() -> usize {
    ragpoint_core::core::requests::DEFAULT_TOP_K
}

/// Default cap on caller-supplied `k`.
const fn default_max_k() -> usize {
    64
}

/// Default chat sessions per project.
const fn default_max_sessions() -> usize {
    DEFAULT_MAX_CHAT_SESSIONS
}

/// Default turns per chat session.
const fn default_max_turns() -> usize {
    DEFAULT_MAX_CHAT_TURNS
}

/// Default keyword n-gram size.
const fn default_max_ngram() -> usize {
    DEFAULT_MAX_NGRAM
}

/// Default keyword count.
const fn default_top() -> usize {
    DEFAULT_TOP
}

/// Default keyword dedup threshold.
const fn default_dedup_threshold() -> f64 {
    DEFAULT_DEDUP_THRESHOLD
}

/// Offline embedder available when no embeddings are configured.
fn default_embeddings() -> Vec<EmbeddingEntry> {
    let Ok(name) = ragpoint_core::ModelName::parse("hashing") else {
        return Vec::new();
    };
    vec![EmbeddingEntry {
        name,
        provider: EmbeddingBackend::Hashing,
        model: String::new(),
        base_url: None,
        api_key_env: None,
        dimensions: DEFAULT_HASHING_DIMENSIONS,
    }]
}
