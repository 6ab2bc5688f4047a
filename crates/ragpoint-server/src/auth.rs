// crates/ragpoint-server/src/auth.rs
// ============================================================================
// Module: Server Authn/Authz
// Description: HTTP Basic authentication and project authorization.
// Purpose: Provide strict, fail-closed auth decisions for REST requests.
// Dependencies: base64, ragpoint-core, serde
// ============================================================================

//! ## Overview
//! Every route except the liveness banner authenticates the caller with HTTP
//! Basic credentials checked against the catalog. Authorization is layered on
//! top: admin-only actions, self-or-admin user actions, and per-project
//! grants. All decisions are fail-closed and emit audit events.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::net::IpAddr;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ragpoint_core::Catalog;
use ragpoint_core::ProjectName;
use ragpoint_core::UserRecord;
use ragpoint_core::Username;
use ragpoint_core::verify_password;
use ragpoint_core::verify_password_for_unknown_user;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

/// Response detail for failed authentication.
pub const INCORRECT_CREDENTIALS: &str = "Incorrect username or password";

/// Response detail for authenticated callers lacking admin rights.
pub const INSUFFICIENT_PERMISSIONS: &str = "Insufficient permissions";

// ============================================================================
// SECTION: Request Context
// ============================================================================

/// Per-request context used for auth decisions.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Peer IP address when available.
    pub peer_ip: Option<IpAddr>,
    /// Authorization header value.
    pub auth_header: Option<String>,
}

impl RequestContext {
    /// Builds an HTTP request context.
    #[must_use]
    pub const fn http(peer_ip: Option<IpAddr>, auth_header: Option<String>) -> Self {
        Self {
            peer_ip,
            auth_header,
        }
    }
}

// ============================================================================
// SECTION: Auth Context
// ============================================================================

/// Authenticated caller context.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Catalog record of the caller.
    pub user: UserRecord,
}

impl AuthContext {
    /// Returns the caller's username.
    #[must_use]
    pub const fn username(&self) -> &Username {
        &self.user.username
    }

    /// Returns true when the caller is an administrator.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.user.is_admin
    }
}

/// Authz action for REST requests.
#[derive(Debug, Clone, Copy)]
pub enum AuthAction<'a> {
    /// Any authenticated user.
    Authenticate,
    /// Administrators only.
    Admin,
    /// The named user or an administrator.
    User(&'a Username),
    /// Users granted the named project, or administrators.
    Project(&'a ProjectName),
}

impl AuthAction<'_> {
    fn label(self) -> String {
        match self {
            AuthAction::Authenticate => "authenticate".to_string(),
            AuthAction::Admin => "admin".to_string(),
            AuthAction::User(username) => format!("user:{username}"),
            AuthAction::Project(project) => format!("project:{project}"),
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication or authorization errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or invalid credentials.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    /// Authenticated caller lacks the required role.
    #[error("insufficient permissions: {0}")]
    InsufficientPermissions(String),
    /// Authenticated caller has no grant for the resource.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Credential backend could not be consulted.
    #[error("auth backend unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Authn/authz interface for REST requests.
pub trait RequestAuthz: Send + Sync {
    /// Authorize a request. Returns an authenticated context on success.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError`] when the caller is rejected.
    fn authorize(
        &self,
        ctx: &RequestContext,
        action: AuthAction<'_>,
    ) -> Result<AuthContext, AuthError>;
}

/// Audit sink for auth decisions.
pub trait AuthAuditSink: Send + Sync {
    /// Record an auth audit event.
    fn record(&self, event: &AuthAuditEvent);
}

// ============================================================================
// SECTION: Catalog Policy
// ============================================================================

/// Basic-auth policy backed by the user catalog.
pub struct CatalogAuthz {
    /// User catalog.
    catalog: Arc<dyn Catalog>,
}

impl CatalogAuthz {
    /// Builds a policy over `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self {
            catalog,
        }
    }

    /// Resolves and verifies the caller's credentials.
    fn authenticate(&self, ctx: &RequestContext) -> Result<UserRecord, AuthError> {
        let (username, password) = parse_basic_credentials(ctx.auth_header.as_deref())?;
        let username = Username::parse(&username)
            .map_err(|_| AuthError::Unauthenticated("invalid username".to_string()))?;
        let Some(user) = self
            .catalog
            .get_user(&username)
            .map_err(|err| AuthError::Unavailable(err.to_string()))?
        else {
            let _ = verify_password_for_unknown_user(&password);
            return Err(AuthError::Unauthenticated("unknown user".to_string()));
        };
        if !verify_password(&password, &user.password_hash) {
            return Err(AuthError::Unauthenticated("password mismatch".to_string()));
        }
        Ok(user)
    }
}

impl RequestAuthz for CatalogAuthz {
    fn authorize(
        &self,
        ctx: &RequestContext,
        action: AuthAction<'_>,
    ) -> Result<AuthContext, AuthError> {
        let user = self.authenticate(ctx)?;
        match action {
            AuthAction::Authenticate => {}
            AuthAction::Admin => {
                if !user.is_admin {
                    return Err(AuthError::InsufficientPermissions("admin required".to_string()));
                }
            }
            AuthAction::User(username) => {
                if !user.is_admin && &user.username != username {
                    return Err(AuthError::InsufficientPermissions(
                        "admin or account owner required".to_string(),
                    ));
                }
            }
            AuthAction::Project(project) => {
                if !user.can_access(project) {
                    return Err(AuthError::Unauthorized("project access denied".to_string()));
                }
            }
        }
        Ok(AuthContext {
            user,
        })
    }
}

// ============================================================================
// SECTION: Audit Events
// ============================================================================

/// Auth audit event payload.
#[derive(Debug, Serialize)]
pub struct AuthAuditEvent {
    /// Event identifier.
    event: &'static str,
    /// Decision outcome.
    decision: &'static str,
    /// Authorized action label.
    action: String,
    /// Caller IP address (if available).
    peer_ip: Option<String>,
    /// Authenticated username.
    subject: Option<String>,
    /// Failure reason (for deny events).
    reason: Option<String>,
}

impl AuthAuditEvent {
    /// Builds an allow event.
    #[must_use]
    pub fn allowed(ctx: &RequestContext, action: AuthAction<'_>, auth: &AuthContext) -> Self {
        Self {
            event: "ragpoint_authz",
            decision: "allow",
            action: action.label(),
            peer_ip: ctx.peer_ip.map(|ip| ip.to_string()),
            subject: Some(auth.username().to_string()),
            reason: None,
        }
    }

    /// Builds a deny event.
    #[must_use]
    pub fn denied(ctx: &RequestContext, action: AuthAction<'_>, error: &AuthError) -> Self {
        Self {
            event: "ragpoint_authz",
            decision: "deny",
            action: action.label(),
            peer_ip: ctx.peer_ip.map(|ip| ip.to_string()),
            subject: None,
            reason: Some(error.to_string()),
        }
    }

    /// Returns the decision label.
    #[must_use]
    pub const fn decision(&self) -> &'static str {
        self.decision
    }

    /// Returns the action label.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }
}

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl AuthAuditSink for StderrAuditSink {
    fn record(&self, event: &AuthAuditEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// No-op audit sink for tests.
pub struct NoopAuditSink;

impl AuthAuditSink for NoopAuditSink {
    fn record(&self, _event: &AuthAuditEvent) {}
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses `Basic <base64(username:password)>` credentials.
fn parse_basic_credentials(auth_header: Option<&str>) -> Result<(String, String), AuthError> {
    let header = auth_header
        .ok_or_else(|| AuthError::Unauthenticated("missing authorization".to_string()))?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let encoded = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("basic") || encoded.is_empty() {
        return Err(AuthError::Unauthenticated("invalid authorization header".to_string()));
    }
    let decoded = STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or_else(|| AuthError::Unauthenticated("invalid basic credentials".to_string()))?;
    let (username, password) = decoded
        .split_once(':')
        .ok_or_else(|| AuthError::Unauthenticated("invalid basic credentials".to_string()))?;
    Ok((username.to_string(), password.to_string()))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use std::sync::Arc;

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use ragpoint_core::Catalog;
    use ragpoint_core::InMemoryCatalog;
    use ragpoint_core::ModelName;
    use ragpoint_core::NewUser;
    use ragpoint_core::ProjectModel;
    use ragpoint_core::ProjectName;
    use ragpoint_core::Username;
    use ragpoint_core::VectorStoreKind;
    use ragpoint_core::credentials::hash_password_with;

    use super::AuthAction;
    use super::AuthError;
    use super::CatalogAuthz;
    use super::RequestAuthz;
    use super::RequestContext;
    use super::parse_basic_credentials;

    fn basic(username: &str, password: &str) -> Option<String> {
        Some(format!("Basic {}", STANDARD.encode(format!("{username}:{password}"))))
    }

    fn authz() -> CatalogAuthz {
        let catalog = InMemoryCatalog::new();
        for (name, admin) in [("root", true), ("alice", false)] {
            catalog
                .create_user(NewUser {
                    username: Username::parse(name).unwrap(),
                    password_hash: hash_password_with("secret", 1).unwrap(),
                    is_admin: admin,
                })
                .unwrap();
        }
        let project = ProjectModel {
            name: ProjectName::parse("docs").unwrap(),
            embeddings: ModelName::parse("hashing").unwrap(),
            llm: ModelName::parse("llm").unwrap(),
            system: None,
            vectorstore: VectorStoreKind::Memory,
        };
        catalog.create_project(&project).unwrap();
        catalog.grant_project(&Username::parse("alice").unwrap(), &project.name).unwrap();
        CatalogAuthz::new(Arc::new(catalog))
    }

    #[test]
    fn basic_header_parsing_is_strict() {
        assert_eq!(
            parse_basic_credentials(basic("a", "b:c").as_deref()).unwrap(),
            ("a".to_string(), "b:c".to_string())
        );
        for header in [None, Some("Bearer abc"), Some("Basic"), Some("Basic !!!")] {
            assert!(matches!(parse_basic_credentials(header), Err(AuthError::Unauthenticated(_))));
        }
        let oversized = format!("Basic {}", "A".repeat(9 * 1024));
        assert!(parse_basic_credentials(Some(&oversized)).is_err());
    }

    #[test]
    fn wrong_password_and_unknown_user_are_unauthenticated() {
        let authz = authz();
        let wrong = RequestContext::http(None, basic("alice", "nope"));
        let unknown = RequestContext::http(None, basic("mallory", "secret"));
        assert!(matches!(
            authz.authorize(&wrong, AuthAction::Authenticate),
            Err(AuthError::Unauthenticated(_))
        ));
        assert!(matches!(
            authz.authorize(&unknown, AuthAction::Authenticate),
            Err(AuthError::Unauthenticated(_))
        ));
    }

    #[test]
    fn roles_and_grants_are_enforced() {
        let authz = authz();
        let alice = RequestContext::http(None, basic("alice", "secret"));
        let root = RequestContext::http(None, basic("root", "secret"));
        let docs = ProjectName::parse("docs").unwrap();
        let other = ProjectName::parse("other").unwrap();
        let root_name = Username::parse("root").unwrap();

        assert!(authz.authorize(&alice, AuthAction::Project(&docs)).is_ok());
        assert!(matches!(
            authz.authorize(&alice, AuthAction::Project(&other)),
            Err(AuthError::Unauthorized(_))
        ));
        assert!(matches!(
            authz.authorize(&alice, AuthAction::Admin),
            Err(AuthError::InsufficientPermissions(_))
        ));
        assert!(matches!(
            authz.authorize(&alice, AuthAction::User(&root_name)),
            Err(AuthError::InsufficientPermissions(_))
        ));
        assert!(authz.authorize(&root, AuthAction::Project(&other)).is_ok());
        assert!(authz.authorize(&root, AuthAction::Admin).unwrap().is_admin());
    }
}
