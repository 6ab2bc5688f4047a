// crates/ragpoint-server/src/error.rs
// ============================================================================
// Module: API Errors
// Description: REST error taxonomy and HTTP status mapping.
// Purpose: Convert engine, loader, and auth failures into JSON responses.
// Dependencies: axum, ragpoint-core, ragpoint-providers
// ============================================================================

//! ## Overview
//! Every handler returns [`ApiError`] on failure. Responses carry a JSON body
//! `{"detail": "<message>"}`; authentication failures additionally carry a
//! `WWW-Authenticate: Basic` challenge.

// ============================================================================
// SECTION: Imports
// ============================================================================

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::BytesRejection;
use axum::http::HeaderValue;
use axum::http::StatusCode;
use axum::http::header::WWW_AUTHENTICATE;
use axum::response::IntoResponse;
use axum::response::Response;
use ragpoint_core::BrainError;
use ragpoint_providers::LoaderError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::auth::INCORRECT_CREDENTIALS;
use crate::auth::INSUFFICIENT_PERMISSIONS;

// ============================================================================
// SECTION: Types
// ============================================================================

/// REST API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or invalid request.
    #[error("{0}")]
    BadRequest(String),
    /// Missing credentials or insufficient role, with the Basic realm.
    #[error("{detail}")]
    Unauthenticated {
        /// Response detail.
        detail: String,
        /// Basic auth realm for the challenge header.
        realm: String,
    },
    /// Caller may not access the resource.
    #[error("{0}")]
    Forbidden(String),
    /// Resource does not exist.
    #[error("{0}")]
    NotFound(String),
    /// Resource already exists.
    #[error("{0}")]
    Conflict(String),
    /// Request body exceeds the configured limit.
    #[error("{0}")]
    PayloadTooLarge(String),
    /// Model or remote fetch failure.
    #[error("{0}")]
    Upstream(String),
    /// Unexpected server failure.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Maps an auth failure, attaching the Basic challenge realm.
    #[must_use]
    pub fn from_auth(err: &AuthError, realm: &str) -> Self {
        match err {
            AuthError::Unauthenticated(_) => Self::Unauthenticated {
                detail: INCORRECT_CREDENTIALS.to_string(),
                realm: realm.to_string(),
            },
            AuthError::InsufficientPermissions(_) => Self::Unauthenticated {
                detail: INSUFFICIENT_PERMISSIONS.to_string(),
                realm: realm.to_string(),
            },
            AuthError::Unauthorized(_) => Self::Forbidden("Project access denied".to_string()),
            AuthError::Unavailable(message) => Self::Internal(message.clone()),
        }
    }

    /// Returns the HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated {
                ..
            } => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "request failed");
        }
        let challenge = match &self {
            Self::Unauthenticated {
                realm,
                ..
            } => HeaderValue::from_str(&format!("Basic realm=\"{realm}\"")).ok(),
            _ => None,
        };
        let mut response = (status, Json(json!({ "detail": self.to_string() }))).into_response();
        if let Some(challenge) = challenge {
            response.headers_mut().insert(WWW_AUTHENTICATE, challenge);
        }
        response
    }
}

// ============================================================================
// SECTION: Conversions
// ============================================================================

impl From<BrainError> for ApiError {
    fn from(err: BrainError) -> Self {
        match err {
            BrainError::InvalidInput(message) => Self::BadRequest(message),
            BrainError::NotFound(message) => Self::NotFound(message),
            BrainError::Conflict(message) => Self::Conflict(message),
            BrainError::Llm(_) | BrainError::Embedding(_) => Self::Upstream(err.to_string()),
            BrainError::Store(_) | BrainError::Catalog(_) | BrainError::Io(_) => {
                Self::Internal(err.to_string())
            }
        }
    }
}

impl From<LoaderError> for ApiError {
    fn from(err: LoaderError) -> Self {
        match err {
            LoaderError::UnsupportedFileType(_)
            | LoaderError::InvalidUrl(_)
            | LoaderError::Parse(_) => Self::BadRequest(err.to_string()),
            LoaderError::Fetch(_) => Self::Upstream(err.to_string()),
            LoaderError::Io(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<BytesRejection> for ApiError {
    fn from(err: BytesRejection) -> Self {
        rejection(err.status(), err.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(err: MultipartRejection) -> Self {
        rejection(err.status(), err.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        rejection(err.status(), err.body_text())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("invalid request body: {err}"))
    }
}

/// Maps an axum extractor rejection by status.
fn rejection(status: StatusCode, body: String) -> ApiError {
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("request body too large".to_string())
    } else {
        ApiError::BadRequest(body)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use ragpoint_core::BrainError;
    use ragpoint_providers::LoaderError;

    use super::ApiError;
    use crate::auth::AuthError;

    #[test]
    fn engine_errors_map_to_statuses() {
        let cases = [
            (BrainError::InvalidInput("x".to_string()), StatusCode::BAD_REQUEST),
            (BrainError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
            (BrainError::Conflict("x".to_string()), StatusCode::CONFLICT),
            (BrainError::Llm("x".to_string()), StatusCode::BAD_GATEWAY),
            (BrainError::Embedding("x".to_string()), StatusCode::BAD_GATEWAY),
            (BrainError::Store("x".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn loader_errors_map_to_statuses() {
        let unsupported = ApiError::from(LoaderError::UnsupportedFileType("exe".to_string()));
        assert_eq!(unsupported.status(), StatusCode::BAD_REQUEST);
        assert_eq!(unsupported.to_string(), "Invalid file type: exe");
        assert_eq!(
            ApiError::from(LoaderError::Fetch("500".to_string())).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn auth_details_do_not_leak_reasons() {
        let err = ApiError::from_auth(&AuthError::Unauthenticated("unknown user".to_string()), "r");
        assert_eq!(err.to_string(), "Incorrect username or password");
        let err = ApiError::from_auth(&AuthError::InsufficientPermissions("x".to_string()), "r");
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.to_string(), "Insufficient permissions");
        let err = ApiError::from_auth(&AuthError::Unauthorized("x".to_string()), "r");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
