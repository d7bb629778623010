use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// The upstream system a failed call was talking to.
///
/// Carried on [`Error::UpstreamUnavailable`] so operators can tell a
/// document-store outage from a relational-store outage in logs and
/// responses without parsing message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    /// The document store holding organizations and memberships.
    Directory,
    /// The relational store holding owned records.
    Database,
    /// The authentication provider (token verification / user lookup).
    IdentityProvider,
}

impl Upstream {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directory => "directory",
            Self::Database => "database",
            Self::IdentityProvider => "identity_provider",
        }
    }
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The main error type for orgbridge.
///
/// Each variant maps to a stable machine-readable `reason` code and an HTTP
/// status, so callers and the delivery platform can distinguish
/// authentication problems from store outages without string matching.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A trigger payload did not contain a resolvable uid.
    #[error("Malformed trigger payload: {0}")]
    MalformedTriggerPayload(String),

    /// Bearer token missing, unparseable, or failed verification.
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Verified token lacks a claim the operation requires.
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    /// No membership found for the caller in any organization.
    #[error("Organization not found for {0}")]
    OrganizationNotFound(String),

    /// The authentication provider has no record for this uid.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// A store or the auth provider failed or timed out.
    #[error("Upstream {upstream} unavailable: {message}")]
    UpstreamUnavailable {
        upstream: Upstream,
        message: String,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Standard error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    reason: &'static str,
}

impl Error {
    pub fn malformed_payload(msg: impl Into<String>) -> Self {
        Self::MalformedTriggerPayload(msg.into())
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::InvalidToken(msg.into())
    }

    pub fn invalid_identity(msg: impl Into<String>) -> Self {
        Self::InvalidIdentity(msg.into())
    }

    pub fn organization_not_found(subject: impl Into<String>) -> Self {
        Self::OrganizationNotFound(subject.into())
    }

    pub fn user_not_found(uid: impl Into<String>) -> Self {
        Self::UserNotFound(uid.into())
    }

    pub fn unavailable(upstream: Upstream, err: impl std::fmt::Display) -> Self {
        Self::UpstreamUnavailable {
            upstream,
            message: err.to_string(),
        }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable machine-readable reason code for responses and logs.
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MalformedTriggerPayload(_) => "malformed_trigger_payload",
            Self::InvalidToken(_) => "invalid_token",
            Self::InvalidIdentity(_) => "invalid_identity",
            Self::OrganizationNotFound(_) => "organization_not_found",
            Self::UserNotFound(_) => "user_not_found",
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::Internal(_) | Self::Anyhow(_) => "internal",
        }
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedTriggerPayload(_) | Self::InvalidIdentity(_) => StatusCode::BAD_REQUEST,
            Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::OrganizationNotFound(_) | Self::UserNotFound(_) => StatusCode::NOT_FOUND,
            Self::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message.
    ///
    /// 4xx messages are returned as-is; 5xx messages are generic so store
    /// addresses and credentials never leak to clients (CWE-209).
    fn safe_message(&self) -> String {
        match self {
            Self::MalformedTriggerPayload(_)
            | Self::InvalidToken(_)
            | Self::InvalidIdentity(_)
            | Self::OrganizationNotFound(_)
            | Self::UserNotFound(_) => self.to_string(),
            Self::UpstreamUnavailable { upstream, .. } => {
                format!("Upstream {upstream} unavailable")
            }
            Self::Internal(_) | Self::Anyhow(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody {
            error: self.safe_message(),
            reason: self.reason(),
        };

        // Full detail goes to the server log, not the client.
        tracing::error!(
            status = status.as_u16(),
            reason = self.reason(),
            error = %self,
            "Request failed"
        );

        (status, Json(body)).into_response()
    }
}

impl From<sea_orm::DbErr> for Error {
    fn from(err: sea_orm::DbErr) -> Self {
        // Every sea-orm call in this crate targets the relational store;
        // connection and query failures alike mean the upstream is unusable
        // for this invocation.
        Self::unavailable(Upstream::Database, err)
    }
}

/// Result type alias for orgbridge operations.
pub type Result<T> = std::result::Result<T, Error>;
