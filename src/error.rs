//! Error taxonomy for the OAuth 2.1 client core.

use thiserror::Error;

/// Errors surfaced by discovery, flow primitives, and the orchestrator.
///
/// Each variant carries enough context to decide whether the caller should
/// retry, redirect the user, or give up. The orchestrator's recovery rules
/// (see [`crate::orchestrator`]) match on the discriminant alone, so variant
/// names are part of the crate's behavioral contract, not just display text.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The request was malformed before it ever reached the network
    /// (bad URL, missing required field, invalid redirect URI).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The authorization server rejected the client's identity or
    /// authentication (`error=invalid_client`, or an HTTP 401 on a
    /// client-authenticated request).
    #[error("invalid client: {0}")]
    InvalidClient(String),

    /// The authorization server rejected the grant (`error=invalid_grant`):
    /// an expired/revoked authorization code, or a stale refresh token.
    #[error("invalid grant: {0}")]
    InvalidGrant(String),

    /// The client lacked authorization for the request, distinct from
    /// `InvalidClient` — used for `unauthorized_client` and bare 401/403
    /// responses not carrying an OAuth error body.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A transport-level failure: the injected [`crate::transport::RequestFn`]
    /// returned an error, or the response could not be decoded.
    #[error("network error: {0}")]
    Network(String),

    /// The authorization or resource server returned a response the client
    /// cannot make progress with (5xx, malformed metadata document, discovery
    /// exhausted all candidate URLs).
    #[error("server error: {0}")]
    Server(String),

    /// The [`crate::provider::SessionProvider`] failed to load or persist
    /// state (client info, tokens, PKCE verifier).
    #[error("storage error: {0}")]
    Storage(String),

    /// Any other OAuth error response the server returned verbatim, captured
    /// for callers that want to inspect `error`/`error_description` directly.
    #[error("oauth error ({code}): {description}")]
    OAuth {
        /// The `error` field from the error response (RFC 6749 §5.2).
        code: String,
        /// The `error_description` field, or a generic message if absent.
        description: String,
    },
}

impl AuthError {
    /// Builds an [`AuthError`] from an RFC 6749 §5.2 error response body,
    /// mapping the well-known `error` codes onto their dedicated variants
    /// and falling back to [`AuthError::OAuth`] for anything else.
    pub fn from_oauth_error(code: &str, description: Option<&str>) -> Self {
        let description = description.unwrap_or("no description provided").to_string();
        match code {
            "invalid_client" => Self::InvalidClient(description),
            "invalid_grant" => Self::InvalidGrant(description),
            "unauthorized_client" => Self::Unauthorized(description),
            other => Self::OAuth {
                code: other.to_string(),
                description,
            },
        }
    }
}

/// Convenience alias used throughout the crate.
pub type AuthResult<T> = Result<T, AuthError>;
