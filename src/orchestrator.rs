//! The orchestrator: the top-level `auth()` entry point that
//! sequences discovery, client registration, and the authorization-code or
//! refresh flow, with a one-shot recovery retry when the server tells the
//! client its credentials are no longer good.
//!
//! The orchestrator holds no state of its own; every read and write goes
//! through the caller's [`SessionProvider`].

use url::Url;

use crate::discovery;
use crate::error::{AuthError, AuthResult};
use crate::flow;
use crate::provider::{InvalidationScope, SessionProvider};
use crate::transport::RequestFn;
use crate::types::ProtectedResourceMetadata;

/// Inputs that vary per call: which resource the client is trying to reach,
/// and (if the user-agent just came back from the authorization server)
/// the authorization code from the callback.
#[derive(Debug, Clone, Default)]
pub struct AuthOptions<'a> {
    /// The resource server URL the client is trying to access.
    pub server_url: &'a str,
    /// The authorization code from a just-completed redirect callback, if any.
    pub authorization_code: Option<&'a str>,
    /// Scope to request on a fresh authorization or refresh, if any.
    pub scope: Option<&'a str>,
    /// A `resource_metadata` URL extracted from a `WWW-Authenticate` header
    /// (via [`extract_resource_metadata_url`]), bypassing discovery's
    /// well-known URL guesses when the resource server told us directly.
    pub resource_metadata_url: Option<&'a str>,
}

/// What the caller should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Tokens are saved in the session provider; the request can proceed.
    Authorized,
    /// The user-agent has been redirected (via [`SessionProvider::redirect_to_authorization`]);
    /// the caller must wait for the callback and invoke `auth()` again with
    /// `authorization_code` set.
    Redirect,
}

/// Drives one full step of the OAuth 2.1 flow, recovering once from a
/// server-reported credential failure before giving up.
///
/// Recovery rules: `invalid_client`/`unauthorized_client` invalidate
/// all stored credentials and retry from scratch (forcing re-registration);
/// `invalid_grant` invalidates only the token pair and retries (forcing a
/// fresh authorization instead of a refresh).
pub async fn auth(
    transport: &RequestFn,
    provider: &dyn SessionProvider,
    options: &AuthOptions<'_>,
) -> AuthResult<AuthOutcome> {
    match auth_internal(transport, provider, options).await {
        Ok(outcome) => Ok(outcome),
        Err(AuthError::InvalidClient(_)) | Err(AuthError::Unauthorized(_)) => {
            provider.invalidate_credentials(InvalidationScope::All).await?;
            auth_internal(transport, provider, options).await
        }
        Err(AuthError::InvalidGrant(_)) => {
            provider.invalidate_credentials(InvalidationScope::Tokens).await?;
            auth_internal(transport, provider, options).await
        }
        Err(e) => Err(e),
    }
}

async fn auth_internal(
    transport: &RequestFn,
    provider: &dyn SessionProvider,
    options: &AuthOptions<'_>,
) -> AuthResult<AuthOutcome> {
    let server_url = Url::parse(options.server_url)
        .map_err(|e| AuthError::InvalidRequest(format!("invalid server_url: {e}")))?;

    let protected_resource = discover_protected_resource(transport, &server_url, options).await?;

    let authorization_server_url = pick_authorization_server_url(protected_resource.as_ref(), &server_url)?;
    let as_metadata =
        discovery::fetch_authorization_server_metadata(transport, &authorization_server_url)
            .await?
            .as_oauth2()
            .clone();

    let resource = select_resource_url(
        protected_resource.as_ref(),
        provider,
        authorization_server_url.as_str(),
    )
    .await?;

    let client = match provider.client_information().await {
        Some(client) => client,
        None => {
            let registration_endpoint = as_metadata.registration_endpoint.clone().ok_or_else(|| {
                AuthError::Server(
                    "server has no registration_endpoint and no client is pre-registered".to_string(),
                )
            })?;
            let client = flow::register_client(transport, &registration_endpoint, provider.client_metadata())
                .await?;
            provider.save_client_information(client.clone()).await?;
            client
        }
    };

    if let Some(code) = options.authorization_code {
        let code_verifier = provider.code_verifier().await?;
        let redirect_uri = provider
            .redirect_url()
            .ok_or_else(|| AuthError::InvalidRequest("no redirect_url configured".to_string()))?;
        let tokens = flow::exchange_authorization(
            transport,
            &as_metadata,
            &client,
            code,
            &code_verifier,
            redirect_uri,
            resource.as_deref(),
            provider,
        )
        .await?;
        provider.save_tokens(tokens).await?;
        provider
            .invalidate_credentials(InvalidationScope::Verifier)
            .await?;
        return Ok(AuthOutcome::Authorized);
    }

    if let Some(existing_tokens) = provider.tokens().await {
        if let Some(refresh_token) = existing_tokens.refresh_token.clone() {
            match flow::refresh_authorization(
                transport,
                &as_metadata,
                &client,
                &refresh_token,
                options.scope,
                resource.as_deref(),
                provider,
            )
            .await
            {
                Ok(tokens) => {
                    provider.save_tokens(tokens).await?;
                    return Ok(AuthOutcome::Authorized);
                }
                Err(AuthError::Server(_)) => {
                    // Transient server-side failure: fall through to a fresh
                    // authorization rather than treat the refresh token as dead.
                }
                Err(e) => return Err(e),
            }
        }
    }

    let redirect_uri = provider
        .redirect_url()
        .ok_or_else(|| AuthError::InvalidRequest("no redirect_url configured for interactive flow".to_string()))?;
    let state = provider.state().await;
    let start = flow::start_authorization(
        &as_metadata,
        &client.client_id,
        redirect_uri,
        state.as_deref(),
        options.scope,
        resource.as_deref(),
    )?;
    provider.save_code_verifier(start.code_verifier).await?;
    provider
        .redirect_to_authorization(&start.authorization_url)
        .await?;
    Ok(AuthOutcome::Redirect)
}

async fn discover_protected_resource(
    transport: &RequestFn,
    server_url: &Url,
    options: &AuthOptions<'_>,
) -> AuthResult<Option<ProtectedResourceMetadata>> {
    if let Some(explicit_url) = options.resource_metadata_url {
        let url = Url::parse(explicit_url)
            .map_err(|e| AuthError::InvalidRequest(format!("invalid resource_metadata_url: {e}")))?;
        return discovery::fetch_protected_resource_metadata_at(transport, &url)
            .await
            .map(Some);
    }

    match discovery::fetch_protected_resource_metadata(transport, server_url).await {
        Ok(metadata) => Ok(Some(metadata)),
        Err(AuthError::Server(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

fn pick_authorization_server_url(
    protected_resource: Option<&ProtectedResourceMetadata>,
    server_url: &Url,
) -> AuthResult<Url> {
    let candidate = protected_resource
        .and_then(|m| m.authorization_servers.as_ref())
        .and_then(|servers| servers.first())
        .cloned()
        .unwrap_or_else(|| server_url.to_string());

    Url::parse(&candidate)
        .map_err(|e| AuthError::Server(format!("invalid authorization server URL {candidate}: {e}")))
}

/// Resolves the resource indicator (RFC 8707): the canonical `resource`
/// value from protected resource metadata when metadata was obtained, or no
/// resource indicator at all when it wasn't — a resource server with no
/// RFC 9728 support gets no `resource` parameter rather than a guess. The
/// provider still gets the final say via [`SessionProvider::validate_resource_url`],
/// which can override or suppress the indicator either way.
async fn select_resource_url(
    protected_resource: Option<&ProtectedResourceMetadata>,
    provider: &dyn SessionProvider,
    authorization_server_url: &str,
) -> AuthResult<Option<String>> {
    let candidate = match protected_resource {
        Some(m) => Some(canonicalize_resource_uri(&m.resource)?),
        None => None,
    };
    provider
        .validate_resource_url(authorization_server_url, candidate.as_deref())
        .await
}

/// Canonicalizes a resource indicator per RFC 8707 §2: lowercases scheme and
/// host, strips the default port for the scheme, and trims a trailing slash
/// unless the path is just `/`.
pub fn canonicalize_resource_uri(resource: &str) -> AuthResult<String> {
    let url = Url::parse(resource)
        .map_err(|e| AuthError::InvalidRequest(format!("invalid resource URI: {e}")))?;

    if url.fragment().is_some() {
        return Err(AuthError::InvalidRequest(
            "resource URI must not contain a fragment".to_string(),
        ));
    }
    let scheme = url.scheme();
    if scheme != "https" && !is_localhost(&url) {
        return Err(AuthError::InvalidRequest(
            "resource URI must use https (or http on localhost)".to_string(),
        ));
    }
    let host = url
        .host_str()
        .ok_or_else(|| AuthError::InvalidRequest("resource URI must have a host".to_string()))?
        .to_ascii_lowercase();

    let default_port = match scheme {
        "https" => Some(443),
        "http" => Some(80),
        _ => None,
    };
    let port_suffix = match url.port() {
        Some(p) if Some(p) != default_port => format!(":{p}"),
        _ => String::new(),
    };

    let path = url.path();
    let trimmed_path = if path != "/" {
        path.trim_end_matches('/')
    } else {
        path
    };

    Ok(format!("{scheme}://{host}{port_suffix}{trimmed_path}"))
}

fn is_localhost(url: &Url) -> bool {
    matches!(url.host_str(), Some("localhost" | "127.0.0.1" | "0.0.0.0" | "::1"))
}

/// Parses a `WWW-Authenticate: Bearer ...` challenge looking for the
/// `resource_metadata` auth-param defined by the MCP authorization spec,
/// used to bypass well-known-URL guessing when the resource server states
/// its metadata location directly.
///
/// This is a simplified, single-space-delimited parser, not a full RFC 7235
/// `auth-param` grammar: it assumes the scheme token is separated from the
/// parameter list by exactly one space and does not handle multiple
/// challenges in one header. That matches what resource servers following
/// the MCP spec actually emit, and is a known, intentional limitation
/// rather than a general-purpose header parser.
pub fn extract_resource_metadata_url(www_authenticate: &str) -> Option<String> {
    let value = www_authenticate.trim();
    let (scheme, rest) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    for part in rest.split(',') {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("resource_metadata=") {
            let unquoted = value.trim_matches('"');
            return Some(unquoted.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalizes_default_port_and_trailing_slash() {
        let canonical = canonicalize_resource_uri("https://Example.com:443/mcp/").unwrap();
        assert_eq!(canonical, "https://example.com/mcp");
    }

    #[test]
    fn keeps_non_default_port() {
        let canonical = canonicalize_resource_uri("https://example.com:8443/mcp").unwrap();
        assert_eq!(canonical, "https://example.com:8443/mcp");
    }

    #[test]
    fn rejects_fragment() {
        assert!(canonicalize_resource_uri("https://example.com/mcp#frag").is_err());
    }

    #[test]
    fn rejects_non_https_non_localhost() {
        assert!(canonicalize_resource_uri("http://example.com/mcp").is_err());
    }

    #[test]
    fn allows_http_localhost() {
        assert!(canonicalize_resource_uri("http://localhost:3000/mcp").is_ok());
    }

    #[test]
    fn extracts_resource_metadata_from_bearer_challenge() {
        let header = r#"Bearer realm="example", resource_metadata="https://res.example.com/.well-known/oauth-protected-resource""#;
        assert_eq!(
            extract_resource_metadata_url(header),
            Some("https://res.example.com/.well-known/oauth-protected-resource".to_string())
        );
    }

    #[test]
    fn ignores_non_bearer_challenge() {
        assert_eq!(extract_resource_metadata_url("Basic realm=\"x\""), None);
    }
}
