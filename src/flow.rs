//! Flow primitives: the four wire-level operations the orchestrator
//! composes into a full authorization — building the authorization URL,
//! exchanging a code, refreshing a token pair, and dynamic client
//! registration. None of these hold state; every input comes from the
//! caller and every output is handed back for the caller to persist.

use url::Url;

use crate::client_auth;
use crate::error::{AuthError, AuthResult};
use crate::pkce::{generate_pkce_pair, PkcePair};
use crate::provider::SessionProvider;
use crate::transport::{HttpRequest, RequestFn};
use crate::types::{
    AuthorizationServerMetadata, ClientInformationFull, ClientMetadata, OAuthErrorResponse, OAuthTokens,
};

/// The result of [`start_authorization`]: the URL to send the user-agent to,
/// and the PKCE verifier the caller must persist until the callback arrives.
#[derive(Debug, Clone)]
pub struct AuthorizationStart {
    pub authorization_url: String,
    pub code_verifier: String,
}

/// Builds the authorization request URL and generates a fresh PKCE pair.
///
/// Query parameters are emitted in a fixed order — `response_type`,
/// `client_id`, `code_challenge`, `code_challenge_method`, `redirect_uri`,
/// then `state`/`scope`/`prompt`/`resource` — matching what resource servers
/// that parse query strings positionally (rather than as a true map) expect.
///
/// Discovery already validated that the authorization server supports S256
/// PKCE before this function is ever reached, so no capability check happens
/// here.
pub fn start_authorization(
    metadata: &AuthorizationServerMetadata,
    client_id: &str,
    redirect_uri: &str,
    state: Option<&str>,
    scope: Option<&str>,
    resource: Option<&str>,
) -> AuthResult<AuthorizationStart> {
    let PkcePair {
        code_verifier,
        code_challenge,
    } = generate_pkce_pair();

    let mut url = Url::parse(&metadata.authorization_endpoint)
        .map_err(|e| AuthError::InvalidRequest(format!("invalid authorization_endpoint: {e}")))?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("response_type", "code");
        query.append_pair("client_id", client_id);
        query.append_pair("code_challenge", &code_challenge);
        query.append_pair("code_challenge_method", "S256");
        query.append_pair("redirect_uri", redirect_uri);
        if let Some(state) = state {
            query.append_pair("state", state);
        }
        if let Some(scope) = scope {
            query.append_pair("scope", scope);
            // Requesting offline access forces a fresh consent screen, so a
            // server that only issues refresh tokens on explicit consent
            // still issues one on this request.
            if scope.split_whitespace().any(|s| s == "offline_access") {
                query.append_pair("prompt", "consent");
            }
        }
        if let Some(resource) = resource {
            query.append_pair("resource", resource);
        }
    }

    Ok(AuthorizationStart {
        authorization_url: url.to_string(),
        code_verifier,
    })
}

/// Exchanges an authorization code for a token pair (RFC 6749 §4.1.3,
/// with the RFC 7636 `code_verifier` and optional RFC 8707 `resource`).
pub async fn exchange_authorization(
    transport: &RequestFn,
    metadata: &AuthorizationServerMetadata,
    client: &ClientInformationFull,
    code: &str,
    code_verifier: &str,
    redirect_uri: &str,
    resource: Option<&str>,
    provider: &dyn SessionProvider,
) -> AuthResult<OAuthTokens> {
    let mut params = vec![
        ("grant_type".to_string(), "authorization_code".to_string()),
        ("code".to_string(), code.to_string()),
        ("code_verifier".to_string(), code_verifier.to_string()),
        ("redirect_uri".to_string(), redirect_uri.to_string()),
    ];
    if let Some(resource) = resource {
        params.push(("resource".to_string(), resource.to_string()));
    }

    post_token_request(transport, metadata, client, params, provider).await
}

/// Refreshes a token pair (RFC 6749 §6), preserving the existing refresh
/// token when the server's response omits a new one (refresh-token
/// rotation is optional; servers that don't rotate expect the old token to
/// remain valid).
pub async fn refresh_authorization(
    transport: &RequestFn,
    metadata: &AuthorizationServerMetadata,
    client: &ClientInformationFull,
    refresh_token: &str,
    scope: Option<&str>,
    resource: Option<&str>,
    provider: &dyn SessionProvider,
) -> AuthResult<OAuthTokens> {
    let mut params = vec![
        ("grant_type".to_string(), "refresh_token".to_string()),
        ("refresh_token".to_string(), refresh_token.to_string()),
    ];
    if let Some(scope) = scope {
        params.push(("scope".to_string(), scope.to_string()));
    }
    if let Some(resource) = resource {
        params.push(("resource".to_string(), resource.to_string()));
    }

    let mut tokens = post_token_request(transport, metadata, client, params, provider).await?;
    if tokens.refresh_token.is_none() {
        tokens.refresh_token = Some(refresh_token.to_string());
    }
    Ok(tokens)
}

/// Dynamically registers a client (RFC 7591).
pub async fn register_client(
    transport: &RequestFn,
    registration_endpoint: &str,
    metadata: &ClientMetadata,
) -> AuthResult<ClientInformationFull> {
    let body = serde_json::to_vec(metadata)
        .map_err(|e| AuthError::InvalidRequest(format!("invalid client metadata: {e}")))?;

    let request = HttpRequest::post(registration_endpoint, body)
        .with_header("Content-Type", "application/json")
        .with_header("Accept", "application/json");

    let response = transport(request)
        .await
        .map_err(|e| AuthError::Network(e.to_string()))?;

    if !response.is_success() {
        return Err(parse_error_response(response.status, &response.body));
    }

    response
        .json::<ClientInformationFull>()
        .map_err(|e| AuthError::Server(format!("invalid registration response: {e}")))
}

async fn post_token_request(
    transport: &RequestFn,
    metadata: &AuthorizationServerMetadata,
    client: &ClientInformationFull,
    mut params: Vec<(String, String)>,
    provider: &dyn SessionProvider,
) -> AuthResult<OAuthTokens> {
    let mut headers = vec![(
        "Content-Type".to_string(),
        "application/x-www-form-urlencoded".to_string(),
    )];

    if provider.has_custom_client_authentication() {
        provider
            .add_client_authentication(&mut headers, &mut params, &metadata.token_endpoint)
            .await?;
    } else {
        let method = client_auth::select_auth_method(
            client.client_secret.is_some(),
            metadata.token_endpoint_auth_methods_supported.as_deref(),
        );
        client_auth::apply_auth_method(
            method,
            &client.client_id,
            client.client_secret.as_ref(),
            &mut headers,
            &mut params,
        );
    }

    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(&params)
        .finish()
        .into_bytes();

    let mut request = HttpRequest::post(&metadata.token_endpoint, body);
    request.headers = headers;

    let response = transport(request)
        .await
        .map_err(|e| AuthError::Network(e.to_string()))?;

    if !response.is_success() {
        return Err(parse_error_response(response.status, &response.body));
    }

    response
        .json::<OAuthTokens>()
        .map_err(|e| AuthError::Server(format!("invalid token response: {e}")))
}

/// Maps a non-2xx token/registration response onto the error taxonomy,
/// decoding an RFC 6749 §5.2 error body when present and falling back to a
/// generic classification by status code otherwise.
fn parse_error_response(status: u16, body: &[u8]) -> AuthError {
    if let Ok(error_response) = serde_json::from_slice::<OAuthErrorResponse>(body) {
        return AuthError::from_oauth_error(&error_response.error, error_response.error_description.as_deref());
    }
    match status {
        401 => AuthError::Unauthorized(format!("status {status} with no parseable error body")),
        400..=499 => AuthError::InvalidRequest(format!("status {status} with no parseable error body")),
        _ => AuthError::Server(format!("status {status} with no parseable error body")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metadata() -> AuthorizationServerMetadata {
        AuthorizationServerMetadata {
            issuer: "https://auth.example.com".to_string(),
            authorization_endpoint: "https://auth.example.com/authorize".to_string(),
            token_endpoint: "https://auth.example.com/token".to_string(),
            registration_endpoint: Some("https://auth.example.com/register".to_string()),
            jwks_uri: None,
            scopes_supported: None,
            response_types_supported: None,
            grant_types_supported: None,
            token_endpoint_auth_methods_supported: None,
            code_challenge_methods_supported: Some(vec!["S256".to_string()]),
            additional_fields: Default::default(),
        }
    }

    #[test]
    fn authorization_url_has_params_in_order() {
        let metadata = sample_metadata();
        let start = start_authorization(
            &metadata,
            "client-1",
            "http://localhost/callback",
            Some("xyz"),
            Some("read"),
            Some("https://res.example.com/mcp"),
        )
        .unwrap();

        let url = Url::parse(&start.authorization_url).unwrap();
        let keys: Vec<_> = url.query_pairs().map(|(k, _)| k.to_string()).collect();
        assert_eq!(
            keys,
            vec![
                "response_type",
                "client_id",
                "code_challenge",
                "code_challenge_method",
                "redirect_uri",
                "state",
                "scope",
                "resource",
            ]
        );
        assert!(!start.code_verifier.is_empty());
    }

    #[test]
    fn offline_access_scope_appends_prompt_consent() {
        let metadata = sample_metadata();
        let start = start_authorization(
            &metadata,
            "client-1",
            "http://localhost/callback",
            None,
            Some("read offline_access"),
            None,
        )
        .unwrap();

        let url = Url::parse(&start.authorization_url).unwrap();
        let keys: Vec<_> = url.query_pairs().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys.last().map(String::as_str), Some("prompt"));
        assert_eq!(
            url.query_pairs().find(|(k, _)| k == "prompt").map(|(_, v)| v.to_string()),
            Some("consent".to_string())
        );
    }

    #[test]
    fn scope_without_offline_access_has_no_prompt_param() {
        let metadata = sample_metadata();
        let start =
            start_authorization(&metadata, "client-1", "http://localhost/callback", None, Some("read"), None)
                .unwrap();
        assert!(!start.authorization_url.contains("prompt="));
    }

    #[test]
    fn parse_error_response_maps_known_codes() {
        let body = br#"{"error":"invalid_grant","error_description":"expired"}"#;
        let err = parse_error_response(400, body);
        assert!(matches!(err, AuthError::InvalidGrant(_)));
    }

    #[test]
    fn parse_error_response_falls_back_by_status() {
        let err = parse_error_response(401, b"not json");
        assert!(matches!(err, AuthError::Unauthorized(_)));
        let err = parse_error_response(503, b"not json");
        assert!(matches!(err, AuthError::Server(_)));
    }
}
