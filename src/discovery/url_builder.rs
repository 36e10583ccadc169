//! Candidate well-known URL construction for protected-resource and
//! authorization-server metadata discovery.
//!
//! Every function here is pure and synchronous — it only builds the ordered
//! list of URLs to probe. [`super::fetcher`] is what actually walks the
//! list and makes requests.

use url::Url;

/// Builds the ordered candidate list for RFC 9728 protected resource
/// metadata discovery: path-aware first, root fallback second.
///
/// For `https://res.example.com/mcp`, returns:
/// `["https://res.example.com/.well-known/oauth-protected-resource/mcp",
///   "https://res.example.com/.well-known/oauth-protected-resource"]`
///
/// For a root URL, returns a single entry.
pub fn protected_resource_candidates(resource_url: &Url) -> Vec<String> {
    let origin = origin_of(resource_url);
    let path = clean_path(resource_url);

    if path.is_empty() {
        return vec![format!("{origin}/.well-known/oauth-protected-resource")];
    }

    vec![
        format!("{origin}/.well-known/oauth-protected-resource{path}"),
        format!("{origin}/.well-known/oauth-protected-resource"),
    ]
}

/// Builds the ordered candidate list for authorization server metadata
/// discovery, covering both RFC 8414 and OpenID Connect Discovery 1.0.
///
/// For a root authorization server URL, returns the 2-entry list:
/// `[.well-known/oauth-authorization-server, .well-known/openid-configuration]`.
///
/// For a path-bearing URL (e.g. an AS hosted under a sub-path), returns the
/// 4-entry list covering both the RFC 8414 well-known-insertion convention
/// and the OIDC Discovery 1.0 well-known-suffix convention, in strict
/// priority order so the first successful fetch wins:
/// `[.well-known/oauth-authorization-server{path},
///   .well-known/oauth-authorization-server` (bare root),
///   `.well-known/openid-configuration{path},
///   {path}/.well-known/openid-configuration]`.
///
/// The root OAuth2 fallback is tried second, ahead of either OIDC
/// candidate — a path-scoped RFC 8414 document always outranks an OIDC
/// document, even one scoped to the same path.
pub fn authorization_server_candidates(issuer_url: &Url) -> Vec<String> {
    let origin = origin_of(issuer_url);
    let path = clean_path(issuer_url);

    if path.is_empty() {
        return vec![
            format!("{origin}/.well-known/oauth-authorization-server"),
            format!("{origin}/.well-known/openid-configuration"),
        ];
    }

    vec![
        format!("{origin}/.well-known/oauth-authorization-server{path}"),
        format!("{origin}/.well-known/oauth-authorization-server"),
        format!("{origin}/.well-known/openid-configuration{path}"),
        format!("{origin}{path}/.well-known/openid-configuration"),
    ]
}

fn origin_of(url: &Url) -> String {
    format!(
        "{}://{}",
        url.scheme(),
        url.host_str().unwrap_or("localhost")
    )
}

fn clean_path(url: &Url) -> String {
    let path = url.path();
    if path == "/" || path.is_empty() {
        String::new()
    } else {
        path.trim_end_matches('/').to_string()
    }
}
