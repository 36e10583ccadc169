//! Fetches and validates protected-resource and authorization-server
//! metadata documents over the injected transport.

use tracing::{debug, warn};
use url::Url;

use super::types;
use super::url_builder::{authorization_server_candidates, protected_resource_candidates};
use crate::error::{AuthError, AuthResult};
use crate::transport::{HttpRequest, HttpResponse, RequestFn, TransportError};
use crate::types::{AuthorizationServerMetadataKind, OidcProviderMetadata, ProtectedResourceMetadata};

/// Outcome of probing a single candidate URL, used to decide whether the
/// fetcher should keep trying the remaining candidates or give up.
enum ProbeOutcome<T> {
    Found(T),
    /// 404, or any other 4xx not worth stopping for — try the next candidate.
    Absent,
    /// Transport failure or 5xx — stop and surface immediately.
    Fatal(AuthError),
}

/// Fetches RFC 9728 protected resource metadata, trying the path-aware
/// well-known URL first and falling back to the origin root.
pub async fn fetch_protected_resource_metadata(
    transport: &RequestFn,
    resource_url: &Url,
) -> AuthResult<ProtectedResourceMetadata> {
    let candidates = protected_resource_candidates(resource_url);
    for (i, candidate) in candidates.iter().enumerate() {
        debug!("trying protected resource metadata candidate: {candidate}");
        match probe_json::<ProtectedResourceMetadata>(transport, candidate).await {
            ProbeOutcome::Found(metadata) => return Ok(metadata),
            ProbeOutcome::Absent if i + 1 < candidates.len() => continue,
            ProbeOutcome::Absent => {
                return Err(AuthError::Server(format!(
                    "no protected resource metadata found for {resource_url}"
                )));
            }
            ProbeOutcome::Fatal(e) => return Err(e),
        }
    }
    Err(AuthError::Server(format!(
        "no protected resource metadata found for {resource_url}"
    )))
}

/// Fetches RFC 9728 protected resource metadata from an exact URL, skipping
/// well-known candidate construction entirely. Used when a `WWW-Authenticate`
/// challenge (or caller-supplied override) already names the metadata
/// document's location — see [`crate::orchestrator::extract_resource_metadata_url`].
pub async fn fetch_protected_resource_metadata_at(
    transport: &RequestFn,
    url: &Url,
) -> AuthResult<ProtectedResourceMetadata> {
    match probe_json::<ProtectedResourceMetadata>(transport, url.as_str()).await {
        ProbeOutcome::Found(metadata) => Ok(metadata),
        ProbeOutcome::Absent => Err(AuthError::Server(format!(
            "no protected resource metadata found at {url}"
        ))),
        ProbeOutcome::Fatal(e) => Err(e),
    }
}

/// Fetches authorization server metadata, trying RFC 8414 and OIDC Discovery
/// 1.0 candidate URLs in priority order.
pub async fn fetch_authorization_server_metadata(
    transport: &RequestFn,
    issuer_url: &Url,
) -> AuthResult<AuthorizationServerMetadataKind> {
    let candidates = authorization_server_candidates(issuer_url);
    let expected_origin = format!(
        "{}://{}",
        issuer_url.scheme(),
        issuer_url.host_str().unwrap_or_default()
    );

    let mut last_invalid: Option<AuthError> = None;
    for candidate in &candidates {
        debug!("trying authorization server metadata candidate: {candidate}");
        let is_oidc_candidate = candidate.contains("openid-configuration");
        let outcome = if is_oidc_candidate {
            probe_json::<OidcProviderMetadata>(transport, candidate)
                .await
                .map_found(AuthorizationServerMetadataKind::Oidc)
        } else {
            probe_json(transport, candidate)
                .await
                .map_found(AuthorizationServerMetadataKind::OAuth2)
        };

        match outcome {
            ProbeOutcome::Found(metadata) => {
                match types::validate(&metadata, &expected_origin) {
                    Ok(()) => return Ok(metadata),
                    Err(e) => {
                        warn!("discovered metadata at {candidate} failed validation: {e}");
                        last_invalid = Some(AuthError::Server(e.to_string()));
                        continue;
                    }
                }
            }
            ProbeOutcome::Absent => continue,
            // A transport failure or non-4xx status is fatal: it stops
            // discovery immediately rather than letting a lower-priority
            // candidate silently paper over it.
            ProbeOutcome::Fatal(e) => return Err(e),
        }
    }

    warn!("all authorization server discovery candidates failed for {issuer_url}");
    Err(last_invalid.unwrap_or_else(|| {
        AuthError::Server(format!(
            "could not discover authorization server metadata for {issuer_url}"
        ))
    }))
}

impl<T> ProbeOutcome<T> {
    fn map_found<U>(self, f: impl FnOnce(T) -> U) -> ProbeOutcome<U> {
        match self {
            ProbeOutcome::Found(v) => ProbeOutcome::Found(f(v)),
            ProbeOutcome::Absent => ProbeOutcome::Absent,
            ProbeOutcome::Fatal(e) => ProbeOutcome::Fatal(e),
        }
    }
}

async fn probe_json<T: serde::de::DeserializeOwned>(
    transport: &RequestFn,
    url: &str,
) -> ProbeOutcome<T> {
    let response = match fetch_with_cors_retry(transport, url).await {
        Ok(r) => r,
        Err(e) => return ProbeOutcome::Fatal(AuthError::Network(e.to_string())),
    };

    classify_and_parse(response)
}

fn classify_and_parse<T: serde::de::DeserializeOwned>(response: HttpResponse) -> ProbeOutcome<T> {
    if response.status == 404 {
        return ProbeOutcome::Absent;
    }
    if response.body.len() > crate::config::AuthCoreConfig::default().max_metadata_response_bytes {
        return ProbeOutcome::Fatal(AuthError::Server("discovery response exceeded size limit".to_string()));
    }
    if response.is_success() {
        return match response.json::<T>() {
            Ok(metadata) => ProbeOutcome::Found(metadata),
            Err(e) => ProbeOutcome::Fatal(AuthError::Server(format!("invalid metadata JSON: {e}"))),
        };
    }
    if (400..500).contains(&response.status) {
        return ProbeOutcome::Absent;
    }
    ProbeOutcome::Fatal(AuthError::Server(format!(
        "discovery endpoint returned status {}",
        response.status
    )))
}

/// Issues a GET request with an `Accept: application/json` header; if the
/// transport reports failure (the embedder's typical signal for a
/// browser-environment CORS rejection) retries once with no extra headers,
/// since some resource servers only allow simple, unpreflighted requests.
async fn fetch_with_cors_retry(
    transport: &RequestFn,
    url: &str,
) -> Result<HttpResponse, TransportError> {
    let request = HttpRequest::get(url).with_header("Accept", "application/json");
    match transport(request).await {
        Ok(response) => Ok(response),
        Err(first_error) => {
            debug!("first fetch of {url} failed ({first_error}); retrying without extra headers");
            transport(HttpRequest::get(url)).await.map_err(|_| first_error)
        }
    }
}
