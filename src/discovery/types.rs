//! Validation for discovered authorization-server metadata documents.

use thiserror::Error;

use crate::types::{AuthorizationServerMetadata, AuthorizationServerMetadataKind};

/// Errors raised while validating a freshly fetched discovery document.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid issuer: {0}")]
    InvalidIssuer(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("issuer mismatch: document says {document}, expected {expected}")]
    IssuerMismatch { document: String, expected: String },

    #[error("incompatible authorization server: {0}")]
    Incompatible(String),
}

/// Validates a decoded metadata document against RFC 8414 §3.3's minimum
/// requirements, plus an issuer match against the URL that was actually
/// probed: a document claiming to be issued by a different origin than the
/// one queried must be rejected, or a compromised intermediary could redirect
/// discovery to an attacker-controlled authorization server.
pub fn validate(
    metadata: &AuthorizationServerMetadataKind,
    expected_issuer_origin: &str,
) -> Result<(), DiscoveryError> {
    let oauth2 = metadata.as_oauth2();

    if oauth2.issuer.is_empty() {
        return Err(DiscoveryError::MissingField("issuer".to_string()));
    }
    let issuer_url = url::Url::parse(&oauth2.issuer)
        .map_err(|e| DiscoveryError::InvalidIssuer(e.to_string()))?;
    if issuer_url.scheme() != "https" {
        return Err(DiscoveryError::InvalidIssuer(
            "issuer must use https".to_string(),
        ));
    }

    let issuer_origin = format!(
        "{}://{}",
        issuer_url.scheme(),
        issuer_url.host_str().unwrap_or_default()
    );
    if issuer_origin != expected_issuer_origin {
        return Err(DiscoveryError::IssuerMismatch {
            document: issuer_origin,
            expected: expected_issuer_origin.to_string(),
        });
    }

    validate_endpoint_url(&oauth2.authorization_endpoint, "authorization_endpoint")?;
    validate_endpoint_url(&oauth2.token_endpoint, "token_endpoint")?;
    if let Some(registration) = &oauth2.registration_endpoint {
        validate_endpoint_url(registration, "registration_endpoint")?;
    }

    // Checked at discovery time, before any client registration or token
    // request is attempted, so an incompatible server is rejected before the
    // core writes any persistent state.
    if !oauth2.supports_pkce_s256() {
        return Err(DiscoveryError::Incompatible(
            "authorization server does not support S256 PKCE".to_string(),
        ));
    }

    if let AuthorizationServerMetadataKind::Oidc(oidc) = metadata {
        if oidc.subject_types_supported.as_ref().is_none_or(Vec::is_empty) {
            return Err(DiscoveryError::MissingField(
                "subject_types_supported".to_string(),
            ));
        }
        if oidc
            .id_token_signing_alg_values_supported
            .as_ref()
            .is_none_or(Vec::is_empty)
        {
            return Err(DiscoveryError::MissingField(
                "id_token_signing_alg_values_supported".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_endpoint_url(value: &str, field: &str) -> Result<(), DiscoveryError> {
    url::Url::parse(value).map_err(|e| DiscoveryError::InvalidField {
        field: field.to_string(),
        reason: e.to_string(),
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(issuer: &str) -> AuthorizationServerMetadataKind {
        AuthorizationServerMetadataKind::OAuth2(AuthorizationServerMetadata {
            issuer: issuer.to_string(),
            authorization_endpoint: format!("{issuer}/authorize"),
            token_endpoint: format!("{issuer}/token"),
            registration_endpoint: None,
            jwks_uri: None,
            scopes_supported: None,
            response_types_supported: None,
            grant_types_supported: None,
            token_endpoint_auth_methods_supported: None,
            code_challenge_methods_supported: Some(vec!["S256".to_string()]),
            additional_fields: Default::default(),
        })
    }

    #[test]
    fn accepts_matching_https_issuer() {
        let metadata = sample("https://auth.example.com");
        assert!(validate(&metadata, "https://auth.example.com").is_ok());
    }

    #[test]
    fn rejects_http_issuer() {
        let metadata = sample("http://auth.example.com");
        assert!(matches!(
            validate(&metadata, "http://auth.example.com"),
            Err(DiscoveryError::InvalidIssuer(_))
        ));
    }

    #[test]
    fn rejects_issuer_mismatch() {
        let metadata = sample("https://auth.example.com");
        assert!(matches!(
            validate(&metadata, "https://evil.example.com"),
            Err(DiscoveryError::IssuerMismatch { .. })
        ));
    }

    #[test]
    fn rejects_server_that_does_not_support_s256() {
        let mut oauth2 = match sample("https://auth.example.com") {
            AuthorizationServerMetadataKind::OAuth2(m) => m,
            AuthorizationServerMetadataKind::Oidc(_) => unreachable!(),
        };
        oauth2.code_challenge_methods_supported = Some(vec!["plain".to_string()]);
        let metadata = AuthorizationServerMetadataKind::OAuth2(oauth2);
        assert!(matches!(
            validate(&metadata, "https://auth.example.com"),
            Err(DiscoveryError::Incompatible(_))
        ));
    }

    #[test]
    fn accepts_server_with_absent_code_challenge_methods() {
        let mut oauth2 = match sample("https://auth.example.com") {
            AuthorizationServerMetadataKind::OAuth2(m) => m,
            AuthorizationServerMetadataKind::Oidc(_) => unreachable!(),
        };
        oauth2.code_challenge_methods_supported = None;
        let metadata = AuthorizationServerMetadataKind::OAuth2(oauth2);
        assert!(validate(&metadata, "https://auth.example.com").is_ok());
    }
}
