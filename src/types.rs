//! Wire-format data model: the JSON structures exchanged with authorization
//! servers and protected resources.
//!
//! Every struct here keeps a `#[serde(flatten)] additional_fields` catch-all
//! so that server extensions the client doesn't model explicitly survive a
//! decode/re-encode round trip rather than being silently dropped.

use std::collections::HashMap;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// RFC 7591 client registration request / registered client metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientMetadata {
    pub redirect_uris: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_types: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub additional_fields: HashMap<String, Value>,
}

/// The identity half of RFC 7591's registration response: what the server
/// hands back that the client must persist to authenticate on future
/// requests, minus the one-time `client_secret`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInformation {
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id_issued_at: Option<u64>,
    #[serde(flatten)]
    pub additional_fields: HashMap<String, Value>,
}

/// The full registration response, including the client secret when the
/// server issued one (confidential clients only).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInformationFull {
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id_issued_at: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<SecretString>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret_expires_at: Option<u64>,
    #[serde(flatten)]
    pub additional_fields: HashMap<String, Value>,
}

impl ClientInformationFull {
    /// Drops the secret, producing the plain [`ClientInformation`] view used
    /// once the client has finished authenticating a request.
    pub fn without_secret(&self) -> ClientInformation {
        ClientInformation {
            client_id: self.client_id.clone(),
            client_id_issued_at: self.client_id_issued_at,
            additional_fields: self.additional_fields.clone(),
        }
    }
}

/// An access/refresh token pair returned by the token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub token_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// RFC 8414 authorization server metadata (also the OAuth2 half of an OIDC
/// discovery document, via [`OidcProviderMetadata::oauth2`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationServerMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_types_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grant_types_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_methods_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_methods_supported: Option<Vec<String>>,
    #[serde(flatten)]
    pub additional_fields: HashMap<String, Value>,
}

impl AuthorizationServerMetadata {
    /// Whether the server advertises S256 PKCE support; absence of the
    /// `code_challenge_methods_supported` field is treated as "unknown, so
    /// still attempt it" rather than an outright rejection.
    pub fn supports_pkce_s256(&self) -> bool {
        self.code_challenge_methods_supported
            .as_ref()
            .is_none_or(|methods| methods.iter().any(|m| m == "S256"))
    }

    pub fn grant_types(&self) -> Vec<&str> {
        self.grant_types_supported
            .as_ref()
            .map(|gts| gts.iter().map(String::as_str).collect())
            .unwrap_or_else(|| vec!["authorization_code"])
    }
}

/// The OIDC-specific fields layered on top of an OAuth2 authorization server
/// metadata document, per OpenID Connect Discovery 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OidcProviderMetadata {
    #[serde(flatten)]
    pub oauth2: AuthorizationServerMetadata,
    pub userinfo_endpoint: Option<String>,
    pub subject_types_supported: Option<Vec<String>>,
    pub id_token_signing_alg_values_supported: Option<Vec<String>>,
}

/// Which discovery document flavor the metadata fetcher landed on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AuthorizationServerMetadataKind {
    OAuth2(AuthorizationServerMetadata),
    Oidc(OidcProviderMetadata),
}

impl AuthorizationServerMetadataKind {
    /// The OAuth2-shaped view, regardless of which flavor was discovered.
    pub fn as_oauth2(&self) -> &AuthorizationServerMetadata {
        match self {
            Self::OAuth2(m) => m,
            Self::Oidc(m) => &m.oauth2,
        }
    }
}

/// RFC 9728 protected resource metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedResourceMetadata {
    pub resource: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_servers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bearer_methods_supported: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes_supported: Option<Vec<String>>,
    #[serde(flatten)]
    pub additional_fields: HashMap<String, Value>,
}

/// An RFC 6749 §5.2 error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}
