//! Client authentication method selection: deciding how the client proves
//! its identity on a token-endpoint request, and applying that decision to
//! an outgoing request.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use secrecy::ExposeSecret;
use secrecy::SecretString;

/// The method selected for a given token request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientAuthMethod {
    /// `Authorization: Basic base64(client_id:client_secret)`.
    Basic,
    /// `client_id`/`client_secret` as form body parameters.
    Post,
    /// No client secret is sent (public client, or the server issued none).
    None,
}

/// Selects a client authentication method for a confidential or public
/// client, given what the authorization server advertises.
///
/// Rules:
/// - No secret on file → always [`ClientAuthMethod::None`], regardless of
///   what the server supports (there is nothing to authenticate with).
/// - A secret on file, and the server's `token_endpoint_auth_methods_supported`
///   is absent → [`ClientAuthMethod::Post`], the RFC 6749 default.
/// - A secret on file, and the server's list is present → [`ClientAuthMethod::Basic`]
///   if `client_secret_basic` appears in the list; otherwise
///   [`ClientAuthMethod::Post`], whether or not `client_secret_post` is named
///   explicitly — the RFC 6749 default the client falls back to even against
///   a list that names neither method.
pub fn select_auth_method(
    has_client_secret: bool,
    server_supported_methods: Option<&[String]>,
) -> ClientAuthMethod {
    if !has_client_secret {
        return ClientAuthMethod::None;
    }

    match server_supported_methods {
        None => ClientAuthMethod::Post,
        Some(methods) => {
            if methods.iter().any(|m| m == "client_secret_basic") {
                ClientAuthMethod::Basic
            } else {
                ClientAuthMethod::Post
            }
        }
    }
}

/// Applies the selected method to an outgoing token request's headers and
/// form parameters. `client_id` is always included as a parameter per
/// RFC 6749 §3.2.1, even under `Basic`, so the server can disambiguate
/// requests that omit it from the Authorization header.
pub fn apply_auth_method(
    method: ClientAuthMethod,
    client_id: &str,
    client_secret: Option<&SecretString>,
    headers: &mut Vec<(String, String)>,
    params: &mut Vec<(String, String)>,
) {
    params.push(("client_id".to_string(), client_id.to_string()));

    match method {
        ClientAuthMethod::Basic => {
            if let Some(secret) = client_secret {
                let credentials = format!("{client_id}:{}", secret.expose_secret());
                let encoded = BASE64_STANDARD.encode(credentials);
                headers.push(("Authorization".to_string(), format!("Basic {encoded}")));
            }
        }
        ClientAuthMethod::Post => {
            if let Some(secret) = client_secret {
                params.push(("client_secret".to_string(), secret.expose_secret().to_string()));
            }
        }
        ClientAuthMethod::None => {}
    }
}
