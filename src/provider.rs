//! The session-provider capability trait: the sole owner of mutable state
//! in this crate. The orchestrator never holds state of its own — every
//! read or write of client info, tokens, or the PKCE verifier goes through
//! a [`SessionProvider`] implementation the embedder supplies.

use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{AuthError, AuthResult};
use crate::types::{ClientInformationFull, ClientMetadata, OAuthTokens};

/// Generates a fresh CSRF `state` value, for [`SessionProvider::state`]
/// implementations that don't already have a session identifier to reuse.
pub fn generate_state() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Which stored credentials to clear after the orchestrator decides they are
/// no longer trustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationScope {
    /// Clear client registration, tokens, and the PKCE verifier.
    All,
    /// Clear only the registered client (forces re-registration).
    Client,
    /// Clear only the token pair (forces a fresh authorization).
    Tokens,
    /// Clear only the in-flight PKCE verifier.
    Verifier,
}

/// Everything the orchestrator needs from the embedding application to
/// drive a full OAuth 2.1 flow: persistent storage for client registration
/// and tokens, a way to stash the PKCE verifier between the redirect and the
/// callback, and a way to hand control to the user-agent.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// The redirect URI registered for this client, or `None` for
    /// non-interactive flows that never redirect a user-agent.
    fn redirect_url(&self) -> Option<&str>;

    /// The metadata this client would register with, if dynamic
    /// registration is needed.
    fn client_metadata(&self) -> &ClientMetadata;

    /// Generates an opaque `state` value for CSRF protection on the next
    /// authorization redirect. Returning `None` omits the parameter
    /// entirely, which most servers accept but which weakens CSRF defenses.
    async fn state(&self) -> Option<String> {
        None
    }

    /// Loads previously registered client information, if any.
    async fn client_information(&self) -> Option<ClientInformationFull>;

    /// Persists client information obtained via dynamic registration.
    async fn save_client_information(&self, info: ClientInformationFull) -> AuthResult<()>;

    /// Loads the current token pair, if any.
    async fn tokens(&self) -> Option<OAuthTokens>;

    /// Persists a new or refreshed token pair.
    async fn save_tokens(&self, tokens: OAuthTokens) -> AuthResult<()>;

    /// Hands the authorization URL to the user-agent. For a CLI this might
    /// open a browser; for a web app it is usually an HTTP redirect.
    async fn redirect_to_authorization(&self, url: &str) -> AuthResult<()>;

    /// Persists the PKCE code verifier generated for the in-flight
    /// authorization request, to be retrieved once the callback arrives.
    async fn save_code_verifier(&self, verifier: String) -> AuthResult<()>;

    /// Loads the PKCE code verifier saved by [`Self::save_code_verifier`].
    async fn code_verifier(&self) -> AuthResult<String>;

    /// Clears the credentials named by `scope`. Called by the orchestrator's
    /// one-shot recovery retry after `invalid_client`/`unauthorized_client`
    /// (scope `All`) or `invalid_grant` (scope `Tokens`).
    async fn invalidate_credentials(&self, scope: InvalidationScope) -> AuthResult<()> {
        let _ = scope;
        Ok(())
    }

    /// Lets the embedder fully replace the standard
    /// `client_secret_basic`/`client_secret_post`/`none` method selection,
    /// e.g. with a signed JWT assertion. Only called when
    /// [`Self::has_custom_client_authentication`] returns `true`; otherwise
    /// [`crate::client_auth`] handles the token request unassisted.
    async fn add_client_authentication(
        &self,
        _headers: &mut Vec<(String, String)>,
        _params: &mut Vec<(String, String)>,
        _token_endpoint: &str,
    ) -> AuthResult<()> {
        Ok(())
    }

    /// Whether [`Self::add_client_authentication`] fully replaces the
    /// standard client authentication method selector. When `true`, the
    /// token request delegates to it entirely and [`crate::client_auth`] is
    /// skipped, including its unconditional `client_id` parameter — the
    /// callback is responsible for adding it if the chosen method needs it.
    fn has_custom_client_authentication(&self) -> bool {
        false
    }

    /// Lets the embedder override the resource indicator the orchestrator computes,
    /// e.g. to pin a specific audience. Returning `Ok(resource)` unchanged
    /// (the default) accepts the core's own selection.
    async fn validate_resource_url(
        &self,
        _authorization_server_url: &str,
        resource: Option<&str>,
    ) -> AuthResult<Option<String>> {
        Ok(resource.map(str::to_string))
    }
}

/// A reference [`SessionProvider`] backed by in-process `RwLock`s, useful
/// for tests and for embedders that don't need durability across restarts.
pub struct InMemorySessionProvider {
    redirect_url: Option<String>,
    client_metadata: ClientMetadata,
    client_info: RwLock<Option<ClientInformationFull>>,
    tokens: RwLock<Option<OAuthTokens>>,
    code_verifier: RwLock<Option<String>>,
    last_authorization_url: RwLock<Option<String>>,
}

impl InMemorySessionProvider {
    /// Creates a provider with no pre-existing client registration or tokens.
    pub fn new(redirect_url: Option<String>, client_metadata: ClientMetadata) -> Self {
        Self {
            redirect_url,
            client_metadata,
            client_info: RwLock::new(None),
            tokens: RwLock::new(None),
            code_verifier: RwLock::new(None),
            last_authorization_url: RwLock::new(None),
        }
    }

    /// Seeds the provider with an already-registered client, skipping
    /// dynamic registration on the next [`crate::orchestrator::auth`] call.
    pub fn with_client_information(self, info: ClientInformationFull) -> Self {
        *self.client_info.write().unwrap() = Some(info);
        self
    }

    /// Returns the most recent URL passed to [`SessionProvider::redirect_to_authorization`],
    /// for tests that need to inspect or follow it.
    pub fn last_authorization_url(&self) -> Option<String> {
        self.last_authorization_url.read().unwrap().clone()
    }
}

#[async_trait]
impl SessionProvider for InMemorySessionProvider {
    fn redirect_url(&self) -> Option<&str> {
        self.redirect_url.as_deref()
    }

    fn client_metadata(&self) -> &ClientMetadata {
        &self.client_metadata
    }

    async fn state(&self) -> Option<String> {
        Some(generate_state())
    }

    async fn client_information(&self) -> Option<ClientInformationFull> {
        self.client_info.read().unwrap().clone()
    }

    async fn save_client_information(&self, info: ClientInformationFull) -> AuthResult<()> {
        *self.client_info.write().unwrap() = Some(info);
        Ok(())
    }

    async fn tokens(&self) -> Option<OAuthTokens> {
        self.tokens.read().unwrap().clone()
    }

    async fn save_tokens(&self, tokens: OAuthTokens) -> AuthResult<()> {
        *self.tokens.write().unwrap() = Some(tokens);
        Ok(())
    }

    async fn redirect_to_authorization(&self, url: &str) -> AuthResult<()> {
        *self.last_authorization_url.write().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn save_code_verifier(&self, verifier: String) -> AuthResult<()> {
        *self.code_verifier.write().unwrap() = Some(verifier);
        Ok(())
    }

    async fn code_verifier(&self) -> AuthResult<String> {
        self.code_verifier
            .read()
            .unwrap()
            .clone()
            .ok_or_else(|| AuthError::Storage("no code verifier saved".to_string()))
    }

    async fn invalidate_credentials(&self, scope: InvalidationScope) -> AuthResult<()> {
        match scope {
            InvalidationScope::All => {
                *self.client_info.write().unwrap() = None;
                *self.tokens.write().unwrap() = None;
                *self.code_verifier.write().unwrap() = None;
            }
            InvalidationScope::Client => *self.client_info.write().unwrap() = None,
            InvalidationScope::Tokens => *self.tokens.write().unwrap() = None,
            InvalidationScope::Verifier => *self.code_verifier.write().unwrap() = None,
        }
        Ok(())
    }
}
