//! Scenario-level integration tests exercising the orchestrator end to end
//! against a scripted mock transport, covering fresh authorization, code
//! exchange, refresh with rotation omitted, invalid-grant recovery, explicit
//! resource-metadata-url bypass, a resource server with no RFC 9728 support,
//! a custom client authenticator, and S256-unsupported rejection.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use mcp_auth_core::orchestrator::{self, AuthOptions, AuthOutcome};
use mcp_auth_core::provider::{InMemorySessionProvider, InvalidationScope, SessionProvider};
use mcp_auth_core::transport::{HttpRequest, HttpResponse, RequestFn};
use mcp_auth_core::types::{ClientInformationFull, ClientMetadata, OAuthTokens};
use mcp_auth_core::AuthError;
use mcp_auth_core::AuthResult;

fn make_transport<F>(handler: F) -> RequestFn
where
    F: Fn(&HttpRequest) -> (u16, String) + Send + Sync + 'static,
{
    let handler = Arc::new(handler);
    Arc::new(move |req: HttpRequest| {
        let handler = handler.clone();
        Box::pin(async move {
            let (status, body) = handler(&req);
            Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body: body.into_bytes(),
            })
        })
    })
}

fn form_body(body: &Option<Vec<u8>>) -> HashMap<String, String> {
    let bytes = body.as_deref().unwrap_or_default();
    url::form_urlencoded::parse(bytes)
        .into_owned()
        .collect()
}

fn as_metadata_json(code_challenge_methods: &str) -> String {
    format!(
        r#"{{"issuer":"https://auth.example.com","authorization_endpoint":"https://auth.example.com/authorize","token_endpoint":"https://auth.example.com/token","registration_endpoint":"https://auth.example.com/register","code_challenge_methods_supported":[{code_challenge_methods}]}}"#
    )
}

fn resource_metadata_json() -> String {
    r#"{"resource":"https://res.example.com/mcp","authorization_servers":["https://auth.example.com"]}"#.to_string()
}

fn client_metadata() -> ClientMetadata {
    ClientMetadata {
        redirect_uris: vec!["http://localhost:8080/callback".to_string()],
        client_name: Some("test client".to_string()),
        ..Default::default()
    }
}

fn registered_client() -> ClientInformationFull {
    ClientInformationFull {
        client_id: "client-abc".to_string(),
        client_id_issued_at: None,
        client_secret: None,
        client_secret_expires_at: None,
        additional_fields: Default::default(),
    }
}

#[tokio::test]
async fn fresh_authorization_registers_client_and_redirects() {
    let transport = make_transport(|req| match req.url.as_str() {
        "https://res.example.com/.well-known/oauth-protected-resource/mcp" => {
            (200, resource_metadata_json())
        }
        "https://auth.example.com/.well-known/oauth-authorization-server" => {
            (200, as_metadata_json(r#""S256""#))
        }
        "https://auth.example.com/register" => (
            201,
            r#"{"client_id":"client-abc"}"#.to_string(),
        ),
        other => panic!("unexpected request to {other}"),
    });

    let provider = InMemorySessionProvider::new(
        Some("http://localhost:8080/callback".to_string()),
        client_metadata(),
    );
    let options = AuthOptions {
        server_url: "https://res.example.com/mcp",
        ..Default::default()
    };

    let outcome = orchestrator::auth(&transport, &provider, &options).await.unwrap();
    assert_eq!(outcome, AuthOutcome::Redirect);

    let redirect = provider.last_authorization_url().unwrap();
    assert!(redirect.starts_with("https://auth.example.com/authorize?"));
    assert!(redirect.contains("code_challenge_method=S256"));
    assert_eq!(provider.client_information().await.unwrap().client_id, "client-abc");
}

#[tokio::test]
async fn authorization_code_exchange_saves_tokens() {
    let transport = make_transport(|req| match req.url.as_str() {
        "https://res.example.com/.well-known/oauth-protected-resource/mcp" => {
            (200, resource_metadata_json())
        }
        "https://auth.example.com/.well-known/oauth-authorization-server" => {
            (200, as_metadata_json(r#""S256""#))
        }
        "https://auth.example.com/token" => {
            let params = form_body(&req.body);
            assert_eq!(params.get("grant_type").unwrap(), "authorization_code");
            assert_eq!(params.get("code").unwrap(), "auth-code-xyz");
            (
                200,
                r#"{"access_token":"at-1","token_type":"Bearer","expires_in":3600,"refresh_token":"rt-1"}"#
                    .to_string(),
            )
        }
        other => panic!("unexpected request to {other}"),
    });

    let provider = InMemorySessionProvider::new(
        Some("http://localhost:8080/callback".to_string()),
        client_metadata(),
    )
    .with_client_information(registered_client());
    provider.save_code_verifier("verifier-123".to_string()).await.unwrap();

    let options = AuthOptions {
        server_url: "https://res.example.com/mcp",
        authorization_code: Some("auth-code-xyz"),
        ..Default::default()
    };

    let outcome = orchestrator::auth(&transport, &provider, &options).await.unwrap();
    assert_eq!(outcome, AuthOutcome::Authorized);
    assert_eq!(provider.tokens().await.unwrap().access_token, "at-1");
}

#[tokio::test]
async fn refresh_without_rotation_keeps_old_refresh_token() {
    let transport = make_transport(|req| match req.url.as_str() {
        "https://res.example.com/.well-known/oauth-protected-resource/mcp" => {
            (200, resource_metadata_json())
        }
        "https://auth.example.com/.well-known/oauth-authorization-server" => {
            (200, as_metadata_json(r#""S256""#))
        }
        "https://auth.example.com/token" => {
            let params = form_body(&req.body);
            assert_eq!(params.get("grant_type").unwrap(), "refresh_token");
            assert_eq!(params.get("refresh_token").unwrap(), "rt-old");
            (
                200,
                r#"{"access_token":"at-2","token_type":"Bearer","expires_in":3600}"#.to_string(),
            )
        }
        other => panic!("unexpected request to {other}"),
    });

    let provider = InMemorySessionProvider::new(
        Some("http://localhost:8080/callback".to_string()),
        client_metadata(),
    )
    .with_client_information(registered_client());
    provider
        .save_tokens(mcp_auth_core::types::OAuthTokens {
            access_token: "at-old".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: Some(60),
            refresh_token: Some("rt-old".to_string()),
            scope: None,
            id_token: None,
        })
        .await
        .unwrap();

    let options = AuthOptions {
        server_url: "https://res.example.com/mcp",
        ..Default::default()
    };
    let outcome = orchestrator::auth(&transport, &provider, &options).await.unwrap();
    assert_eq!(outcome, AuthOutcome::Authorized);
    let tokens = provider.tokens().await.unwrap();
    assert_eq!(tokens.access_token, "at-2");
    assert_eq!(tokens.refresh_token.as_deref(), Some("rt-old"));
}

#[tokio::test]
async fn invalid_grant_clears_tokens_and_falls_back_to_redirect() {
    let transport = make_transport(|req| match req.url.as_str() {
        "https://res.example.com/.well-known/oauth-protected-resource/mcp" => {
            (200, resource_metadata_json())
        }
        "https://auth.example.com/.well-known/oauth-authorization-server" => {
            (200, as_metadata_json(r#""S256""#))
        }
        "https://auth.example.com/token" => (
            400,
            r#"{"error":"invalid_grant","error_description":"refresh token expired"}"#.to_string(),
        ),
        other => panic!("unexpected request to {other}"),
    });

    let provider = InMemorySessionProvider::new(
        Some("http://localhost:8080/callback".to_string()),
        client_metadata(),
    )
    .with_client_information(registered_client());
    provider
        .save_tokens(mcp_auth_core::types::OAuthTokens {
            access_token: "at-old".to_string(),
            token_type: "Bearer".to_string(),
            expires_in: Some(60),
            refresh_token: Some("rt-stale".to_string()),
            scope: None,
            id_token: None,
        })
        .await
        .unwrap();

    let options = AuthOptions {
        server_url: "https://res.example.com/mcp",
        ..Default::default()
    };
    let outcome = orchestrator::auth(&transport, &provider, &options).await.unwrap();
    assert_eq!(outcome, AuthOutcome::Redirect);
    assert!(provider.tokens().await.is_none());
}

#[tokio::test]
async fn explicit_resource_metadata_url_bypasses_well_known_guessing() {
    let transport = make_transport(|req| match req.url.as_str() {
        "https://res.example.com/custom-metadata-location" => (200, resource_metadata_json()),
        "https://auth.example.com/.well-known/oauth-authorization-server" => {
            (200, as_metadata_json(r#""S256""#))
        }
        "https://auth.example.com/register" => (201, r#"{"client_id":"client-abc"}"#.to_string()),
        other => panic!("unexpected request to {other}"),
    });

    let provider = InMemorySessionProvider::new(
        Some("http://localhost:8080/callback".to_string()),
        client_metadata(),
    );
    let options = AuthOptions {
        server_url: "https://res.example.com/mcp",
        resource_metadata_url: Some("https://res.example.com/custom-metadata-location"),
        ..Default::default()
    };

    let outcome = orchestrator::auth(&transport, &provider, &options).await.unwrap();
    assert_eq!(outcome, AuthOutcome::Redirect);
}

#[tokio::test]
async fn resource_with_no_protected_resource_metadata_omits_resource_param() {
    let transport = make_transport(|req| match req.url.as_str() {
        "https://res.example.com/.well-known/oauth-protected-resource/mcp" => (404, String::new()),
        "https://res.example.com/.well-known/oauth-protected-resource" => (404, String::new()),
        "https://res.example.com/.well-known/oauth-authorization-server/mcp" => (404, String::new()),
        "https://res.example.com/.well-known/oauth-authorization-server" => {
            (200, as_metadata_json(r#""S256""#))
        }
        "https://res.example.com/register" => (201, r#"{"client_id":"client-abc"}"#.to_string()),
        other => panic!("unexpected request to {other}"),
    });

    let provider = InMemorySessionProvider::new(
        Some("http://localhost:8080/callback".to_string()),
        client_metadata(),
    );
    let options = AuthOptions {
        server_url: "https://res.example.com/mcp",
        ..Default::default()
    };

    let outcome = orchestrator::auth(&transport, &provider, &options).await.unwrap();
    assert_eq!(outcome, AuthOutcome::Redirect);

    let redirect = provider.last_authorization_url().unwrap();
    assert!(!redirect.contains("resource="));
}

#[tokio::test]
async fn authorization_server_without_s256_is_rejected() {
    let transport = make_transport(|req| match req.url.as_str() {
        "https://res.example.com/.well-known/oauth-protected-resource/mcp" => {
            (200, resource_metadata_json())
        }
        "https://auth.example.com/.well-known/oauth-authorization-server" => {
            (200, as_metadata_json(r#""plain""#))
        }
        "https://auth.example.com/.well-known/openid-configuration" => (404, String::new()),
        "https://auth.example.com/register" => (201, r#"{"client_id":"client-abc"}"#.to_string()),
        other => panic!("unexpected request to {other}"),
    });

    let provider = InMemorySessionProvider::new(
        Some("http://localhost:8080/callback".to_string()),
        client_metadata(),
    );
    let options = AuthOptions {
        server_url: "https://res.example.com/mcp",
        ..Default::default()
    };

    let err = orchestrator::auth(&transport, &provider, &options).await.unwrap_err();
    assert!(matches!(err, AuthError::Server(_)));
    assert!(provider.client_information().await.is_none());
}

/// Wraps [`InMemorySessionProvider`] to supply a JWT-assertion-style
/// authenticator instead of the standard `client_secret_basic`/`client_secret_post`
/// selection, verifying the orchestrator delegates to it entirely.
struct CustomAuthProvider {
    inner: InMemorySessionProvider,
}

#[async_trait]
impl SessionProvider for CustomAuthProvider {
    fn redirect_url(&self) -> Option<&str> {
        self.inner.redirect_url()
    }

    fn client_metadata(&self) -> &ClientMetadata {
        self.inner.client_metadata()
    }

    async fn client_information(&self) -> Option<ClientInformationFull> {
        self.inner.client_information().await
    }

    async fn save_client_information(&self, info: ClientInformationFull) -> AuthResult<()> {
        self.inner.save_client_information(info).await
    }

    async fn tokens(&self) -> Option<OAuthTokens> {
        self.inner.tokens().await
    }

    async fn save_tokens(&self, tokens: OAuthTokens) -> AuthResult<()> {
        self.inner.save_tokens(tokens).await
    }

    async fn redirect_to_authorization(&self, url: &str) -> AuthResult<()> {
        self.inner.redirect_to_authorization(url).await
    }

    async fn save_code_verifier(&self, verifier: String) -> AuthResult<()> {
        self.inner.save_code_verifier(verifier).await
    }

    async fn code_verifier(&self) -> AuthResult<String> {
        self.inner.code_verifier().await
    }

    async fn invalidate_credentials(&self, scope: InvalidationScope) -> AuthResult<()> {
        self.inner.invalidate_credentials(scope).await
    }

    fn has_custom_client_authentication(&self) -> bool {
        true
    }

    async fn add_client_authentication(
        &self,
        headers: &mut Vec<(String, String)>,
        _params: &mut Vec<(String, String)>,
        _token_endpoint: &str,
    ) -> AuthResult<()> {
        headers.push(("Authorization".to_string(), "Bearer assertion-xyz".to_string()));
        Ok(())
    }
}

#[tokio::test]
async fn custom_client_authentication_is_used_instead_of_the_standard_selector() {
    let transport = make_transport(|req| match req.url.as_str() {
        "https://res.example.com/.well-known/oauth-protected-resource/mcp" => {
            (200, resource_metadata_json())
        }
        "https://auth.example.com/.well-known/oauth-authorization-server" => {
            (200, as_metadata_json(r#""S256""#))
        }
        "https://auth.example.com/token" => {
            let auth_header = req
                .headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("Authorization"))
                .map(|(_, v)| v.as_str());
            assert_eq!(auth_header, Some("Bearer assertion-xyz"));
            (
                200,
                r#"{"access_token":"at-1","token_type":"Bearer","expires_in":3600}"#.to_string(),
            )
        }
        other => panic!("unexpected request to {other}"),
    });

    let provider = CustomAuthProvider {
        inner: InMemorySessionProvider::new(
            Some("http://localhost:8080/callback".to_string()),
            client_metadata(),
        )
        .with_client_information(registered_client()),
    };
    provider.save_code_verifier("verifier-123".to_string()).await.unwrap();

    let options = AuthOptions {
        server_url: "https://res.example.com/mcp",
        authorization_code: Some("auth-code-xyz"),
        ..Default::default()
    };

    let outcome = orchestrator::auth(&transport, &provider, &options).await.unwrap();
    assert_eq!(outcome, AuthOutcome::Authorized);
}
