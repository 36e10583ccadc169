//! # mcp-auth-core
//!
//! An OAuth 2.1 client core for authorizing against resource servers that
//! advertise their requirements via RFC 9728 Protected Resource Metadata, in
//! the style used by the Model Context Protocol's authorization spec.
//!
//! This crate discovers protected-resource and authorization-server
//! metadata, performs dynamic client registration (RFC 7591), runs the
//! PKCE-secured authorization-code flow with RFC 8707 resource indicators,
//! refreshes tokens, and recovers from server-reported credential
//! invalidation — all without owning an HTTP client, a session store, or a
//! user-agent. Those are supplied by the embedder through [`transport::RequestFn`]
//! and [`provider::SessionProvider`].
//!
//! ## Architecture
//!
//! - `error` - the `AuthError` taxonomy shared by every component
//! - `types` - wire-format data model (client metadata, tokens, discovery documents)
//! - `transport` - the pluggable HTTP transport contract
//! - `pkce` - RFC 7636 code verifier/challenge generation
//! - `discovery` - protected-resource and authorization-server metadata discovery
//! - `client_auth` - client authentication method selection (RFC 7591 §2.3.1 methods)
//! - `flow` - the four wire-level flow primitives (authorize, exchange, refresh, register)
//! - `orchestrator` - the `auth()` entry point sequencing the above, with recovery retries
//! - `provider` - the `SessionProvider` trait owning all mutable state
//! - `config` - tunables for discovery
//!
//! ## Minimal usage
//!
//! ```no_run
//! use mcp_auth_core::orchestrator::{self, AuthOptions};
//! use mcp_auth_core::provider::InMemorySessionProvider;
//! use mcp_auth_core::types::ClientMetadata;
//! use mcp_auth_core::transport::RequestFn;
//!
//! # async fn example(transport: RequestFn) -> Result<(), Box<dyn std::error::Error>> {
//! let provider = InMemorySessionProvider::new(
//!     Some("http://localhost:8080/callback".to_string()),
//!     ClientMetadata {
//!         redirect_uris: vec!["http://localhost:8080/callback".to_string()],
//!         ..Default::default()
//!     },
//! );
//!
//! let options = AuthOptions {
//!     server_url: "https://mcp.example.com",
//!     ..Default::default()
//! };
//! let outcome = orchestrator::auth(&transport, &provider, &options).await?;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

pub mod client_auth;
pub mod config;
pub mod discovery;
pub mod error;
pub mod flow;
pub mod orchestrator;
pub mod pkce;
pub mod provider;
pub mod transport;
pub mod types;

#[doc(inline)]
pub use config::AuthCoreConfig;
#[doc(inline)]
pub use error::{AuthError, AuthResult};
#[doc(inline)]
pub use orchestrator::{auth, AuthOptions, AuthOutcome};
#[doc(inline)]
pub use provider::{InMemorySessionProvider, SessionProvider};
