//! # Discovery
//!
//! Resolves the pair of metadata documents the orchestrator needs before it
//! can start an authorization flow:
//!
//! 1. **Protected resource metadata** (RFC 9728) — which authorization
//!    server(s) a resource trusts, found via
//!    `/.well-known/oauth-protected-resource[/path]`.
//! 2. **Authorization server metadata** (RFC 8414, with OpenID Connect
//!    Discovery 1.0 as a fallback) — the endpoints and capabilities of the
//!    chosen authorization server.
//!
//! ## Discovery endpoint priority
//!
//! For a root authorization server URL:
//! 1. `/.well-known/oauth-authorization-server`
//! 2. `/.well-known/openid-configuration`
//!
//! For a path-bearing authorization server URL, four candidates are tried in
//! order (RFC 8414 path-insertion, then the bare-root RFC 8414 fallback,
//! then OIDC path-insertion, then OIDC path-suffix) — see
//! [`url_builder::authorization_server_candidates`].
//!
//! No caching is performed here; it is the embedder's call whether to cache
//! results across repeated [`crate::orchestrator::auth`] invocations.

mod fetcher;
mod types;
mod url_builder;

pub use fetcher::{
    fetch_authorization_server_metadata, fetch_protected_resource_metadata,
    fetch_protected_resource_metadata_at,
};
pub use types::{validate, DiscoveryError};
pub use url_builder::{authorization_server_candidates, protected_resource_candidates};
