//! Crate-wide configuration.

use std::time::Duration;

/// Tunables for the discovery and flow machinery. There is exactly one
/// flow to configure, so the surface is intentionally small.
#[derive(Debug, Clone)]
pub struct AuthCoreConfig {
    /// Cap on a discovery document's response body size, guarding against a
    /// misbehaving or malicious server streaming an unbounded response.
    pub max_metadata_response_bytes: usize,
    /// Timeout applied by the embedder's transport to discovery requests;
    /// carried here purely as documentation of the expected value, since the
    /// core does not own the transport and cannot enforce it directly.
    pub discovery_timeout: Duration,
    /// Whether authorization-server discovery falls back to OpenID Connect
    /// Discovery 1.0 when RFC 8414 candidates are all absent.
    pub fallback_to_oidc: bool,
}

impl Default for AuthCoreConfig {
    fn default() -> Self {
        Self {
            max_metadata_response_bytes: 10 * 1024,
            discovery_timeout: Duration::from_secs(5),
            fallback_to_oidc: true,
        }
    }
}
