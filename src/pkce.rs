//! PKCE (RFC 7636) code verifier/challenge generation.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};

const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
const VERIFIER_LENGTH: usize = 64;

/// A generated PKCE pair: the secret verifier kept by the client, and the
/// challenge derived from it and sent in the authorization request.
#[derive(Debug, Clone)]
pub struct PkcePair {
    /// The high-entropy secret, stored by the session provider and sent
    /// only in the token exchange request.
    pub code_verifier: String,
    /// `BASE64URL(SHA256(code_verifier))`, sent in the authorization request.
    pub code_challenge: String,
}

/// Generates a fresh PKCE pair using S256 challenge derivation.
///
/// The verifier is drawn from a cryptographically secure RNG, never a
/// time-seeded or otherwise predictable source — PKCE's security property
/// depends entirely on the verifier being unguessable by anyone who only
/// observes the authorization request.
pub fn generate_pkce_pair() -> PkcePair {
    let mut rng = rand::thread_rng();
    let code_verifier: String = (0..VERIFIER_LENGTH)
        .map(|_| {
            let idx = rng.gen_range(0..VERIFIER_CHARSET.len());
            VERIFIER_CHARSET[idx] as char
        })
        .collect();
    let code_challenge = challenge_for_verifier(&code_verifier);
    PkcePair {
        code_verifier,
        code_challenge,
    }
}

/// Recomputes the S256 challenge for a given verifier, e.g. to validate a
/// round trip in tests.
pub fn challenge_for_verifier(code_verifier: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code_verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
