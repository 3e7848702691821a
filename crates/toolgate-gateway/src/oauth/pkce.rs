//! PKCE (Proof Key for Code Exchange)
//!
//! RFC 7636, S256 only.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Challenge method sent with every authorization request
pub const PKCE_METHOD: &str = "S256";

/// PKCE code verifier and challenge pair for one login attempt
#[derive(Clone)]
pub struct PkceChallenge {
    /// Kept secret until the code exchange
    pub verifier: Zeroizing<String>,
    /// `BASE64URL(SHA256(verifier))`, sent in the authorization URL
    pub challenge: String,
}

impl PkceChallenge {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let random_bytes: [u8; 32] = rng.gen();

        // 32 bytes encode to a 43-character verifier
        let verifier = Zeroizing::new(URL_SAFE_NO_PAD.encode(random_bytes));
        let challenge = Self::challenge_for(&verifier);

        Self {
            verifier,
            challenge,
        }
    }

    /// S256 challenge for a verifier
    pub fn challenge_for(verifier: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }

    pub fn verify(verifier: &str, challenge: &str) -> bool {
        Self::challenge_for(verifier) == challenge
    }
}

impl std::fmt::Debug for PkceChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceChallenge")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// Random `state` token for one authorization request
pub fn generate_state() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 16] = rng.gen();
    URL_SAFE_NO_PAD.encode(bytes)
}
