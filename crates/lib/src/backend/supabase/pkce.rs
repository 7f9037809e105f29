//! PKCE (RFC 7636) verifier and S256 challenge.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{Rng, distributions::Alphanumeric};
use sha2::{Digest, Sha256};

/// Verifier length in characters; RFC 7636 allows 43 to 128.
const VERIFIER_LENGTH: usize = 64;

/// A verifier and the challenge derived from it.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Pkce {
    pub(crate) verifier: String,
    pub(crate) challenge: String,
}

impl Pkce {
    pub(crate) fn generate() -> Self {
        let verifier: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(VERIFIER_LENGTH)
            .map(char::from)
            .collect();
        let challenge = challenge_for(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

impl std::fmt::Debug for Pkce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pkce")
            .field("verifier", &"<redacted>")
            .field("challenge", &self.challenge)
            .finish()
    }
}

/// `BASE64URL(SHA256(verifier))` without padding.
pub(crate) fn challenge_for(verifier: &str) -> String {
    Base64UrlUnpadded::encode_string(&Sha256::digest(verifier.as_bytes()))
}
