use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

/// Decides whether a presented admin secret is valid.
pub trait AdminVerifier: Send + Sync {
    fn verify(&self, presented: &str) -> bool;
}

/// Checks the presented code against the SHA-256 digest of the configured
/// one, comparing in constant time.
pub struct SecretCodeVerifier {
    digest: [u8; 32],
}

impl SecretCodeVerifier {
    pub fn new(secret_code: &SecretString) -> Self {
        Self {
            digest: sha256(secret_code.expose_secret()),
        }
    }
}

impl AdminVerifier for SecretCodeVerifier {
    fn verify(&self, presented: &str) -> bool {
        let candidate = sha256(presented);
        self.digest
            .iter()
            .zip(candidate.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

fn sha256(input: &str) -> [u8; 32] {
    Sha256::digest(input.as_bytes()).into()
}
