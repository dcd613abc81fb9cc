//! User secrets: generation and constant-shape comparison.

use rand::{Rng, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Length of generated secrets (default account).
pub const GENERATED_SECRET_LEN: usize = 30;

const ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789?!@#$%^&*()_+{}[]|:;<>,.~`-=";

/// A user's secret. Wiped from memory on drop and redacted from `Debug`.
#[derive(Clone)]
pub struct Secret(Zeroizing<String>);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Fresh random secret drawn from the OS CSPRNG.
    pub fn generate(len: usize) -> Self {
        let mut rng = OsRng;
        let value: String = (0..len)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self::new(value)
    }

    /// Plaintext, for persisting the store and for showing the operator the
    /// generated default credentials.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Compare against a presented secret.
    ///
    /// Both sides are hashed to fixed-size digests first, so the comparison
    /// runs over the same number of bytes whatever the inputs' lengths or
    /// shared prefix.
    pub fn matches(&self, presented: &str) -> bool {
        let expected = Sha256::digest(self.0.as_bytes());
        let presented = Sha256::digest(presented.as_bytes());
        expected.as_slice().ct_eq(presented.as_slice()).into()
    }
}

impl core::fmt::Debug for Secret {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_is_exact_and_case_sensitive() {
        let s = Secret::new("s3cret");
        assert!(s.matches("s3cret"));
        assert!(!s.matches("S3CRET"));
        assert!(!s.matches("s3cre"));
        assert!(!s.matches("s3cret "));
        assert!(!s.matches(""));
    }

    #[test]
    fn generated_secrets_use_the_alphabet_and_differ() {
        let a = Secret::generate(GENERATED_SECRET_LEN);
        let b = Secret::generate(GENERATED_SECRET_LEN);

        assert_eq!(a.expose().chars().count(), GENERATED_SECRET_LEN);
        assert!(a.expose().bytes().all(|c| ALPHABET.contains(&c)));
        assert_ne!(a.expose(), b.expose());
    }

    #[test]
    fn debug_is_redacted() {
        let s = Secret::new("hunter2");
        assert_eq!(format!("{s:?}"), "Secret(***)");
    }
}
