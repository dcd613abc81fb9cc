//! Credentials presented by a caller (HTTP Basic scheme).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use zeroize::Zeroizing;

/// Authentication scheme advertised in challenges.
pub const BASIC_SCHEME: &str = "Basic";

/// Username + secret as sent by the caller. Not yet verified.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    secret: Zeroizing<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: Zeroizing::new(secret.into()),
        }
    }

    /// Decode an `Authorization` header value of the form `Basic base64(user:secret)`.
    ///
    /// The scheme name is case-insensitive. The secret may itself contain `:`;
    /// the split happens at the first one. Anything malformed yields `None`,
    /// which the evaluator treats like absent credentials.
    pub fn from_basic_header(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case(BASIC_SCHEME) {
            return None;
        }

        let decoded = Zeroizing::new(STANDARD.decode(encoded.trim()).ok()?);
        let decoded = std::str::from_utf8(&decoded).ok()?;
        let (username, secret) = decoded.split_once(':')?;
        Some(Self::new(username, secret))
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"***")
            .finish()
    }
}
