//! Client secret materialization and redaction.
//!
//! Secrets generated or accepted here are tagged sensitive: every logging
//! and serialization path renders them as `<redacted>`, and plaintext is
//! only reachable through the explicit [`SecretString::expose`] accessor.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

/// Number of random bytes drawn for a generated secret.
pub const GENERATED_SECRET_BYTES: usize = 32;

/// Placeholder emitted wherever a secret would otherwise leak.
pub const REDACTED: &str = "<redacted>";

/// A sensitive string that redacts itself in `Debug`, `Display` and serde
/// output, and scrubs its buffer on drop.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
    /// Wrap an existing secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Return the plaintext value.
    ///
    /// Callers must not log or persist the returned slice without an
    /// explicit unmasking decision.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Check whether the secret is the empty string.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

impl Eq for SecretString {}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecretString").field(&REDACTED).finish()
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// Serialization redacts by default so persisted state and summaries cannot
// leak plaintext accidentally. Unmasked persistence goes through expose().
impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self(Zeroizing::new(value)))
    }
}

/// Materialize a client secret.
///
/// When the caller supplies a value it is adopted as-is; otherwise a
/// cryptographically random secret is generated from the OS CSPRNG:
/// [`GENERATED_SECRET_BYTES`] bytes, URL-safe base64 without padding.
#[must_use]
pub fn materialize(requested: Option<&SecretString>) -> SecretString {
    match requested {
        Some(secret) => secret.clone(),
        None => generate(),
    }
}

/// Generate a fresh random secret.
#[must_use]
pub fn generate() -> SecretString {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine as _;
    use rand::rngs::OsRng;
    use rand::RngCore;

    let mut buf = Zeroizing::new([0u8; GENERATED_SECRET_BYTES]);
    OsRng.fill_bytes(buf.as_mut());

    SecretString::new(URL_SAFE_NO_PAD.encode(buf.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_formatters_redact() {
        let secret = SecretString::new("super-secret");
        assert_eq!(format!("{secret:?}"), "SecretString(\"<redacted>\")");
        assert_eq!(format!("{secret}"), "<redacted>");
    }

    #[test]
    fn secret_serializes_redacted() {
        let secret = SecretString::new("super-secret");
        let json = serde_json::to_string(&secret).unwrap();
        assert_eq!(json, "\"<redacted>\"");
    }

    #[test]
    fn expose_returns_plaintext() {
        let secret = SecretString::new("super-secret");
        assert_eq!(secret.expose(), "super-secret");
    }

    #[test]
    fn materialize_adopts_requested_value() {
        let requested = SecretString::new("caller-chosen");
        let out = materialize(Some(&requested));
        assert_eq!(out, requested);
    }

    #[test]
    fn generated_secrets_are_unique() {
        let a = materialize(None);
        let b = materialize(None);
        assert_ne!(a, b);
    }

    #[test]
    fn generated_secrets_meet_entropy_bound() {
        for _ in 0..16 {
            let secret = generate();
            // 32 bytes of entropy encode to 43 URL-safe characters without
            // padding.
            assert_eq!(secret.expose().len(), 43);
            assert!(secret
                .expose()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
    }
}
