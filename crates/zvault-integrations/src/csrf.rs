//! Single-use CSRF tokens for the OAuth `state` parameter.

use std::fmt;

/// An opaque random token.
///
/// Two v4 UUIDs without hyphens: 64 hex characters, 244 random bits. `Debug`
/// is redacted so the value never reaches logs.
#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Generate a fresh token.
    #[must_use]
    pub fn generate() -> Self {
        Self(
            uuid::Uuid::new_v4().simple().to_string() + &uuid::Uuid::new_v4().simple().to_string(),
        )
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CsrfToken(..)")
    }
}
