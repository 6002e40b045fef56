//! Session-scoped state for `ZVault` integration flows.
//!
//! This crate defines the [`SessionStore`] trait — a string key-value store
//! holding the transient state that must survive an OAuth redirect: the
//! single-use CSRF token, the active project pointer, and per-provider pending
//! form data. It knows nothing about providers or the backend API.
//!
//! Two implementations are provided:
//!
//! - [`RedbStore`] — durable, file-backed (feature `redb-backend`)
//! - [`MemoryStore`] — in-memory, for tests and single-process flows

mod error;
mod memory;
#[cfg(feature = "redb-backend")]
mod redb_store;

pub use error::SessionError;
pub use memory::MemoryStore;
#[cfg(feature = "redb-backend")]
pub use redb_store::RedbStore;

use subtle::ConstantTimeEq;

/// Well-known session keys.
pub mod keys {
    /// Single-use CSRF token round-tripped through the OAuth `state` parameter.
    pub const CSRF_TOKEN: &str = "latestCSRFToken";

    /// Identifier of the active project (workspace).
    pub const PROJECT_ID: &str = "projectData.id";

    /// Key holding pending form values for `provider` across a redirect,
    /// e.g. `azure-key-vaultFormData`.
    #[must_use]
    pub fn form_data(provider: &str) -> String {
        format!("{provider}FormData")
    }
}

/// Result of a compare-and-delete on a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TakeOutcome {
    /// The stored value matched and has been deleted.
    Matched,
    /// A value was stored but did not match. It is left in place.
    Mismatched,
    /// Nothing was stored under the key.
    Missing,
}

impl TakeOutcome {
    /// Whether the comparison succeeded.
    #[must_use]
    pub const fn is_match(self) -> bool {
        matches!(self, Self::Matched)
    }
}

/// A pluggable, session-scoped string key-value store.
///
/// Implementations must be safe to share across async tasks (`Send + Sync`).
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Retrieve a value by key. Returns `Ok(None)` if the key does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Read`] if the underlying store fails.
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError>;

    /// Store a value, overwriting any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Write`] if the underlying store fails.
    async fn set(&self, key: &str, value: &str) -> Result<(), SessionError>;

    /// Delete a key. Deleting a non-existent key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Delete`] if the underlying store fails.
    async fn delete(&self, key: &str) -> Result<(), SessionError>;

    /// Read and delete a value.
    ///
    /// The default implementation is a `get` followed by a `delete` and is not
    /// atomic. Stores shared between concurrent flows should override it.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if either step fails.
    async fn take(&self, key: &str) -> Result<Option<String>, SessionError> {
        let value = self.get(key).await?;
        if value.is_some() {
            self.delete(key).await?;
        }
        Ok(value)
    }

    /// Delete the value under `key` only if it equals `expected`.
    ///
    /// The comparison is constant-time. At most one of several concurrent
    /// callers presenting the same value observes [`TakeOutcome::Matched`] in
    /// stores that override this method atomically.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the underlying store fails.
    async fn take_if_matches(
        &self,
        key: &str,
        expected: &str,
    ) -> Result<TakeOutcome, SessionError> {
        match self.get(key).await? {
            None => Ok(TakeOutcome::Missing),
            Some(stored) if secure_eq(&stored, expected) => {
                self.delete(key).await?;
                Ok(TakeOutcome::Matched)
            }
            Some(_) => Ok(TakeOutcome::Mismatched),
        }
    }
}

/// Constant-time string equality.
#[must_use]
pub fn secure_eq(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}
