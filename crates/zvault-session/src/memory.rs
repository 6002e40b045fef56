//! In-memory session store.
//!
//! Holds all values in a `HashMap` behind a `RwLock`. Nothing survives the
//! process; use it in tests and in flows where the redirect and the callback
//! are handled by the same process.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{SessionError, SessionStore, TakeOutcome, secure_eq};

/// An in-memory session store.
///
/// Clones share the same underlying map.
///
/// # Examples
///
/// ```
/// # use zvault_session::{MemoryStore, SessionStore, keys};
/// # #[tokio::main]
/// # async fn main() {
/// let store = MemoryStore::new();
/// store.set(keys::PROJECT_ID, "proj_1").await.unwrap();
/// assert_eq!(store.get(keys::PROJECT_ID).await.unwrap().as_deref(), Some("proj_1"));
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    data: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        self.data
            .write()
            .await
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), SessionError> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> Result<Option<String>, SessionError> {
        Ok(self.data.write().await.remove(key))
    }

    async fn take_if_matches(
        &self,
        key: &str,
        expected: &str,
    ) -> Result<TakeOutcome, SessionError> {
        let mut data = self.data.write().await;
        let outcome = match data.get(key) {
            None => TakeOutcome::Missing,
            Some(stored) if secure_eq(stored, expected) => TakeOutcome::Matched,
            Some(_) => TakeOutcome::Mismatched,
        };
        if outcome.is_match() {
            data.remove(key);
        }
        Ok(outcome)
    }
}
