//! File-backed session store on redb.
//!
//! Used by the CLI, where the redirect is initiated by one invocation and the
//! callback handled by another. Feature-gated behind `redb-backend`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use redb::{Database, ReadableTable, TableDefinition};

use crate::{SessionError, SessionStore, TakeOutcome, secure_eq};

const SESSION_TABLE: TableDefinition<&str, &str> = TableDefinition::new("session");

/// A session store backed by a redb database file.
///
/// Blocking redb calls are offloaded to the Tokio blocking pool. Every
/// read-modify-write runs inside one write transaction, so
/// [`take_if_matches`](SessionStore::take_if_matches) is atomic across
/// processes sharing the file.
///
/// # Examples
///
/// ```no_run
/// # use zvault_session::RedbStore;
/// let store = RedbStore::open(".zvault-session.redb").unwrap();
/// ```
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
    path: PathBuf,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn txn_err(e: impl std::fmt::Display) -> SessionError {
    SessionError::Transaction {
        reason: e.to_string(),
    }
}

impl RedbStore {
    /// Open or create a session database at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Open`] if the file cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let db = Database::create(path).map_err(|e| SessionError::Open {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let txn = db.begin_write().map_err(txn_err)?;
        {
            // Opening the table in a write txn creates it if missing.
            let _table = txn.open_table(SESSION_TABLE).map_err(txn_err)?;
        }
        txn.commit().map_err(txn_err)?;

        Ok(Self {
            db: Arc::new(db),
            path: path.to_path_buf(),
        })
    }

    /// Filesystem path of the database.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, SessionError>
    where
        T: Send + 'static,
        F: FnOnce(&Database) -> Result<T, SessionError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || op(&db))
            .await
            .map_err(|e| SessionError::Transaction {
                reason: format!("blocking task panicked: {e}"),
            })?
    }
}

#[async_trait::async_trait]
impl SessionStore for RedbStore {
    async fn get(&self, key: &str) -> Result<Option<String>, SessionError> {
        let key = key.to_owned();
        self.blocking(move |db| {
            let txn = db.begin_read().map_err(txn_err)?;
            let table = txn.open_table(SESSION_TABLE).map_err(txn_err)?;
            let value = table
                .get(key.as_str())
                .map_err(|e| SessionError::Read {
                    key: key.clone(),
                    reason: e.to_string(),
                })?
                .map(|v| v.value().to_owned());
            Ok(value)
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let key = key.to_owned();
        let value = value.to_owned();
        self.blocking(move |db| {
            let txn = db.begin_write().map_err(txn_err)?;
            {
                let mut table = txn.open_table(SESSION_TABLE).map_err(txn_err)?;
                table
                    .insert(key.as_str(), value.as_str())
                    .map_err(|e| SessionError::Write {
                        key: key.clone(),
                        reason: e.to_string(),
                    })?;
            }
            txn.commit().map_err(txn_err)
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), SessionError> {
        let key = key.to_owned();
        self.blocking(move |db| {
            let txn = db.begin_write().map_err(txn_err)?;
            {
                let mut table = txn.open_table(SESSION_TABLE).map_err(txn_err)?;
                table
                    .remove(key.as_str())
                    .map_err(|e| SessionError::Delete {
                        key: key.clone(),
                        reason: e.to_string(),
                    })?;
            }
            txn.commit().map_err(txn_err)
        })
        .await
    }

    async fn take(&self, key: &str) -> Result<Option<String>, SessionError> {
        let key = key.to_owned();
        self.blocking(move |db| {
            let txn = db.begin_write().map_err(txn_err)?;
            let value = {
                let mut table = txn.open_table(SESSION_TABLE).map_err(txn_err)?;
                table
                    .remove(key.as_str())
                    .map_err(|e| SessionError::Delete {
                        key: key.clone(),
                        reason: e.to_string(),
                    })?
                    .map(|v| v.value().to_owned())
            };
            txn.commit().map_err(txn_err)?;
            Ok(value)
        })
        .await
    }

    async fn take_if_matches(
        &self,
        key: &str,
        expected: &str,
    ) -> Result<TakeOutcome, SessionError> {
        let key = key.to_owned();
        let expected = expected.to_owned();
        self.blocking(move |db| {
            let txn = db.begin_write().map_err(txn_err)?;
            let outcome = {
                let mut table = txn.open_table(SESSION_TABLE).map_err(txn_err)?;
                let stored = table
                    .get(key.as_str())
                    .map_err(|e| SessionError::Read {
                        key: key.clone(),
                        reason: e.to_string(),
                    })?
                    .map(|v| v.value().to_owned());
                let outcome = match stored {
                    None => TakeOutcome::Missing,
                    Some(ref s) if secure_eq(s, &expected) => TakeOutcome::Matched,
                    Some(_) => TakeOutcome::Mismatched,
                };
                if outcome.is_match() {
                    table
                        .remove(key.as_str())
                        .map_err(|e| SessionError::Delete {
                            key: key.clone(),
                            reason: e.to_string(),
                        })?;
                }
                outcome
            };
            txn.commit().map_err(txn_err)?;
            Ok(outcome)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn open_temp() -> (tempfile::TempDir, RedbStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("session.redb")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn set_get_delete() {
        let (_dir, store) = open_temp();
        store.set("projectData.id", "proj_1").await.unwrap();
        assert_eq!(
            store.get("projectData.id").await.unwrap().as_deref(),
            Some("proj_1")
        );
        store.delete("projectData.id").await.unwrap();
        assert_eq!(store.get("projectData.id").await.unwrap(), None);
    }

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            store.set("latestCSRFToken", "abc123").await.unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(
            store.get("latestCSRFToken").await.unwrap().as_deref(),
            Some("abc123")
        );
    }

    #[tokio::test]
    async fn take_if_matches_deletes_only_on_match() {
        let (_dir, store) = open_temp();
        store.set("latestCSRFToken", "abc123").await.unwrap();

        assert_eq!(
            store.take_if_matches("latestCSRFToken", "xyz").await.unwrap(),
            TakeOutcome::Mismatched
        );
        assert_eq!(
            store.take_if_matches("latestCSRFToken", "abc123").await.unwrap(),
            TakeOutcome::Matched
        );
        assert_eq!(
            store.take_if_matches("latestCSRFToken", "abc123").await.unwrap(),
            TakeOutcome::Missing
        );
    }

    #[tokio::test]
    async fn take_returns_and_removes() {
        let (_dir, store) = open_temp();
        store.set("githubFormData", "{}").await.unwrap();
        assert_eq!(store.take("githubFormData").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(store.take("githubFormData").await.unwrap(), None);
    }
}
