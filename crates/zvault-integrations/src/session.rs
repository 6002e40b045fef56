//! Typed access to the session keys the workflow uses.

use std::sync::Arc;

use zvault_session::{SessionError, SessionStore, TakeOutcome, keys};

use crate::csrf::CsrfToken;
use crate::error::WorkflowError;
use crate::provider::Provider;

/// Session state shared by the redirect, the callback, and the forms.
///
/// Clones share the same store.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn SessionStore>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// The active project id, if one is selected.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the store fails.
    pub async fn project_id(&self) -> Result<Option<String>, SessionError> {
        self.store.get(keys::PROJECT_ID).await
    }

    /// The active project id.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::MissingProject`] when no project is selected.
    pub async fn require_project_id(&self) -> Result<String, WorkflowError> {
        self.project_id().await?.ok_or(WorkflowError::MissingProject)
    }

    /// Select the active project.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the store fails.
    pub async fn set_project_id(&self, project_id: &str) -> Result<(), SessionError> {
        self.store.set(keys::PROJECT_ID, project_id).await
    }

    /// Remember the CSRF token of the redirect in flight, replacing any
    /// earlier one.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the store fails.
    pub async fn store_csrf_token(&self, token: &CsrfToken) -> Result<(), SessionError> {
        self.store.set(keys::CSRF_TOKEN, token.as_str()).await
    }

    /// Consume the stored CSRF token if it equals `state`.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the store fails.
    pub async fn consume_csrf_token(&self, state: &str) -> Result<TakeOutcome, SessionError> {
        self.store.take_if_matches(keys::CSRF_TOKEN, state).await
    }

    /// Save form values for `provider` so they survive the redirect.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Encode`] or a session error.
    pub async fn save_pending_form(
        &self,
        provider: Provider,
        values: &serde_json::Value,
    ) -> Result<(), WorkflowError> {
        let encoded = serde_json::to_string(values).map_err(|e| WorkflowError::Encode {
            reason: e.to_string(),
        })?;
        self.store
            .set(&keys::form_data(provider.as_str()), &encoded)
            .await?;
        Ok(())
    }

    /// The saved form values for `provider`, leaving them in place.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the store fails.
    pub async fn pending_form(
        &self,
        provider: Provider,
    ) -> Result<Option<serde_json::Value>, SessionError> {
        let raw = self.store.get(&keys::form_data(provider.as_str())).await?;
        Ok(raw.and_then(|raw| decode_form(provider, &raw)))
    }

    /// Take the saved form values for `provider`.
    ///
    /// Unreadable values are dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns a [`SessionError`] if the store fails.
    pub async fn take_pending_form(
        &self,
        provider: Provider,
    ) -> Result<Option<serde_json::Value>, SessionError> {
        let raw = self.store.take(&keys::form_data(provider.as_str())).await?;
        Ok(raw.and_then(|raw| decode_form(provider, &raw)))
    }
}

fn decode_form(provider: Provider, raw: &str) -> Option<serde_json::Value> {
    serde_json::from_str(raw)
        .inspect_err(|e| {
            tracing::warn!(%provider, error = %e, "discarding unreadable pending form data");
        })
        .ok()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;
    use zvault_session::MemoryStore;

    use super::*;

    fn session() -> (MemoryStore, Session) {
        let store = MemoryStore::new();
        (store.clone(), Session::new(Arc::new(store)))
    }

    #[tokio::test]
    async fn missing_project_is_an_error() {
        let (_, session) = session();
        assert!(matches!(
            session.require_project_id().await,
            Err(WorkflowError::MissingProject)
        ));
        session.set_project_id("proj_1").await.unwrap();
        assert_eq!(session.require_project_id().await.unwrap(), "proj_1");
    }

    #[tokio::test]
    async fn csrf_token_is_consumed_once() {
        let (_, session) = session();
        let token = CsrfToken::generate();
        session.store_csrf_token(&token).await.unwrap();

        assert!(session.consume_csrf_token(token.as_str()).await.unwrap().is_match());
        assert_eq!(
            session.consume_csrf_token(token.as_str()).await.unwrap(),
            TakeOutcome::Missing
        );
    }

    #[tokio::test]
    async fn pending_form_round_trips_under_provider_key() {
        let (store, session) = session();
        session
            .save_pending_form(Provider::AzureKeyVault, &json!({"vaultBaseUrl": "https://a.vault.azure.net"}))
            .await
            .unwrap();
        assert!(store.get("azure-key-vaultFormData").await.unwrap().is_some());

        let peeked = session.pending_form(Provider::AzureKeyVault).await.unwrap();
        let restored = session.take_pending_form(Provider::AzureKeyVault).await.unwrap();
        assert_eq!(peeked, restored);
        assert_eq!(restored, Some(json!({"vaultBaseUrl": "https://a.vault.azure.net"})));
        assert_eq!(session.take_pending_form(Provider::AzureKeyVault).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unreadable_pending_form_is_dropped() {
        let (store, session) = session();
        store.set("gitlabFormData", "{not json").await.unwrap();
        assert_eq!(session.take_pending_form(Provider::Gitlab).await.unwrap(), None);
        assert_eq!(store.get("gitlabFormData").await.unwrap(), None);
    }
}
