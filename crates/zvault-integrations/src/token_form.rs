//! Authorization by pasted credentials, for providers without OAuth.

use std::sync::Arc;

use tracing::{error, info};

use crate::context::WorkflowContext;
use crate::error::{ConfigError, WorkflowError};
use crate::provider::Provider;
use crate::registry::{AuthKind, CredentialField, CredentialKey, ProviderHandler};
use crate::shell::Destination;
use crate::types::{IntegrationAuth, SaveAccessTokenRequest};
use crate::validation::{self, ValidationErrors};

/// Credentials entered by the user.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_id: Option<String>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub url: Option<String>,
    pub namespace: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_id", &self.access_id)
            .field("url", &self.url)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    #[must_use]
    pub fn get(&self, key: CredentialKey) -> Option<&str> {
        let value = match key {
            CredentialKey::AccessId => &self.access_id,
            CredentialKey::AccessToken => &self.access_token,
            CredentialKey::RefreshToken => &self.refresh_token,
            CredentialKey::Url => &self.url,
            CredentialKey::Namespace => &self.namespace,
        };
        validation::non_blank(value.as_deref())
    }
}

/// The manual-token form of one provider.
pub struct AccessTokenForm {
    ctx: WorkflowContext,
    handler: Arc<dyn ProviderHandler>,
}

impl std::fmt::Debug for AccessTokenForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokenForm")
            .field("provider", &self.handler.provider())
            .finish_non_exhaustive()
    }
}

impl AccessTokenForm {
    /// # Errors
    ///
    /// Returns [`ConfigError::NotAccessToken`] for OAuth providers.
    pub fn new(ctx: &WorkflowContext, provider: Provider) -> Result<Self, WorkflowError> {
        let handler = ctx.registry.get(provider)?;
        if handler.auth_kind() != AuthKind::AccessToken {
            return Err(ConfigError::NotAccessToken { provider }.into());
        }
        Ok(Self {
            ctx: ctx.clone(),
            handler,
        })
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.handler.provider()
    }

    #[must_use]
    pub fn fields(&self) -> &'static [CredentialField] {
        self.handler.credential_fields()
    }

    /// Check required fields and URL syntax.
    ///
    /// # Errors
    ///
    /// Returns every field problem at once.
    pub fn validate(&self, credentials: &Credentials) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for field in self.fields() {
            let value = credentials.get(field.key);
            if let Some(message) = field.blank_message {
                validation::require(&mut errors, field.key.as_str(), value, message);
            }
            if let (CredentialKey::Url, Some(url)) = (field.key, value) {
                validation::http_url(
                    &mut errors,
                    field.key.as_str(),
                    url,
                    &format!("{} must be a valid http(s) URL", field.label),
                );
            }
        }
        errors.into_result()
    }

    /// Save the credentials as a new integration auth and open its
    /// configuration form.
    ///
    /// Validation problems are returned without any request. Backend failures
    /// are logged and shown as a notice.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] if validation or the backend call fails.
    pub async fn submit(&self, credentials: &Credentials) -> Result<IntegrationAuth, WorkflowError> {
        self.validate(credentials)?;
        let provider = self.provider();

        match self.save(credentials).await {
            Ok(auth) => {
                info!(%provider, integration_auth_id = %auth.id, "integration authorized with access token");
                self.ctx.shell.navigate(&Destination::ConfigureForm {
                    provider,
                    integration_auth_id: auth.id.clone(),
                });
                Ok(auth)
            }
            Err(e) => {
                error!(%provider, error = %e, "failed to save access token");
                self.ctx.notify_error(&e);
                Err(e)
            }
        }
    }

    async fn save(&self, credentials: &Credentials) -> Result<IntegrationAuth, WorkflowError> {
        let workspace_id = self.ctx.session.require_project_id().await?;
        let declared = |key: CredentialKey| {
            self.fields()
                .iter()
                .any(|f| f.key == key)
                .then(|| credentials.get(key).map(str::to_owned))
                .flatten()
        };
        let request = SaveAccessTokenRequest {
            workspace_id,
            integration: self.provider(),
            access_id: declared(CredentialKey::AccessId),
            access_token: declared(CredentialKey::AccessToken),
            refresh_token: declared(CredentialKey::RefreshToken),
            url: declared(CredentialKey::Url),
            namespace: declared(CredentialKey::Namespace),
        };
        Ok(self.ctx.api.save_access_token(&request).await?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use zvault_session::MemoryStore;

    use super::*;
    use crate::config::IntegrationsConfig;
    use crate::session::Session;
    use crate::testing::{ApiCall, FakeApi, RecordingShell};

    async fn context() -> (WorkflowContext, Arc<FakeApi>, Arc<RecordingShell>) {
        let api = Arc::new(FakeApi::new());
        let shell = Arc::new(RecordingShell::new());
        let session = Session::new(Arc::new(MemoryStore::new()));
        session.set_project_id("proj_1").await.unwrap();
        let ctx = WorkflowContext::new(
            IntegrationsConfig::default(),
            session,
            api.clone(),
            shell.clone(),
        );
        (ctx, api, shell)
    }

    #[tokio::test]
    async fn blank_access_key_is_rejected_without_request() {
        let (ctx, api, shell) = context().await;
        let form = AccessTokenForm::new(&ctx, Provider::AwsParameterStore).unwrap();

        let err = form
            .submit(&Credentials {
                access_id: Some(String::new()),
                access_token: Some("secret".into()),
                ..Credentials::default()
            })
            .await
            .unwrap_err();

        let WorkflowError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("accessId").unwrap(), ["Access key cannot be blank"]);
        assert!(api.calls().is_empty());
        assert!(shell.navigations().is_empty());
    }

    #[tokio::test]
    async fn saves_and_opens_configuration_form() {
        let (ctx, api, shell) = context().await;
        let form = AccessTokenForm::new(&ctx, Provider::AwsParameterStore).unwrap();

        let auth = form
            .submit(&Credentials {
                access_id: Some(" AKIA123 ".into()),
                access_token: Some("secret".into()),
                namespace: Some("ignored".into()),
                ..Credentials::default()
            })
            .await
            .unwrap();

        assert_eq!(
            api.calls(),
            [ApiCall::SaveAccessToken(SaveAccessTokenRequest {
                workspace_id: "proj_1".into(),
                integration: Provider::AwsParameterStore,
                access_id: Some("AKIA123".into()),
                access_token: Some("secret".into()),
                refresh_token: None,
                url: None,
                namespace: None,
            })]
        );
        assert_eq!(
            shell.navigations(),
            [Destination::ConfigureForm {
                provider: Provider::AwsParameterStore,
                integration_auth_id: auth.id,
            }]
        );
    }

    #[tokio::test]
    async fn url_fields_must_parse() {
        let (ctx, _, _) = context().await;
        let form = AccessTokenForm::new(&ctx, Provider::HashicorpVault).unwrap();

        let errors = form
            .validate(&Credentials {
                access_id: Some("role".into()),
                access_token: Some("secret".into()),
                url: Some("vault.internal".into()),
                ..Credentials::default()
            })
            .unwrap_err();

        assert!(errors.get("url").is_some());
        assert!(errors.get("accessId").is_none());
    }

    #[test]
    fn oauth_providers_have_no_token_form() {
        let ctx = WorkflowContext::new(
            IntegrationsConfig::default(),
            Session::new(Arc::new(MemoryStore::new())),
            Arc::new(FakeApi::new()),
            Arc::new(RecordingShell::new()),
        );
        let err = AccessTokenForm::new(&ctx, Provider::Github).unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::Config(ConfigError::NotAccessToken { .. })
        ));
    }

    #[test]
    fn debug_hides_secrets() {
        let creds = Credentials {
            access_token: Some("s3cr3t".into()),
            ..Credentials::default()
        };
        assert!(!format!("{creds:?}").contains("s3cr3t"));
    }
}
