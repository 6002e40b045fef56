//! Completing an OAuth authorization.
//!
//! The provider redirects back with `code` and `state`. The handler consumes
//! the CSRF token stored by the redirect, exchanges the code for an
//! integration auth exactly once, and moves the user on.
//!
//! ```text
//!   Idle ──▶ ValidatingState ──▶ ExchangingCode ──▶ Succeeded
//!    ▲              │                   │
//!    └── mismatch ──┘                   └────────▶ Failed
//! ```
//!
//! A handler instance belongs to one callback request. Running it again, or
//! concurrently, yields the result of the first run instead of a second
//! exchange.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tracing::{error, info, warn};
use zvault_session::TakeOutcome;

use crate::context::WorkflowContext;
use crate::error::{ConfigError, WorkflowError};
use crate::form::IntegrationForm;
use crate::provider::Provider;
use crate::registry::{AfterAuthorization, AuthKind, ProviderHandler};
use crate::shell::{Destination, Notice};
use crate::types::{ExchangeCodeRequest, Integration, IntegrationAuth};
use crate::validation::non_blank;

/// Query parameters of the provider's redirect back to the app.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// GitHub app installations report the installation here.
    #[serde(default)]
    pub installation_id: Option<String>,
    /// Set by providers when the user declines.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl CallbackQuery {
    #[must_use]
    pub fn new(code: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            state: Some(state.into()),
            ..Self::default()
        }
    }
}

/// What a successful callback produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackOutcome {
    pub integration_auth: IntegrationAuth,
    /// Set for providers that create their integration right away.
    pub integration: Option<Integration>,
    pub destination: Destination,
    /// Form values saved before the redirect, now removed from the session.
    pub pending_form: Option<Value>,
}

/// Progress of a callback handler.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CallbackState {
    #[default]
    Idle,
    ValidatingState,
    ExchangingCode,
    Succeeded(Box<CallbackOutcome>),
    /// The user-facing error message.
    Failed(String),
}

impl CallbackState {
    /// Whether the handler has finished for good.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }
}

/// Handles one OAuth callback request.
#[derive(Debug)]
pub struct CallbackHandler {
    ctx: WorkflowContext,
    provider: Provider,
    query: CallbackQuery,
    state: watch::Sender<CallbackState>,
    run_lock: Mutex<()>,
}

impl CallbackHandler {
    pub fn new(ctx: &WorkflowContext, provider: Provider, query: CallbackQuery) -> Self {
        Self {
            ctx: ctx.clone(),
            provider,
            query,
            state: watch::Sender::new(CallbackState::Idle),
            run_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CallbackState {
        self.state.borrow().clone()
    }

    /// Observe state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CallbackState> {
        self.state.subscribe()
    }

    fn transition(&self, next: CallbackState) {
        self.state.send_replace(next);
    }

    /// Drive the handler and return the state it settles in.
    ///
    /// Without `code` and `state` the handler stays idle. A `state` that does
    /// not match the stored CSRF token is ignored without navigation or
    /// notice. Failures after validation are logged and shown as a notice.
    pub async fn run(&self) -> CallbackState {
        let _guard = self.run_lock.lock().await;
        let current = self.state();
        if current != CallbackState::Idle {
            return current;
        }

        let code = non_blank(self.query.code.as_deref());
        let state = non_blank(self.query.state.as_deref());
        let (Some(code), Some(state)) = (code, state) else {
            self.report_declined();
            return CallbackState::Idle;
        };

        // A callback for a provider without OAuth must not consume the token.
        let handler = match self.oauth_handler() {
            Ok(handler) => handler,
            Err(e) => return self.fail(&e),
        };

        self.transition(CallbackState::ValidatingState);
        match self.ctx.session.consume_csrf_token(state).await {
            Ok(TakeOutcome::Matched) => {}
            Ok(outcome) => {
                warn!(
                    provider = %self.provider,
                    token_present = outcome == TakeOutcome::Mismatched,
                    "ignoring OAuth callback with unexpected state"
                );
                self.transition(CallbackState::Idle);
                return CallbackState::Idle;
            }
            Err(e) => return self.fail(&WorkflowError::from(e)),
        }

        self.transition(CallbackState::ExchangingCode);
        let settled = match self.exchange(handler.as_ref(), code).await {
            Ok(outcome) => CallbackState::Succeeded(Box::new(outcome)),
            Err(e) => return self.fail(&e),
        };
        self.transition(settled.clone());
        settled
    }

    fn fail(&self, err: &WorkflowError) -> CallbackState {
        error!(provider = %self.provider, error = %err, "OAuth callback failed");
        self.ctx.notify_error(err);
        let failed = CallbackState::Failed(err.to_string());
        self.transition(failed.clone());
        failed
    }

    fn report_declined(&self) {
        let Some(reason) = non_blank(self.query.error.as_deref()) else {
            return;
        };
        let description = non_blank(self.query.error_description.as_deref()).unwrap_or(reason);
        warn!(provider = %self.provider, reason, "provider declined authorization");
        self.ctx.shell.notify(&Notice::error(
            "Authorization was not granted",
            format!("{}: {description}", self.provider.display_name()),
        ));
    }

    fn oauth_handler(&self) -> Result<Arc<dyn ProviderHandler>, WorkflowError> {
        let handler = self.ctx.registry.get(self.provider)?;
        if handler.auth_kind() != AuthKind::OAuth {
            return Err(ConfigError::NotOAuth {
                provider: self.provider,
            }
            .into());
        }
        Ok(handler)
    }

    async fn exchange(
        &self,
        handler: &dyn ProviderHandler,
        code: &str,
    ) -> Result<CallbackOutcome, WorkflowError> {
        let project_id = self.ctx.session.require_project_id().await?;
        let url = self
            .ctx
            .session
            .pending_form(self.provider)
            .await?
            .as_ref()
            .and_then(|form| form.get("url"))
            .and_then(Value::as_str)
            .map(str::to_owned);

        let request = ExchangeCodeRequest {
            workspace_id: project_id.clone(),
            code: code.to_owned(),
            integration: self.provider,
            installation_id: non_blank(self.query.installation_id.as_deref()).map(str::to_owned),
            url,
        };
        let integration_auth = self.ctx.api.exchange_oauth_code(&request).await?;
        info!(
            provider = %self.provider,
            integration_auth_id = %integration_auth.id,
            "OAuth code exchanged"
        );

        let pending_form = self.ctx.session.take_pending_form(self.provider).await?;
        let (integration, destination) = match handler.after_authorization() {
            AfterAuthorization::Configure => (
                None,
                Destination::ConfigureForm {
                    provider: self.provider,
                    integration_auth_id: integration_auth.id.clone(),
                },
            ),
            AfterAuthorization::CreateImmediately => {
                let mut form =
                    IntegrationForm::try_load(&self.ctx, self.provider, &integration_auth.id).await?;
                if let Some(pending) = &pending_form {
                    form.restore(pending).await?;
                }
                let integration = form.create().await?;
                (Some(integration), Destination::IntegrationsList { project_id })
            }
        };

        self.ctx.shell.navigate(&destination);
        Ok(CallbackOutcome {
            integration_auth,
            integration,
            destination,
            pending_form,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use std::sync::Arc;

    use serde_json::json;
    use zvault_session::{MemoryStore, SessionStore, keys};

    use super::*;
    use crate::config::IntegrationsConfig;
    use crate::error::ApiError;
    use crate::session::Session;
    use crate::shell::NoticeLevel;
    use crate::testing::{FakeApi, RecordingShell};

    struct Harness {
        ctx: WorkflowContext,
        store: MemoryStore,
        api: Arc<FakeApi>,
        shell: Arc<RecordingShell>,
    }

    async fn harness(api: FakeApi) -> Harness {
        let store = MemoryStore::new();
        store.set(keys::PROJECT_ID, "proj_1").await.unwrap();
        store.set(keys::CSRF_TOKEN, "abc123").await.unwrap();
        let api = Arc::new(api);
        let shell = Arc::new(RecordingShell::new());
        let ctx = WorkflowContext::new(
            IntegrationsConfig::default(),
            Session::new(Arc::new(store.clone())),
            api.clone(),
            shell.clone(),
        );
        Harness {
            ctx,
            store,
            api,
            shell,
        }
    }

    // ── State validation ────────────────────────────────────────────

    #[tokio::test]
    async fn matching_state_exchanges_once_and_opens_configuration() {
        let h = harness(FakeApi::new()).await;
        let handler = CallbackHandler::new(&h.ctx, Provider::Github, CallbackQuery::new("code_1", "abc123"));

        let CallbackState::Succeeded(outcome) = handler.run().await else {
            panic!("expected success");
        };

        let exchanges = h.api.exchanges();
        assert_eq!(exchanges.len(), 1);
        assert_eq!(
            serde_json::to_value(&exchanges[0]).unwrap(),
            json!({"workspaceId": "proj_1", "code": "code_1", "integration": "github"})
        );
        assert_eq!(
            h.shell.navigations(),
            [Destination::ConfigureForm {
                provider: Provider::Github,
                integration_auth_id: outcome.integration_auth.id.clone(),
            }]
        );
        assert_eq!(
            outcome.destination.path(),
            "/integrations/github/create?integrationAuthId=auth_new"
        );
        assert_eq!(h.store.get(keys::CSRF_TOKEN).await.unwrap(), None);
    }

    #[tokio::test]
    async fn mismatched_state_is_a_silent_no_op() {
        let h = harness(FakeApi::new()).await;
        let handler = CallbackHandler::new(&h.ctx, Provider::Github, CallbackQuery::new("code_1", "xyz"));

        assert_eq!(handler.run().await, CallbackState::Idle);

        assert!(h.api.calls().is_empty());
        assert!(h.shell.navigations().is_empty());
        assert!(h.shell.notices().is_empty());
        assert_eq!(
            h.store.get(keys::CSRF_TOKEN).await.unwrap().as_deref(),
            Some("abc123")
        );
    }

    #[tokio::test]
    async fn missing_code_or_state_stays_idle() {
        let h = harness(FakeApi::new()).await;
        let query = CallbackQuery {
            state: Some("abc123".into()),
            ..CallbackQuery::default()
        };
        let handler = CallbackHandler::new(&h.ctx, Provider::Github, query);

        assert_eq!(handler.run().await, CallbackState::Idle);
        assert!(h.api.calls().is_empty());
        assert!(h.shell.notices().is_empty());
        assert!(h.store.get(keys::CSRF_TOKEN).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn declined_authorization_is_reported() {
        let h = harness(FakeApi::new()).await;
        let query = CallbackQuery {
            state: Some("abc123".into()),
            error: Some("access_denied".into()),
            error_description: Some("The user denied access".into()),
            ..CallbackQuery::default()
        };
        let handler = CallbackHandler::new(&h.ctx, Provider::Gitlab, query);

        assert_eq!(handler.run().await, CallbackState::Idle);
        let notices = h.shell.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].message, "GitLab: The user denied access");
        assert!(h.api.calls().is_empty());
    }

    // ── Exchange at most once ───────────────────────────────────────

    #[tokio::test]
    async fn replayed_state_is_rejected() {
        let h = harness(FakeApi::new()).await;
        let first = CallbackHandler::new(&h.ctx, Provider::Github, CallbackQuery::new("code_1", "abc123"));
        let replay = CallbackHandler::new(&h.ctx, Provider::Github, CallbackQuery::new("code_1", "abc123"));

        assert!(first.run().await.is_terminal());
        assert_eq!(replay.run().await, CallbackState::Idle);
        assert_eq!(h.api.exchanges().len(), 1);
    }

    #[tokio::test]
    async fn concurrent_callbacks_exchange_once() {
        let h = harness(FakeApi::new()).await;
        let a = CallbackHandler::new(&h.ctx, Provider::Github, CallbackQuery::new("code_1", "abc123"));
        let b = CallbackHandler::new(&h.ctx, Provider::Github, CallbackQuery::new("code_1", "abc123"));

        let (ra, rb) = tokio::join!(a.run(), b.run());

        assert_eq!(u8::from(ra.is_terminal()) + u8::from(rb.is_terminal()), 1);
        assert_eq!(h.api.exchanges().len(), 1);
    }

    #[tokio::test]
    async fn rerunning_a_handler_reuses_its_result() {
        let h = harness(FakeApi::new()).await;
        let handler = CallbackHandler::new(&h.ctx, Provider::Github, CallbackQuery::new("code_1", "abc123"));

        let (first, second) = tokio::join!(handler.run(), handler.run());
        let third = handler.run().await;

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(h.api.exchanges().len(), 1);
        assert_eq!(h.shell.navigations().len(), 1);
    }

    // ── Failures ────────────────────────────────────────────────────

    #[tokio::test]
    async fn exchange_failure_notifies_without_retry() {
        let api = FakeApi::new().failing_exchange(ApiError::Status {
            status: 400,
            message: "bad_verification_code".into(),
        });
        let h = harness(api).await;
        let handler = CallbackHandler::new(&h.ctx, Provider::Github, CallbackQuery::new("code_1", "abc123"));

        let CallbackState::Failed(message) = handler.run().await else {
            panic!("expected failure");
        };
        assert!(message.contains("bad_verification_code"));
        assert!(handler.run().await.is_terminal());

        assert_eq!(h.api.exchanges().len(), 1);
        assert!(h.shell.navigations().is_empty());
        let notices = h.shell.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn missing_project_fails_before_exchange() {
        let h = harness(FakeApi::new()).await;
        h.store.delete(keys::PROJECT_ID).await.unwrap();
        let handler = CallbackHandler::new(&h.ctx, Provider::Github, CallbackQuery::new("code_1", "abc123"));

        assert!(matches!(handler.run().await, CallbackState::Failed(_)));
        assert!(h.api.exchanges().is_empty());
        assert_eq!(h.shell.notices()[0].title, "No project selected");
    }

    #[tokio::test]
    async fn token_provider_callback_keeps_csrf_token() {
        let h = harness(FakeApi::new()).await;
        let handler = CallbackHandler::new(&h.ctx, Provider::Qovery, CallbackQuery::new("code_1", "abc123"));

        let CallbackState::Failed(message) = handler.run().await else {
            panic!("expected failure");
        };

        assert!(message.contains("qovery"));
        assert!(h.api.calls().is_empty());
        assert_eq!(
            h.store.get(keys::CSRF_TOKEN).await.unwrap().as_deref(),
            Some("abc123")
        );

        let github = CallbackHandler::new(&h.ctx, Provider::Github, CallbackQuery::new("code_1", "abc123"));
        assert!(matches!(github.run().await, CallbackState::Succeeded(_)));
        assert_eq!(h.api.exchanges().len(), 1);
    }

    // ── Pending form and follow-up ──────────────────────────────────

    #[tokio::test]
    async fn pending_form_is_returned_and_self_hosted_url_forwarded() {
        let h = harness(FakeApi::new()).await;
        h.ctx
            .session
            .save_pending_form(
                Provider::Gitlab,
                &json!({"url": "https://gitlab.example.com", "secretPath": "/ci"}),
            )
            .await
            .unwrap();
        let handler = CallbackHandler::new(&h.ctx, Provider::Gitlab, CallbackQuery::new("code_1", "abc123"));

        let CallbackState::Succeeded(outcome) = handler.run().await else {
            panic!("expected success");
        };

        assert_eq!(
            h.api.exchanges()[0].url.as_deref(),
            Some("https://gitlab.example.com")
        );
        assert_eq!(
            outcome.pending_form,
            Some(json!({"url": "https://gitlab.example.com", "secretPath": "/ci"}))
        );
        assert_eq!(h.store.get("gitlabFormData").await.unwrap(), None);
    }

    #[tokio::test]
    async fn installation_id_is_forwarded() {
        let h = harness(FakeApi::new()).await;
        let query = CallbackQuery {
            installation_id: Some("4242".into()),
            ..CallbackQuery::new("code_1", "abc123")
        };
        let handler = CallbackHandler::new(&h.ctx, Provider::Github, query);

        handler.run().await;

        assert_eq!(h.api.exchanges()[0].installation_id.as_deref(), Some("4242"));
    }

    #[tokio::test]
    async fn netlify_creates_integration_immediately() {
        let api = FakeApi::new()
            .with_workspace("proj_1", &[("Development", "dev")])
            .with_resources("apps", &[], vec![json!({"appId": "site_1", "name": "docs"})]);
        let h = harness(api).await;
        let handler = CallbackHandler::new(&h.ctx, Provider::Netlify, CallbackQuery::new("code_1", "abc123"));

        let CallbackState::Succeeded(outcome) = handler.run().await else {
            panic!("expected success");
        };

        let created = h.api.creations();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].integration_auth_id, "auth_new");
        assert_eq!(created[0].app_id.as_deref(), Some("site_1"));
        assert_eq!(created[0].source_environment, "dev");
        assert!(outcome.integration.is_some());
        assert_eq!(
            h.shell.navigations(),
            [Destination::IntegrationsList {
                project_id: "proj_1".into()
            }]
        );
    }

    #[tokio::test]
    async fn state_is_observable() {
        let h = harness(FakeApi::new()).await;
        let handler = CallbackHandler::new(&h.ctx, Provider::Heroku, CallbackQuery::new("code_1", "abc123"));
        let rx = handler.subscribe();

        assert_eq!(*rx.borrow(), CallbackState::Idle);
        handler.run().await;
        assert!(matches!(*rx.borrow(), CallbackState::Succeeded(_)));
    }
}
