//! Starting an OAuth authorization.
//!
//! The initiator builds the provider's authorization URL around a fresh CSRF
//! token, records the token (and any form values to restore afterwards) in
//! the session, and asks the host to navigate. Configuration problems are
//! caught before anything is written.

use serde_json::Value;
use tracing::{error, info};

use crate::context::WorkflowContext;
use crate::csrf::CsrfToken;
use crate::error::{ConfigError, WorkflowError};
use crate::provider::Provider;
use crate::registry::{AuthKind, AuthorizeParams, AuthorizeRequest};
use crate::shell::Destination;

/// Starts OAuth authorizations.
#[derive(Debug, Clone)]
pub struct RedirectInitiator {
    ctx: WorkflowContext,
}

impl RedirectInitiator {
    pub fn new(ctx: &WorkflowContext) -> Self {
        Self { ctx: ctx.clone() }
    }

    /// Redirect the user to `provider`'s authorization page.
    ///
    /// `pending_form` is saved under the provider's form-data key and handed
    /// back by the callback. A self-hosted URL in `params` is saved with it so
    /// the code exchange can reach the same instance.
    ///
    /// Failures are logged and shown as a notice; nothing is navigated.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] if the provider is not an OAuth provider,
    /// its client is not configured, or the session cannot be written.
    pub async fn initiate(
        &self,
        provider: Provider,
        params: &AuthorizeParams,
        pending_form: Option<Value>,
    ) -> Result<Destination, WorkflowError> {
        match self.prepare(provider, params, pending_form).await {
            Ok(destination) => {
                info!(%provider, "redirecting to provider authorization");
                self.ctx.shell.navigate(&destination);
                Ok(destination)
            }
            Err(e) => {
                error!(%provider, error = %e, "cannot start authorization");
                self.ctx.notify_error(&e);
                Err(e)
            }
        }
    }

    async fn prepare(
        &self,
        provider: Provider,
        params: &AuthorizeParams,
        pending_form: Option<Value>,
    ) -> Result<Destination, WorkflowError> {
        self.ctx.config.validate()?;
        let handler = self.ctx.registry.get(provider)?;
        if handler.auth_kind() != AuthKind::OAuth {
            return Err(ConfigError::NotOAuth { provider }.into());
        }

        let token = CsrfToken::generate();
        let url = handler.authorize_url(&AuthorizeRequest {
            config: &self.ctx.config,
            state: token.as_str(),
            params,
        })?;

        self.ctx.session.store_csrf_token(&token).await?;
        if let Some(pending) = pending_with_url(pending_form, params.url.as_deref()) {
            self.ctx.session.save_pending_form(provider, &pending).await?;
        }

        Ok(Destination::External(url))
    }
}

fn pending_with_url(pending: Option<Value>, url: Option<&str>) -> Option<Value> {
    let Some(url) = url else {
        return pending;
    };
    let mut object = match pending {
        Some(Value::Object(object)) => object,
        _ => serde_json::Map::new(),
    };
    object.insert("url".to_owned(), Value::String(url.to_owned()));
    Some(Value::Object(object))
}
