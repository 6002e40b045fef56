//! Operations on existing integration auths.

use tracing::{error, info};

use crate::context::WorkflowContext;
use crate::error::WorkflowError;
use crate::provider::Provider;
use crate::shell::Destination;
use crate::types::IntegrationAuth;

/// Fetch an integration auth.
///
/// # Errors
///
/// Returns a [`WorkflowError`] if the backend call fails.
pub async fn show(ctx: &WorkflowContext, integration_auth_id: &str) -> Result<IntegrationAuth, WorkflowError> {
    Ok(ctx.api.get_integration_auth(integration_auth_id).await?)
}

/// Copy a GitHub authorization into the active project and open the
/// configuration form for the copy.
///
/// Only GitHub app installations can be shared between projects; other
/// providers need a fresh authorization.
///
/// # Errors
///
/// Returns [`WorkflowError::Unsupported`] for other providers,
/// [`WorkflowError::MissingProject`] without an active project, or the
/// backend error. Failures are also logged and shown as a notice.
pub async fn duplicate(
    ctx: &WorkflowContext,
    integration_auth_id: &str,
) -> Result<IntegrationAuth, WorkflowError> {
    match try_duplicate(ctx, integration_auth_id).await {
        Ok(copy) => {
            info!(
                source_id = integration_auth_id,
                integration_auth_id = %copy.id,
                project_id = %copy.project_id,
                "integration auth duplicated"
            );
            ctx.shell.navigate(&Destination::ConfigureForm {
                provider: copy.integration,
                integration_auth_id: copy.id.clone(),
            });
            Ok(copy)
        }
        Err(e) => {
            error!(integration_auth_id, error = %e, "failed to duplicate integration auth");
            ctx.notify_error(&e);
            Err(e)
        }
    }
}

async fn try_duplicate(
    ctx: &WorkflowContext,
    integration_auth_id: &str,
) -> Result<IntegrationAuth, WorkflowError> {
    let project_id = ctx.session.require_project_id().await?;
    let source = ctx.api.get_integration_auth(integration_auth_id).await?;
    if source.integration != Provider::Github {
        return Err(WorkflowError::Unsupported {
            provider: source.integration,
            operation: "duplicating an authorization",
        });
    }
    Ok(ctx
        .api
        .duplicate_integration_auth(integration_auth_id, &project_id)
        .await?)
}
