//! The integration configuration form.
//!
//! Loads the project, the integration auth, and the provider's resource
//! cascade, tracks the user's choices, and turns them into one
//! `POST /integration`. The form only becomes usable once every required
//! piece has loaded.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::cascade::{NONE, ResourceCascade, SelectOption, SelectorView};
use crate::context::WorkflowContext;
use crate::error::WorkflowError;
use crate::provider::Provider;
use crate::registry::ProviderHandler;
use crate::shell::Destination;
use crate::types::{
    CreateIntegrationRequest, InitialSyncBehavior, Integration, IntegrationAuth,
    ProviderResource, Workspace,
};
use crate::validation::{self, ValidationErrors};

/// Selector key of the source environment.
pub const SOURCE_ENVIRONMENT: &str = "sourceEnvironment";
/// Field name of the secret path.
pub const SECRET_PATH: &str = "secretPath";
/// Field name of the initial sync behavior.
pub const INITIAL_SYNC_BEHAVIOR: &str = "initialSyncBehavior";
/// Cascade field carrying the team of the integration auth, when it has one.
pub const TEAM_ID: &str = "teamId";

/// Values the user has entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormValues {
    pub source_environment: Option<String>,
    pub secret_path: String,
    pub initial_sync_behavior: Option<InitialSyncBehavior>,
    /// Provider-specific fields by name.
    pub fields: BTreeMap<String, String>,
}

impl Default for FormValues {
    fn default() -> Self {
        Self {
            source_environment: None,
            secret_path: "/".to_owned(),
            initial_sync_behavior: None,
            fields: BTreeMap::new(),
        }
    }
}

/// Read-only view handed to provider handlers.
#[derive(Debug, Clone, Copy)]
pub struct FormInput<'a> {
    pub values: &'a FormValues,
    pub cascade: &'a ResourceCascade,
}

impl<'a> FormInput<'a> {
    /// Trimmed value of a provider field, `None` when blank.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&'a str> {
        validation::non_blank(self.values.fields.get(name).map(String::as_str))
    }

    /// Owned copy of [`field`](Self::field).
    #[must_use]
    pub fn field_owned(&self, name: &str) -> Option<String> {
        self.field(name).map(str::to_owned)
    }

    /// Whether a checkbox-style field is on.
    #[must_use]
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.field(name), Some("true" | "1" | "yes" | "on"))
    }

    /// Resource selected on a cascade node.
    #[must_use]
    pub fn selected(&self, key: &str) -> Option<&'a ProviderResource> {
        self.cascade.selected(key)
    }
}

/// A loaded configuration form for one provider and integration auth.
pub struct IntegrationForm {
    ctx: WorkflowContext,
    handler: Arc<dyn ProviderHandler>,
    project_id: String,
    workspace: Workspace,
    integration_auth: IntegrationAuth,
    cascade: ResourceCascade,
    values: FormValues,
}

impl std::fmt::Debug for IntegrationForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrationForm")
            .field("provider", &self.handler.provider())
            .field("project_id", &self.project_id)
            .field("integration_auth_id", &self.integration_auth.id)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}

impl IntegrationForm {
    /// Load the form for `integration_auth_id`.
    ///
    /// Failures are logged and shown as a notice before being returned.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] if no project is selected, the auth belongs
    /// to another provider, or any backend call fails.
    pub async fn load(
        ctx: &WorkflowContext,
        provider: Provider,
        integration_auth_id: &str,
    ) -> Result<Self, WorkflowError> {
        Self::try_load(ctx, provider, integration_auth_id)
            .await
            .inspect_err(|e| {
                error!(%provider, integration_auth_id, error = %e, "failed to load integration form");
                ctx.notify_error(e);
            })
    }

    /// [`load`](Self::load) without logging or notices.
    pub(crate) async fn try_load(
        ctx: &WorkflowContext,
        provider: Provider,
        integration_auth_id: &str,
    ) -> Result<Self, WorkflowError> {
        let project_id = ctx.session.require_project_id().await?;
        let handler = ctx.registry.get(provider)?;

        let (workspace, integration_auth) = tokio::try_join!(
            ctx.api.get_workspace(&project_id),
            ctx.api.get_integration_auth(integration_auth_id),
        )?;
        if integration_auth.integration != provider {
            return Err(WorkflowError::ProviderMismatch {
                id: integration_auth.id,
                expected: provider,
                found: integration_auth.integration,
            });
        }

        let mut values = FormValues {
            source_environment: workspace.environments.first().map(|e| e.slug.clone()),
            ..FormValues::default()
        };
        let mut cascade = ResourceCascade::new(integration_auth.id.clone(), handler.resources())?;
        if let Some(team_id) = integration_auth.team_id.as_deref() {
            cascade.set_field(TEAM_ID, Some(team_id));
        }
        for field in handler.fields() {
            if let Some(default) = field.default {
                values.fields.insert(field.name.to_owned(), default.to_owned());
                cascade.set_field(field.name, Some(default));
            }
        }

        let mut form = Self {
            ctx: ctx.clone(),
            handler,
            project_id,
            workspace,
            integration_auth,
            cascade,
            values,
        };
        form.refresh().await?;
        Ok(form)
    }

    /// Listings that failed earlier are attempted again on every refresh.
    async fn refresh(&mut self) -> Result<(), WorkflowError> {
        self.cascade.reset_failed();
        self.cascade.refresh(self.ctx.api.as_ref()).await?;
        Ok(())
    }

    /// Reload every listing that failed or has not loaded yet.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] if a listing fails again.
    pub async fn retry(&mut self) -> Result<(), WorkflowError> {
        self.refresh().await
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.handler.provider()
    }

    #[must_use]
    pub fn handler(&self) -> &dyn ProviderHandler {
        self.handler.as_ref()
    }

    #[must_use]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    #[must_use]
    pub fn integration_auth(&self) -> &IntegrationAuth {
        &self.integration_auth
    }

    #[must_use]
    pub fn values(&self) -> &FormValues {
        &self.values
    }

    #[must_use]
    pub fn cascade(&self) -> &ResourceCascade {
        &self.cascade
    }

    /// Whether every required resource list has loaded.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.cascade.is_ready()
    }

    /// Whether submission is possible without validation errors from
    /// unresolved selections.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.is_ready() && self.cascade.unresolved().is_empty()
    }

    /// Selectors to render: the source environment, then each loaded node.
    #[must_use]
    pub fn selectors(&self) -> Vec<SelectorView> {
        let environments = SelectorView {
            key: SOURCE_ENVIRONMENT,
            label: "environments",
            options: self
                .workspace
                .environments
                .iter()
                .map(|e| SelectOption {
                    value: e.slug.clone(),
                    label: e.name.clone(),
                })
                .collect(),
            selected: self
                .values
                .source_environment
                .clone()
                .unwrap_or_else(|| NONE.to_owned()),
            disabled: self.workspace.environments.is_empty(),
        };
        std::iter::once(environments)
            .chain(self.cascade.views())
            .collect()
    }

    /// Select a resource and load whatever depends on it.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] for an unknown node or id, or if a
    /// dependent listing fails.
    pub async fn select(&mut self, key: &str, id: &str) -> Result<(), WorkflowError> {
        if key == SOURCE_ENVIRONMENT {
            return self.set_source_environment(id).map_err(Into::into);
        }
        self.cascade.select(key, id)?;
        self.refresh().await
    }

    /// Set a provider field and reload whatever depends on it.
    ///
    /// A blank initial sync behavior clears it; an unknown one is rejected
    /// and the previous choice kept.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Validation`] for an unknown environment or
    /// initial sync behavior, or another [`WorkflowError`] if a dependent
    /// listing fails.
    pub async fn set_field(&mut self, name: &str, value: &str) -> Result<(), WorkflowError> {
        match name {
            SOURCE_ENVIRONMENT => return self.set_source_environment(value).map_err(Into::into),
            SECRET_PATH => {
                self.set_secret_path(value);
                return Ok(());
            }
            INITIAL_SYNC_BEHAVIOR => {
                self.values.initial_sync_behavior = parse_initial_sync(value)?;
                return Ok(());
            }
            _ => {}
        }
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.values.fields.remove(name);
        } else {
            self.values.fields.insert(name.to_owned(), trimmed.to_owned());
        }
        self.cascade.set_field(name, Some(trimmed));
        self.refresh().await
    }

    /// Choose the source environment by slug.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationErrors`] if the project has no such environment.
    pub fn set_source_environment(&mut self, slug: &str) -> Result<(), ValidationErrors> {
        if !self.workspace.environments.iter().any(|e| e.slug == slug) {
            let mut errors = ValidationErrors::new();
            errors.add(SOURCE_ENVIRONMENT, format!("Unknown environment '{slug}'"));
            return Err(errors);
        }
        self.values.source_environment = Some(slug.to_owned());
        Ok(())
    }

    pub fn set_secret_path(&mut self, path: &str) {
        path.trim().clone_into(&mut self.values.secret_path);
    }

    pub fn set_initial_sync_behavior(&mut self, behavior: Option<InitialSyncBehavior>) {
        self.values.initial_sync_behavior = behavior;
    }

    /// Apply values saved before an OAuth redirect and reload.
    ///
    /// Unknown keys become provider fields; non-string values are ignored.
    /// Invalid environments and sync behaviors leave the current value in
    /// place and are reported once everything else has been applied.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] if a dependent listing fails, or
    /// [`WorkflowError::Validation`] naming every saved value that was
    /// rejected.
    pub async fn restore(&mut self, pending: &Value) -> Result<(), WorkflowError> {
        let Some(object) = pending.as_object() else {
            return Ok(());
        };
        let mut rejected = ValidationErrors::new();
        for (name, value) in object {
            let Some(value) = value.as_str() else {
                continue;
            };
            let applied = match name.as_str() {
                SOURCE_ENVIRONMENT => self.set_source_environment(value),
                SECRET_PATH => {
                    self.set_secret_path(value);
                    Ok(())
                }
                INITIAL_SYNC_BEHAVIOR => parse_initial_sync(value)
                    .map(|behavior| self.values.initial_sync_behavior = behavior),
                _ => {
                    self.values.fields.insert(name.clone(), value.to_owned());
                    self.cascade.set_field(name, Some(value));
                    Ok(())
                }
            };
            if let Err(errors) = applied {
                warn!(provider = %self.provider(), field = %name, "discarding invalid saved form value");
                rejected.extend(errors);
            }
        }
        self.refresh().await?;
        rejected.into_result().map_err(Into::into)
    }

    /// Validate everything and build the creation request.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotReady`] while resources are loading and
    /// [`WorkflowError::Validation`] with every field problem otherwise.
    pub fn validate(&self) -> Result<CreateIntegrationRequest, WorkflowError> {
        let pending = self.cascade.pending();
        if !pending.is_empty() {
            return Err(WorkflowError::NotReady {
                pending: pending.join(", "),
            });
        }

        let mut errors = ValidationErrors::new();
        validation::require(
            &mut errors,
            "integrationAuthId",
            Some(self.integration_auth.id.as_str()),
            "Integration authorization is missing",
        );
        match self.values.source_environment.as_deref() {
            Some(slug) if self.workspace.environments.iter().any(|e| e.slug == slug) => {}
            Some(slug) => errors.add(SOURCE_ENVIRONMENT, format!("Unknown environment '{slug}'")),
            None => errors.add(SOURCE_ENVIRONMENT, "Source environment cannot be blank"),
        }
        validation::secret_path(&mut errors, SECRET_PATH, &self.values.secret_path);

        for field in self.handler.fields() {
            let Some(value) = self.values.fields.get(field.name) else {
                continue;
            };
            if !field.choices.is_empty() && !field.choices.contains(&value.as_str()) {
                errors.add(
                    field.name,
                    format!("{} must be one of: {}", field.label, field.choices.join(", ")),
                );
            }
        }
        for node in self.cascade.unresolved() {
            errors.add(node.key(), format!("No {} found", node.label()));
        }

        let input = FormInput {
            values: &self.values,
            cascade: &self.cascade,
        };
        self.handler.validate(&input, &mut errors);
        errors.into_result()?;

        let mut request = CreateIntegrationRequest::new(
            self.integration_auth.id.clone(),
            self.values.source_environment.clone().unwrap_or_default(),
            self.values.secret_path.trim(),
        );
        request.metadata.initial_sync_behavior = self.values.initial_sync_behavior;
        self.handler.build(&input, &mut request);
        Ok(request)
    }

    /// Validate and create the integration without side effects on the host.
    pub(crate) async fn create(&self) -> Result<Integration, WorkflowError> {
        let request = self.validate()?;
        let integration = self.ctx.api.create_integration(&request).await?;
        info!(
            provider = %self.provider(),
            integration_id = %integration.id,
            integration_auth_id = %self.integration_auth.id,
            "integration created"
        );
        Ok(integration)
    }

    /// Create the integration and return to the project's integration list.
    ///
    /// Every submission creates a new integration. Validation problems are
    /// returned for inline display; other failures are also logged and shown
    /// as a notice, and the form stays as it is.
    ///
    /// # Errors
    ///
    /// Returns a [`WorkflowError`] if validation or the backend call fails.
    pub async fn submit(&self) -> Result<Integration, WorkflowError> {
        match self.create().await {
            Ok(integration) => {
                self.ctx.shell.navigate(&Destination::IntegrationsList {
                    project_id: self.project_id.clone(),
                });
                Ok(integration)
            }
            Err(e @ (WorkflowError::Validation(_) | WorkflowError::NotReady { .. })) => Err(e),
            Err(e) => {
                error!(provider = %self.provider(), error = %e, "failed to create integration");
                self.ctx.notify_error(&e);
                Err(e)
            }
        }
    }
}

fn parse_initial_sync(value: &str) -> Result<Option<InitialSyncBehavior>, ValidationErrors> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    InitialSyncBehavior::parse(value).map(Some).ok_or_else(|| {
        let mut errors = ValidationErrors::new();
        errors.add(
            INITIAL_SYNC_BEHAVIOR,
            format!(
                "Initial sync behavior must be one of: overwrite-target, prefer-target, prefer-source (got '{value}')"
            ),
        );
        errors
    })
}
