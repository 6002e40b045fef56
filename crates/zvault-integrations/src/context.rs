//! Shared handles every workflow step runs against.

use std::sync::Arc;

use crate::api::IntegrationApi;
use crate::config::IntegrationsConfig;
use crate::error::WorkflowError;
use crate::registry::ProviderRegistry;
use crate::session::Session;
use crate::shell::{Notice, Shell};

/// Configuration, provider registry, session, backend, and host shell.
///
/// Cheap to clone; every field is shared.
#[derive(Clone)]
pub struct WorkflowContext {
    pub config: Arc<IntegrationsConfig>,
    pub registry: Arc<ProviderRegistry>,
    pub session: Session,
    pub api: Arc<dyn IntegrationApi>,
    pub shell: Arc<dyn Shell>,
}

impl std::fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("site_url", &self.config.site_url)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl WorkflowContext {
    /// Build a context with the built-in provider registry.
    pub fn new(
        config: IntegrationsConfig,
        session: Session,
        api: Arc<dyn IntegrationApi>,
        shell: Arc<dyn Shell>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            registry: Arc::new(ProviderRegistry::builtin()),
            session,
            api,
            shell,
        }
    }

    /// Replace the provider registry.
    #[must_use]
    pub fn with_registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Surface a failure to the user.
    pub(crate) fn notify_error(&self, err: &WorkflowError) {
        self.shell.notify(&Notice::error(err.title(), err.to_string()));
    }
}
