//! Client-side integration workflow for `ZVault`.
//!
//! Connects a `ZVault` project to a third-party platform (GitHub, Vercel, AWS
//! Secrets Manager, ...) so its secrets are synced there. The crate covers the
//! client half of that handshake:
//!
//! - [`RedirectInitiator`] sends the user to a provider's OAuth page with a
//!   single-use CSRF token in `state`.
//! - [`CallbackHandler`] validates `state`, exchanges the code for an
//!   integration auth exactly once, and moves the user on.
//! - [`AccessTokenForm`] authorizes providers that take pasted credentials.
//! - [`IntegrationForm`] loads the provider's dependent resources through a
//!   [`ResourceCascade`] and creates the integration.
//!
//! Providers are [`ProviderHandler`]s looked up in a [`ProviderRegistry`].
//! The backend, the session store, and the host (browser or terminal) are
//! injected through [`IntegrationApi`], [`SessionStore`], and [`Shell`], all
//! bundled in a [`WorkflowContext`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use zvault_integrations::{
//!     AuthorizeParams, IntegrationApi, IntegrationsConfig, Provider, RedirectInitiator,
//!     Session, Shell, WorkflowContext,
//! };
//! use zvault_session::MemoryStore;
//!
//! # async fn example(api: Arc<dyn IntegrationApi>, shell: Arc<dyn Shell>) -> Result<(), Box<dyn std::error::Error>> {
//! let ctx = WorkflowContext::new(
//!     IntegrationsConfig::from_env(),
//!     Session::new(Arc::new(MemoryStore::new())),
//!     api,
//!     shell,
//! );
//! let destination = RedirectInitiator::new(&ctx)
//!     .initiate(Provider::Github, &AuthorizeParams::default(), None)
//!     .await?;
//! println!("continue at {destination}");
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod auth;
pub mod callback;
pub mod cascade;
pub mod config;
pub mod context;
pub mod csrf;
pub mod error;
pub mod form;
pub mod provider;
mod providers;
pub mod redirect;
pub mod registry;
pub mod session;
pub mod shell;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod token_form;
pub mod types;
pub mod validation;

pub use api::{IntegrationApi, ResourceQuery};
pub use callback::{CallbackHandler, CallbackOutcome, CallbackQuery, CallbackState};
pub use cascade::{NONE, ResourceCascade, ResourceNode, SelectOption, SelectorView};
pub use config::IntegrationsConfig;
pub use context::WorkflowContext;
pub use csrf::CsrfToken;
pub use error::{ApiError, CascadeError, ConfigError, WorkflowError};
pub use form::{FormValues, IntegrationForm};
pub use provider::Provider;
pub use redirect::RedirectInitiator;
pub use registry::{
    AfterAuthorization, AuthKind, AuthorizeParams, ProviderHandler, ProviderRegistry,
};
pub use session::Session;
pub use shell::{Destination, Notice, NoticeLevel, Shell};
pub use token_form::{AccessTokenForm, Credentials};
pub use types::{
    CreateIntegrationRequest, Integration, IntegrationAuth, ProviderResource, Workspace,
};
pub use validation::ValidationErrors;
pub use zvault_session::SessionStore;
