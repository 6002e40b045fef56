//! Error types for the integration workflow.
//!
//! One enum per concern, each variant carrying enough context to diagnose the
//! failure without exposing secrets. [`WorkflowError`] is the umbrella type
//! returned by the redirect, callback, form, and token-form operations.

use zvault_session::SessionError;

use crate::provider::Provider;
use crate::validation::ValidationErrors;

/// Missing or malformed client configuration.
///
/// Raised before any navigation or backend call. Messages name the
/// environment variable the operator has to set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No OAuth client id is configured for the provider.
    #[error("{provider} is not configured: set {env_var} to the OAuth client id")]
    MissingClientId {
        provider: Provider,
        env_var: String,
    },

    /// No installation slug is configured for an installation-style provider.
    #[error("{provider} is not configured: set {env_var} to the app slug")]
    MissingAppSlug {
        provider: Provider,
        env_var: String,
    },

    /// The provider authorizes with an access token, not OAuth.
    #[error("{provider} does not support OAuth authorization; use an access token")]
    NotOAuth { provider: Provider },

    /// The provider authorizes with OAuth, not an access token.
    #[error("{provider} does not accept access tokens; use OAuth authorization")]
    NotAccessToken { provider: Provider },

    /// A URL setting could not be parsed.
    #[error("invalid URL in {setting} '{value}': {reason}")]
    InvalidUrl {
        setting: String,
        value: String,
        reason: String,
    },

    /// A numeric setting could not be parsed.
    #[error("invalid value for {setting}: '{value}'")]
    InvalidValue { setting: String, value: String },

    /// A provider slug did not match any known provider.
    #[error("unknown integration provider '{value}'")]
    UnknownProvider { value: String },
}

/// Failures talking to the backend integration API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The backend answered with a non-success status.
    #[error("backend error ({status}): {message}")]
    Status { status: u16, message: String },

    /// The bearer token was missing, expired, or rejected.
    #[error("authentication failed: {message}")]
    Unauthorized { message: String },

    /// The requested object does not exist.
    #[error("not found: {message}")]
    NotFound { message: String },

    /// The request timed out.
    #[error("request timed out")]
    Timeout,

    /// The request could not be sent.
    #[error("network error: {reason}")]
    Network { reason: String },

    /// The response body did not have the expected shape.
    #[error("unexpected response: {reason}")]
    Decode { reason: String },
}

/// Misuse of a [`ResourceCascade`](crate::cascade::ResourceCascade).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CascadeError {
    /// Two nodes share a key.
    #[error("duplicate resource node '{key}'")]
    DuplicateNode { key: String },

    /// A node references a parent that is not declared before it.
    #[error("resource node '{node}' depends on '{parent}', which is not declared before it")]
    UnknownParent { node: String, parent: String },

    /// The node key is not part of the cascade.
    #[error("unknown resource node '{key}'")]
    UnknownNode { key: String },

    /// A selection was attempted before the node finished loading.
    #[error("resource node '{key}' is not loaded")]
    NotLoaded { key: String },

    /// The selected identifier is not in the loaded list.
    #[error("'{id}' is not a loaded {key}")]
    UnknownResource { key: String, id: String },
}

/// Umbrella error for workflow operations.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cascade(#[from] CascadeError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// No active project is recorded in the session.
    #[error("no active project: select a project before connecting an integration")]
    MissingProject,

    /// The form is still loading resources.
    #[error("the form is not ready: waiting on {pending}")]
    NotReady { pending: String },

    /// No handler is registered for the provider.
    #[error("no handler registered for {provider}")]
    UnregisteredProvider { provider: Provider },

    /// An integration auth was used with a form of another provider.
    #[error("integration auth '{id}' belongs to {found}, not {expected}")]
    ProviderMismatch {
        id: String,
        expected: Provider,
        found: Provider,
    },

    /// The operation is not available for this provider.
    #[error("{operation} is not supported for {provider}")]
    Unsupported {
        provider: Provider,
        operation: &'static str,
    },

    /// Pending form data could not be encoded.
    #[error("failed to encode form data: {reason}")]
    Encode { reason: String },
}

impl WorkflowError {
    /// Short, user-facing title for notices.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Config(_) => "Integration is not configured",
            Self::Session(_) => "Session storage failed",
            Self::Api(ApiError::Unauthorized { .. }) => "Not signed in",
            Self::Api(_) => "Request to ZVault failed",
            Self::Cascade(_) | Self::NotReady { .. } => "Resources are not loaded",
            Self::Validation(_) => "Please fix the highlighted fields",
            Self::MissingProject => "No project selected",
            Self::UnregisteredProvider { .. }
            | Self::Unsupported { .. }
            | Self::ProviderMismatch { .. } => {
                "Unsupported integration"
            }
            Self::Encode { .. } => "Could not save form",
        }
    }
}
