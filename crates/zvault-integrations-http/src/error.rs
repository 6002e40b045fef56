//! Error types for building the HTTP client.

/// Errors raised while constructing an [`HttpIntegrationApi`](crate::HttpIntegrationApi).
///
/// Request failures are reported as
/// [`ApiError`](zvault_integrations::ApiError) instead.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No API token was configured.
    #[error("missing API token: set ZVAULT_TOKEN or pass --token")]
    MissingToken,

    /// The API base URL is not an absolute http(s) URL.
    #[error("invalid API URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The underlying HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}
