//! Client configuration for integration flows.
//!
//! Loads configuration from environment variables with sensible defaults.
//! OAuth client ids are resolved per provider when a redirect is built, so a
//! missing id only blocks the provider that needs it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::provider::Provider;

const DEFAULT_SITE_URL: &str = "http://localhost:8080";
const DEFAULT_API_URL: &str = "https://api.zvault.cloud";
const DEFAULT_SESSION_PATH: &str = ".zvault-session.redb";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Integration client configuration.
#[derive(Debug, Clone)]
pub struct IntegrationsConfig {
    /// Public base URL of the web app; redirect URIs and navigation targets
    /// are built from it. Never ends with `/`.
    pub site_url: String,
    /// Base URL of the `ZVault` API.
    pub api_url: String,
    /// Bearer token for the API.
    pub api_token: Option<String>,
    /// Per-request HTTP timeout.
    pub timeout: Duration,
    /// Session database used by the CLI.
    pub session_path: PathBuf,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    client_ids: HashMap<Provider, String>,
    app_slugs: HashMap<Provider, String>,
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl IntegrationsConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `ZVAULT_SITE_URL` — web app base URL (default: `http://localhost:8080`)
    /// - `ZVAULT_API_URL` — API base URL (default: `https://api.zvault.cloud`)
    /// - `ZVAULT_TOKEN` — API bearer token (optional)
    /// - `ZVAULT_TIMEOUT_SECS` — HTTP timeout in seconds (default: `10`)
    /// - `ZVAULT_SESSION_PATH` — session database path (default: `.zvault-session.redb`)
    /// - `ZVAULT_LOG_LEVEL` — log filter (default: `info`)
    /// - `ZVAULT_CLIENT_ID_<PROVIDER>` — OAuth client id, e.g. `ZVAULT_CLIENT_ID_GITHUB`
    /// - `ZVAULT_CLIENT_SLUG_<PROVIDER>` — installation slug, e.g. `ZVAULT_CLIENT_SLUG_VERCEL`
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let site_url = get("ZVAULT_SITE_URL")
            .unwrap_or_else(|| DEFAULT_SITE_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        let api_url = get("ZVAULT_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();

        let timeout_secs = get("ZVAULT_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let mut client_ids = HashMap::new();
        let mut app_slugs = HashMap::new();
        for provider in Provider::ALL {
            let suffix = provider.env_suffix();
            if let Some(id) = get(&format!("ZVAULT_CLIENT_ID_{suffix}")) {
                client_ids.insert(provider, id);
            }
            if let Some(slug) = get(&format!("ZVAULT_CLIENT_SLUG_{suffix}")) {
                app_slugs.insert(provider, slug);
            }
        }

        Self {
            site_url,
            api_url,
            api_token: get("ZVAULT_TOKEN"),
            timeout: Duration::from_secs(timeout_secs),
            session_path: get("ZVAULT_SESSION_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_SESSION_PATH), PathBuf::from),
            log_level: get("ZVAULT_LOG_LEVEL").unwrap_or_else(|| "info".to_owned()),
            client_ids,
            app_slugs,
        }
    }

    /// Set the OAuth client id for a provider.
    #[must_use]
    pub fn with_client_id(mut self, provider: Provider, client_id: impl Into<String>) -> Self {
        self.client_ids.insert(provider, client_id.into());
        self
    }

    /// Set the installation slug for a provider.
    #[must_use]
    pub fn with_app_slug(mut self, provider: Provider, slug: impl Into<String>) -> Self {
        self.app_slugs.insert(provider, slug.into());
        self
    }

    /// OAuth client id for `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingClientId`] naming the variable to set.
    pub fn client_id(&self, provider: Provider) -> Result<&str, ConfigError> {
        self.client_ids
            .get(&provider)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingClientId {
                provider,
                env_var: format!("ZVAULT_CLIENT_ID_{}", provider.env_suffix()),
            })
    }

    /// Installation slug for `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingAppSlug`] naming the variable to set.
    pub fn app_slug(&self, provider: Provider) -> Result<&str, ConfigError> {
        self.app_slugs
            .get(&provider)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingAppSlug {
                provider,
                env_var: format!("ZVAULT_CLIENT_SLUG_{}", provider.env_suffix()),
            })
    }

    /// Check that the site URL is an absolute http(s) URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] naming `ZVAULT_SITE_URL`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidUrl {
            setting: "ZVAULT_SITE_URL".to_owned(),
            value: self.site_url.clone(),
            reason,
        };
        let url = url::Url::parse(&self.site_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(invalid("must not carry a query or fragment".to_owned()));
        }
        Ok(())
    }

    /// OAuth redirect URI registered with `provider`.
    #[must_use]
    pub fn redirect_uri(&self, provider: Provider) -> String {
        format!("{}/integrations/{provider}/oauth2/callback", self.site_url)
    }
}
