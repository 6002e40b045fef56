//! Provider handlers and the lookup table dispatching to them.
//!
//! Each provider is one [`ProviderHandler`] in `providers/`. The handler
//! declares how the provider authorizes, which resources its configuration
//! form selects from, which extra fields it takes, and how those become an
//! integration-creation request. Everything else is shared.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::cascade::ResourceNode;
use crate::config::IntegrationsConfig;
use crate::error::{ConfigError, WorkflowError};
use crate::form::FormInput;
use crate::provider::Provider;
use crate::types::CreateIntegrationRequest;
use crate::validation::ValidationErrors;

/// How a provider grants access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    /// Browser redirect and code exchange.
    OAuth,
    /// Credentials pasted into a form.
    AccessToken,
}

/// What happens once an authorization exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterAuthorization {
    /// Send the user to the configuration form.
    Configure,
    /// Create an integration from the form defaults without user input.
    CreateImmediately,
}

/// Provider-specific inputs to the authorization redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizeParams {
    /// Azure AD tenant. Defaults to `common`.
    pub tenant_id: Option<String>,
    /// Base URL of a self-hosted instance (GitLab).
    pub url: Option<String>,
}

/// Everything a handler needs to build its authorization URL.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizeRequest<'a> {
    pub config: &'a IntegrationsConfig,
    /// CSRF token to round-trip through `state`.
    pub state: &'a str,
    pub params: &'a AuthorizeParams,
}

impl AuthorizeRequest<'_> {
    /// Standard authorization-code URL:
    /// `{base}?client_id=..&response_type=code[&scope=..]&redirect_uri=..&state=..`
    /// followed by `extra`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingClientId`] if no client id is configured.
    pub fn code_flow_url(
        &self,
        provider: Provider,
        base: &str,
        scope: Option<&str>,
        extra: &[(&str, &str)],
    ) -> Result<String, ConfigError> {
        let client_id = self.config.client_id(provider)?;
        let redirect_uri = self.config.redirect_uri(provider);

        let mut pairs = vec![("client_id", client_id), ("response_type", "code")];
        if let Some(scope) = scope {
            pairs.push(("scope", scope));
        }
        pairs.push(("redirect_uri", redirect_uri.as_str()));
        pairs.push(("state", self.state));
        pairs.extend_from_slice(extra);
        Ok(with_query(base, &pairs))
    }
}

/// `base?k=v&...` with percent-encoded values.
#[must_use]
pub fn with_query(base: &str, pairs: &[(&str, &str)]) -> String {
    let query = pairs
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}?{query}")
}

/// Credential a token provider asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CredentialKey {
    AccessId,
    AccessToken,
    RefreshToken,
    Url,
    Namespace,
}

impl CredentialKey {
    /// Field name in requests and validation errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessId => "accessId",
            Self::AccessToken => "accessToken",
            Self::RefreshToken => "refreshToken",
            Self::Url => "url",
            Self::Namespace => "namespace",
        }
    }
}

/// One input of a manual-token form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialField {
    pub key: CredentialKey,
    pub label: &'static str,
    /// Message shown when left blank; `None` makes the field optional.
    pub blank_message: Option<&'static str>,
    /// Masked on input.
    pub secret: bool,
}

impl CredentialField {
    #[must_use]
    pub const fn required(
        key: CredentialKey,
        label: &'static str,
        blank_message: &'static str,
    ) -> Self {
        Self {
            key,
            label,
            blank_message: Some(blank_message),
            secret: matches!(key, CredentialKey::AccessToken | CredentialKey::RefreshToken),
        }
    }

    #[must_use]
    pub const fn optional(key: CredentialKey, label: &'static str) -> Self {
        Self {
            key,
            label,
            blank_message: None,
            secret: false,
        }
    }
}

/// A free-form or enumerated field of a configuration form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub default: Option<&'static str>,
    /// Allowed values; empty means free-form.
    pub choices: &'static [&'static str],
}

impl FieldSpec {
    #[must_use]
    pub const fn text(name: &'static str, label: &'static str) -> Self {
        Self {
            name,
            label,
            default: None,
            choices: &[],
        }
    }

    #[must_use]
    pub const fn choice(
        name: &'static str,
        label: &'static str,
        choices: &'static [&'static str],
        default: &'static str,
    ) -> Self {
        Self {
            name,
            label,
            default: Some(default),
            choices,
        }
    }

    #[must_use]
    pub const fn with_default(mut self, default: &'static str) -> Self {
        self.default = Some(default);
        self
    }
}

/// Provider-specific behavior of the integration workflow.
pub trait ProviderHandler: Send + Sync {
    fn provider(&self) -> Provider;

    fn auth_kind(&self) -> AuthKind;

    /// Authorization URL for OAuth providers.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the provider's client is not configured
    /// or the provider does not use OAuth.
    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> Result<String, ConfigError> {
        let _ = request;
        Err(ConfigError::NotOAuth {
            provider: self.provider(),
        })
    }

    /// Inputs of the manual-token form.
    fn credential_fields(&self) -> &'static [CredentialField] {
        &[]
    }

    fn after_authorization(&self) -> AfterAuthorization {
        AfterAuthorization::Configure
    }

    /// Resource nodes of the configuration form, parents first.
    fn resources(&self) -> Vec<ResourceNode> {
        Vec::new()
    }

    /// Extra configuration fields.
    fn fields(&self) -> &'static [FieldSpec] {
        &[]
    }

    /// Provider rules on top of the shared field checks.
    fn validate(&self, input: &FormInput<'_>, errors: &mut ValidationErrors) {
        let _ = (input, errors);
    }

    /// Fill the provider-specific parts of `request`.
    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest);
}

/// Provider to handler lookup.
#[derive(Clone)]
pub struct ProviderRegistry {
    handlers: BTreeMap<Provider, Arc<dyn ProviderHandler>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProviderRegistry {
    /// A registry with no handlers.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// A registry with every built-in provider.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        crate::providers::register_all(&mut registry);
        registry
    }

    /// Add or replace the handler for its provider.
    pub fn register(&mut self, handler: impl ProviderHandler + 'static) {
        self.handlers.insert(handler.provider(), Arc::new(handler));
    }

    /// # Errors
    ///
    /// Returns [`WorkflowError::UnregisteredProvider`] if no handler is
    /// registered.
    pub fn get(&self, provider: Provider) -> Result<Arc<dyn ProviderHandler>, WorkflowError> {
        self.handlers
            .get(&provider)
            .cloned()
            .ok_or(WorkflowError::UnregisteredProvider { provider })
    }

    /// Registered handlers in provider order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn ProviderHandler>> {
        self.handlers.values()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn builtin_registers_every_provider() {
        let registry = ProviderRegistry::builtin();
        for provider in Provider::ALL {
            assert_eq!(registry.get(provider).unwrap().provider(), provider);
        }
    }

    #[test]
    fn empty_registry_reports_unregistered() {
        let registry = ProviderRegistry::empty();
        assert!(matches!(
            registry.get(Provider::Github),
            Err(WorkflowError::UnregisteredProvider {
                provider: Provider::Github
            })
        ));
    }

    #[test]
    fn every_resource_chain_is_well_formed() {
        for handler in ProviderRegistry::builtin().iter() {
            crate::cascade::ResourceCascade::new("auth_1", handler.resources()).unwrap();
        }
    }

    #[test]
    fn token_providers_declare_credentials() {
        for handler in ProviderRegistry::builtin().iter() {
            let has_fields = !handler.credential_fields().is_empty();
            assert_eq!(
                has_fields,
                handler.auth_kind() == AuthKind::AccessToken,
                "{}",
                handler.provider()
            );
        }
    }

    #[test]
    fn field_defaults_are_valid_choices() {
        for handler in ProviderRegistry::builtin().iter() {
            for field in handler.fields() {
                if let (Some(default), false) = (field.default, field.choices.is_empty()) {
                    assert!(field.choices.contains(&default), "{}.{}", handler.provider(), field.name);
                }
            }
        }
    }

    #[test]
    fn code_flow_url_shape() {
        let config = IntegrationsConfig::default().with_client_id(Provider::Github, "gh_client");
        let params = AuthorizeParams::default();
        let request = AuthorizeRequest {
            config: &config,
            state: "abc123",
            params: &params,
        };
        let url = request
            .code_flow_url(
                Provider::Github,
                "https://github.com/login/oauth/authorize",
                Some("repo"),
                &[],
            )
            .unwrap();
        assert_eq!(
            url,
            "https://github.com/login/oauth/authorize?client_id=gh_client&response_type=code\
             &scope=repo&redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fintegrations%2Fgithub%2Foauth2%2Fcallback\
             &state=abc123"
        );
    }
}
