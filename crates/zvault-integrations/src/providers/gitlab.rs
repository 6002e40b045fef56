use crate::cascade::ResourceNode;
use crate::error::ConfigError;
use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, AuthorizeRequest, FieldSpec, ProviderHandler};
use crate::types::CreateIntegrationRequest;

const GITLAB_URL: &str = "https://gitlab.com";

/// Every environment scope of a GitLab CI variable.
const ALL_ENVIRONMENTS: &str = "*";

const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("targetEnvironment", "GitLab environment scope"),
    FieldSpec::text("secretPrefix", "Secret prefix"),
    FieldSpec::text("secretSuffix", "Secret suffix"),
    FieldSpec::choice("shouldMaskSecrets", "Mask secrets", &["true", "false"], "false"),
    FieldSpec::choice("shouldProtectSecrets", "Protect secrets", &["true", "false"], "false"),
];

pub(crate) struct Gitlab;

impl ProviderHandler for Gitlab {
    fn provider(&self) -> Provider {
        Provider::Gitlab
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::OAuth
    }

    /// Self-hosted instances authorize against their own base URL.
    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> Result<String, ConfigError> {
        let base = request
            .params
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(GITLAB_URL);
        let parsed = url::Url::parse(base).map_err(|e| ConfigError::InvalidUrl {
            setting: "url".to_owned(),
            value: base.to_owned(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl {
                setting: "url".to_owned(),
                value: base.to_owned(),
                reason: "expected an http(s) URL".to_owned(),
            });
        }
        let authorize = format!("{}/oauth/authorize", base.trim_end_matches('/'));
        request.code_flow_url(Provider::Gitlab, &authorize, Some("api"), &[])
    }

    fn resources(&self) -> Vec<ResourceNode> {
        vec![ResourceNode::new("project", "projects", "apps", "apps").id_field("appId")]
    }

    fn fields(&self) -> &'static [FieldSpec] {
        FIELDS
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        super::set_app(input, "project", request);
        request.target_environment = Some(
            input
                .field_owned("targetEnvironment")
                .unwrap_or_else(|| ALL_ENVIRONMENTS.to_owned()),
        );
        let metadata = &mut request.metadata;
        metadata.secret_prefix = input.field_owned("secretPrefix");
        metadata.secret_suffix = input.field_owned("secretSuffix");
        metadata.should_mask_secrets = input.flag("shouldMaskSecrets").then_some(true);
        metadata.should_protect_secrets = input.flag("shouldProtectSecrets").then_some(true);
    }
}
