use crate::cascade::ResourceNode;
use crate::error::ConfigError;
use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AfterAuthorization, AuthKind, AuthorizeRequest, FieldSpec, ProviderHandler};
use crate::types::CreateIntegrationRequest;

const AUTHORIZE_URL: &str = "https://app.netlify.com/authorize";

const FIELDS: &[FieldSpec] = &[FieldSpec::choice(
    "targetEnvironment",
    "Netlify context",
    &["all", "dev", "branch-deploy", "deploy-preview", "production"],
    "all",
)];

pub(crate) struct Netlify;

impl ProviderHandler for Netlify {
    fn provider(&self) -> Provider {
        Provider::Netlify
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::OAuth
    }

    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> Result<String, ConfigError> {
        request.code_flow_url(Provider::Netlify, AUTHORIZE_URL, None, &[])
    }

    /// Netlify syncs the first site to every context right after
    /// authorization.
    fn after_authorization(&self) -> AfterAuthorization {
        AfterAuthorization::CreateImmediately
    }

    fn resources(&self) -> Vec<ResourceNode> {
        vec![ResourceNode::new("site", "sites", "apps", "apps").id_field("appId")]
    }

    fn fields(&self) -> &'static [FieldSpec] {
        FIELDS
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        super::set_app(input, "site", request);
        request.target_environment = input.field_owned("targetEnvironment");
    }
}
