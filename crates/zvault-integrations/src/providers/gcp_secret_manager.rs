use crate::cascade::ResourceNode;
use crate::error::ConfigError;
use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, AuthorizeRequest, FieldSpec, ProviderHandler};
use crate::types::{CreateIntegrationRequest, SecretLabel};
use crate::validation::ValidationErrors;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

const FIELDS: &[FieldSpec] = &[
    FieldSpec::text("secretPrefix", "Secret prefix"),
    FieldSpec::text("secretSuffix", "Secret suffix"),
    FieldSpec::text("labelName", "Label name"),
    FieldSpec::text("labelValue", "Label value"),
];

pub(crate) struct GcpSecretManager;

impl ProviderHandler for GcpSecretManager {
    fn provider(&self) -> Provider {
        Provider::GcpSecretManager
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::OAuth
    }

    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> Result<String, ConfigError> {
        request.code_flow_url(
            Provider::GcpSecretManager,
            AUTHORIZE_URL,
            Some(SCOPE),
            &[("access_type", "offline"), ("prompt", "consent")],
        )
    }

    fn resources(&self) -> Vec<ResourceNode> {
        vec![ResourceNode::new("project", "projects", "apps", "apps").id_field("appId")]
    }

    fn fields(&self) -> &'static [FieldSpec] {
        FIELDS
    }

    fn validate(&self, input: &FormInput<'_>, errors: &mut ValidationErrors) {
        match (input.field("labelName"), input.field("labelValue")) {
            (Some(_), None) => errors.add("labelValue", "Label value cannot be blank"),
            (None, Some(_)) => errors.add("labelName", "Label name cannot be blank"),
            _ => {}
        }
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        super::set_app(input, "project", request);
        let metadata = &mut request.metadata;
        metadata.secret_prefix = input.field_owned("secretPrefix");
        metadata.secret_suffix = input.field_owned("secretSuffix");
        if let (Some(name), Some(value)) = (input.field_owned("labelName"), input.field_owned("labelValue")) {
            metadata.secret_gcp_label = Some(SecretLabel {
                label_name: name,
                label_value: value,
            });
        }
    }
}
