use crate::cascade::ResourceNode;
use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, CredentialField, CredentialKey, ProviderHandler};
use crate::types::CreateIntegrationRequest;

const CREDENTIALS: &[CredentialField] = &[CredentialField::required(
    CredentialKey::AccessToken,
    "Render API key",
    "API key cannot be blank",
)];

pub(crate) struct Render;

impl ProviderHandler for Render {
    fn provider(&self) -> Provider {
        Provider::Render
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::AccessToken
    }

    fn credential_fields(&self) -> &'static [CredentialField] {
        CREDENTIALS
    }

    fn resources(&self) -> Vec<ResourceNode> {
        vec![ResourceNode::new("service", "services", "apps", "apps").id_field("appId")]
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        super::set_app(input, "service", request);
    }
}
