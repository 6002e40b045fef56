use crate::cascade::ResourceNode;
use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, CredentialField, CredentialKey, ProviderHandler};
use crate::types::CreateIntegrationRequest;

const CREDENTIALS: &[CredentialField] = &[CredentialField::required(
    CredentialKey::AccessToken,
    "Northflank API token",
    "API token cannot be blank",
)];

pub(crate) struct Northflank;

impl ProviderHandler for Northflank {
    fn provider(&self) -> Provider {
        Provider::Northflank
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::AccessToken
    }

    fn credential_fields(&self) -> &'static [CredentialField] {
        CREDENTIALS
    }

    fn resources(&self) -> Vec<ResourceNode> {
        vec![
            ResourceNode::new("project", "projects", "apps", "apps").id_field("appId"),
            ResourceNode::new("secretGroup", "secret groups", "northflank/secret-groups", "secretGroups")
                .id_field("groupId")
                .parent("appId", "project"),
        ]
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        super::set_app(input, "project", request);
        if let Some(group) = input.selected("secretGroup") {
            request.target_service = Some(group.name.clone());
            request.target_service_id = Some(group.id.clone());
        }
    }
}
