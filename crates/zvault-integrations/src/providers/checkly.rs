use crate::cascade::ResourceNode;
use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, CredentialField, CredentialKey, FieldSpec, ProviderHandler};
use crate::types::CreateIntegrationRequest;

const CREDENTIALS: &[CredentialField] = &[CredentialField::required(
    CredentialKey::AccessToken,
    "Checkly API key",
    "API key cannot be blank",
)];

const FIELDS: &[FieldSpec] = &[FieldSpec::text("secretSuffix", "Secret suffix")];

pub(crate) struct Checkly;

impl ProviderHandler for Checkly {
    fn provider(&self) -> Provider {
        Provider::Checkly
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::AccessToken
    }

    fn credential_fields(&self) -> &'static [CredentialField] {
        CREDENTIALS
    }

    fn resources(&self) -> Vec<ResourceNode> {
        vec![
            ResourceNode::new("account", "accounts", "apps", "apps").id_field("appId"),
            ResourceNode::new("group", "groups", "checkly/groups", "groups")
                .id_field("groupId")
                .parent("accountId", "account")
                .optional(),
        ]
    }

    fn fields(&self) -> &'static [FieldSpec] {
        FIELDS
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        super::set_app(input, "account", request);
        if let Some(group) = input.selected("group") {
            request.target_service = Some(group.name.clone());
            request.target_service_id = Some(group.id.clone());
        }
        request.metadata.secret_suffix = input.field_owned("secretSuffix");
    }
}
