use crate::cascade::ResourceNode;
use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, CredentialField, CredentialKey, ProviderHandler};
use crate::types::CreateIntegrationRequest;

const CREDENTIALS: &[CredentialField] = &[
    CredentialField::required(
        CredentialKey::AccessToken,
        "TeamCity access token",
        "Access token cannot be blank",
    ),
    CredentialField::required(CredentialKey::Url, "TeamCity server URL", "Server URL cannot be blank"),
];

pub(crate) struct Teamcity;

impl ProviderHandler for Teamcity {
    fn provider(&self) -> Provider {
        Provider::Teamcity
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
            // Without a build configuration the parameters are set on the project.
            ResourceNode::new("buildConfig", "build configurations", "teamcity/build-configs", "buildConfigs")
                .id_field("buildConfigId")
                .parent("appId", "project")
                .optional(),
        ]
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        super::set_app(input, "project", request);
        if let Some(config) = input.selected("buildConfig") {
            request.target_environment = Some(config.name.clone());
            request.target_environment_id = Some(config.id.clone());
        }
    }
}
