use crate::cascade::ResourceNode;
use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, CredentialField, CredentialKey, ProviderHandler};
use crate::types::CreateIntegrationRequest;

const CREDENTIALS: &[CredentialField] = &[CredentialField::required(
    CredentialKey::AccessToken,
    "Railway API token",
    "API token cannot be blank",
)];

pub(crate) struct Railway;

impl ProviderHandler for Railway {
    fn provider(&self) -> Provider {
        Provider::Railway
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
            ResourceNode::new("environment", "environments", "railway/environments", "environments")
                .id_field("environmentId")
                .parent("appId", "project"),
            // Without a service the variables are shared by the environment.
            ResourceNode::new("service", "services", "railway/services", "services")
                .id_field("serviceId")
                .parent("appId", "project")
                .optional(),
        ]
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        super::set_app(input, "project", request);
        if let Some(environment) = input.selected("environment") {
            request.target_environment = Some(environment.name.clone());
            request.target_environment_id = Some(environment.id.clone());
        }
        if let Some(service) = input.selected("service") {
            request.target_service = Some(service.name.clone());
            request.target_service_id = Some(service.id.clone());
        }
    }
}
