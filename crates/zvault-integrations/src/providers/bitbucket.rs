use crate::cascade::ResourceNode;
use crate::error::ConfigError;
use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, AuthorizeRequest, ProviderHandler};
use crate::types::CreateIntegrationRequest;

const AUTHORIZE_URL: &str = "https://bitbucket.org/site/oauth2/authorize";

pub(crate) struct Bitbucket;

impl ProviderHandler for Bitbucket {
    fn provider(&self) -> Provider {
        Provider::Bitbucket
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::OAuth
    }

    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> Result<String, ConfigError> {
        request.code_flow_url(Provider::Bitbucket, AUTHORIZE_URL, None, &[])
    }

    fn resources(&self) -> Vec<ResourceNode> {
        vec![
            ResourceNode::new("workspace", "workspaces", "bitbucket/workspaces", "workspaces")
                .id_field("slug"),
            ResourceNode::new("repo", "repositories", "apps", "apps")
                .id_field("appId")
                .parent("workspaceSlug", "workspace"),
            // Deployment environments are optional; repository variables are
            // used when none is chosen.
            ResourceNode::new("environment", "environments", "bitbucket/environments", "environments")
                .id_field("uuid")
                .parent("workspaceSlug", "workspace")
                .parent("repoSlug", "repo")
                .optional(),
        ]
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        super::set_app(input, "repo", request);
        request.owner = input.selected("workspace").map(|w| w.id.clone());
        if let Some(environment) = input.selected("environment") {
            request.target_environment = Some(environment.name.clone());
            request.target_environment_id = Some(environment.id.clone());
        }
    }
}
