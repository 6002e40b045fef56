use crate::cascade::ResourceNode;
use crate::error::ConfigError;
use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, AuthorizeRequest, ProviderHandler};
use crate::types::CreateIntegrationRequest;

const AUTHORIZE_URL: &str = "https://id.heroku.com/oauth/authorize";

pub(crate) struct Heroku;

impl ProviderHandler for Heroku {
    fn provider(&self) -> Provider {
        Provider::Heroku
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::OAuth
    }

    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> Result<String, ConfigError> {
        request.code_flow_url(Provider::Heroku, AUTHORIZE_URL, Some("write-protected"), &[])
    }

    // Heroku addresses apps by name.
    fn resources(&self) -> Vec<ResourceNode> {
        vec![ResourceNode::new("app", "apps", "apps", "apps").id_field("name")]
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        if let Some(app) = input.selected("app") {
            request.app = Some(app.name.clone());
        }
    }
}
