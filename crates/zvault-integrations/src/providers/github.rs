use crate::cascade::ResourceNode;
use crate::error::ConfigError;
use crate::form::FormInput;
use crate::provider::Provider;
use crate::registry::{AuthKind, AuthorizeRequest, ProviderHandler};
use crate::types::CreateIntegrationRequest;

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";

pub(crate) struct Github;

impl ProviderHandler for Github {
    fn provider(&self) -> Provider {
        Provider::Github
    }

    fn auth_kind(&self) -> AuthKind {
        AuthKind::OAuth
    }

    fn authorize_url(&self, request: &AuthorizeRequest<'_>) -> Result<String, ConfigError> {
        request.code_flow_url(Provider::Github, AUTHORIZE_URL, Some("repo"), &[])
    }

    fn resources(&self) -> Vec<ResourceNode> {
        vec![ResourceNode::new("repo", "repositories", "apps", "apps").id_field("appId")]
    }

    fn build(&self, input: &FormInput<'_>, request: &mut CreateIntegrationRequest) {
        if let Some(repo) = input.selected("repo") {
            request.app = Some(repo.name.clone());
            request.app_id = Some(repo.id.clone());
            request.owner = repo.attr("owner").map(str::to_owned);
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;
    use crate::providers::test_support::{build, cascade, values};

    #[test]
    fn repository_owner_is_sent() {
        let cascade = cascade(
            &Github,
            &[],
            &[("apps", vec![json!({"appId": "101", "name": "api", "owner": "acme"})])],
        );
        let request = build(&Github, &values(&[]), &cascade).unwrap();
        assert_eq!(request.app.as_deref(), Some("api"));
        assert_eq!(request.app_id.as_deref(), Some("101"));
        assert_eq!(request.owner.as_deref(), Some("acme"));
    }
}
